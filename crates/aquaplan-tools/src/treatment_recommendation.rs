//! Treatment train recommendation.
use once_cell::sync::Lazy;
use serde_json::Value;

use aquaplan_core::{OrchestratorResult, OutputSchema, ToolInput, ToolOutput, ToolSpec};

use crate::fields::{number, section_mut};
use crate::llm_tool::{passthrough_input, ToolDefinition};
use crate::prompts::PromptLibrary;

pub const NAME: &str = "treatment_recommendation";

static OUT_SCHEMA: Lazy<Vec<u8>> = Lazy::new(|| include_bytes!("../schemas/treatment_recommendation.out.json").to_vec());

pub fn definition() -> OrchestratorResult<ToolDefinition> {
    Ok(ToolDefinition {
        spec: ToolSpec::new(NAME)
            .requires(["customer_request", "lab_analysis"])
            .provides(["treatment_plan"])
            .description("Recommends an ordered treatment train for the detected violations")
            .output_schema(OutputSchema::from_slice(&OUT_SCHEMA)?),
        prompt: NAME,
        prepare: passthrough_input,
        finish,
    })
}

/// Stages come back sorted by installation order.
fn finish(_: &PromptLibrary, _: &ToolInput, mut output: ToolOutput) -> OrchestratorResult<ToolOutput> {
    let plan = section_mut(&mut output, "treatment_plan")?;
    if let Some(stages) = plan.get_mut("stages").and_then(Value::as_array_mut) {
        stages.sort_by(|a, b| {
            let a = number(a.get("order")).unwrap_or(f64::MAX);
            let b = number(b.get("order")).unwrap_or(f64::MAX);
            a.total_cmp(&b)
        });
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stages_sorted_by_order() {
        let library = PromptLibrary::embedded().unwrap();
        let output = json!({
            "treatment_plan": {
                "stages": [
                    { "order": 3, "name": "Reverse Osmosis" },
                    { "order": 1, "name": "Multimedia Filter" },
                    { "order": 2, "name": "Iron Removal Filter" }
                ],
                "rationale": "Iron first, then dissolved solids"
            }
        })
        .as_object()
        .cloned()
        .unwrap();

        let output = finish(&library, &ToolInput::new(), output).unwrap();
        let names: Vec<_> = output["treatment_plan"]["stages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Multimedia Filter", "Iron Removal Filter", "Reverse Osmosis"]);
    }

    #[test]
    fn test_declared_contract() {
        let spec = definition().unwrap().spec;
        assert_eq!(spec.requires, vec!["customer_request", "lab_analysis"]);
        assert_eq!(spec.provides, vec!["treatment_plan"]);
        let schema = spec.output_schema.unwrap();
        assert!(schema
            .validate(&json!({ "treatment_plan": { "stages": [], "rationale": "none needed" } }))
            .is_ok());
        assert!(schema
            .validate(&json!({ "treatment_plan": { "stages": [], "rationale": "ok", "pretreatment_required": null } }))
            .is_ok());
        let err = schema.validate(&json!({ "treatment_plan": { "stages": [] } })).unwrap_err();
        assert!(err.to_string().starts_with("SCHEMA/MISMATCH at /treatment_plan:"), "{err}");
    }
}
