//! Reverse osmosis sizing.
//!
//! The model proposes the design; the feed flow is recomputed from
//! permeate and recovery, and implausible designs fail the step.
use once_cell::sync::Lazy;
use serde_json::json;

use aquaplan_core::{OrchestratorError, OrchestratorResult, OutputSchema, ToolInput, ToolOutput, ToolSpec};

use crate::fields::{number, round_to, section_mut};
use crate::llm_tool::{passthrough_input, ToolDefinition};
use crate::prompts::PromptLibrary;

pub const NAME: &str = "ro_sizing";

static OUT_SCHEMA: Lazy<Vec<u8>> = Lazy::new(|| include_bytes!("../schemas/ro_sizing.out.json").to_vec());

pub fn definition() -> OrchestratorResult<ToolDefinition> {
    Ok(ToolDefinition {
        spec: ToolSpec::new(NAME)
            .requires(["customer_request", "lab_analysis"])
            .provides(["ro_sizing"])
            .description("Sizes a reverse osmosis unit for the customer's demand and feed quality")
            .output_schema(OutputSchema::from_slice(&OUT_SCHEMA)?),
        prompt: NAME,
        prepare: passthrough_input,
        finish,
    })
}

fn finish(_: &PromptLibrary, _: &ToolInput, mut output: ToolOutput) -> OrchestratorResult<ToolOutput> {
    let sizing = section_mut(&mut output, "ro_sizing")?;
    if sizing.get("required").and_then(|v| v.as_bool()) != Some(true) {
        return Ok(output);
    }

    let permeate = number(sizing.get("permeate_flow_m3_per_day")).unwrap_or(0.0);
    let recovery = number(sizing.get("recovery_percent")).unwrap_or(0.0);
    let membranes = number(sizing.get("membrane_count")).unwrap_or(0.0);

    if permeate <= 0.0 {
        return Err(implausible(format!("permeate flow {} m3/day", permeate)));
    }
    if recovery <= 0.0 || recovery > 100.0 {
        return Err(implausible(format!("recovery {}%", recovery)));
    }
    if membranes < 1.0 {
        return Err(implausible(format!("{} membranes", membranes)));
    }

    let feed = round_to(permeate * 100.0 / recovery, 2);
    sizing.insert("feed_flow_m3_per_day".to_string(), json!(feed));
    Ok(output)
}

fn implausible(detail: String) -> OrchestratorError {
    OrchestratorError::Execution(format!("implausible RO design: {}", detail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn run(sizing: Value) -> OrchestratorResult<ToolOutput> {
        let library = PromptLibrary::embedded().unwrap();
        let output = json!({ "ro_sizing": sizing }).as_object().cloned().unwrap();
        finish(&library, &ToolInput::new(), output)
    }

    #[test]
    fn test_feed_flow_recomputed() {
        let output = run(json!({
            "required": true,
            "permeate_flow_m3_per_day": 75.0,
            "feed_flow_m3_per_day": 90.0,
            "recovery_percent": 75.0,
            "membrane_count": 6
        }))
        .unwrap();
        assert_eq!(output["ro_sizing"]["feed_flow_m3_per_day"], json!(100.0));
    }

    #[test]
    fn test_not_required_passes_through() {
        let output = run(json!({ "required": false, "notes": "Feed TDS already compliant" })).unwrap();
        assert_eq!(output["ro_sizing"]["notes"], "Feed TDS already compliant");
    }

    #[test]
    fn test_implausible_recovery_fails() {
        let err = run(json!({
            "required": true,
            "permeate_flow_m3_per_day": 10.0,
            "recovery_percent": 140.0,
            "membrane_count": 2
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "TOOL/EXEC: implausible RO design: recovery 140%");
    }

    #[test]
    fn test_no_membranes_fails() {
        let err = run(json!({
            "required": true,
            "permeate_flow_m3_per_day": 10.0,
            "recovery_percent": 60.0,
            "membrane_count": 0
        }))
        .unwrap_err();
        assert!(matches!(err, OrchestratorError::Execution(_)));
    }
}
