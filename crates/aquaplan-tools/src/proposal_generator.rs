//! Customer-facing technical proposal. Terminal tool of the pipeline.
use chrono::{Local, NaiveDate};
use once_cell::sync::Lazy;
use serde_json::{json, Value};

use aquaplan_core::{OrchestratorResult, OutputSchema, ToolInput, ToolOutput, ToolSpec};

use crate::fields::{client_name, section_mut};
use crate::llm_tool::{passthrough_input, ToolDefinition};
use crate::prompts::PromptLibrary;

pub const NAME: &str = "proposal_generator";

static OUT_SCHEMA: Lazy<Vec<u8>> = Lazy::new(|| include_bytes!("../schemas/proposal_generator.out.json").to_vec());

pub fn definition() -> OrchestratorResult<ToolDefinition> {
    Ok(ToolDefinition {
        spec: ToolSpec::new(NAME)
            .requires([
                "customer_request",
                "lab_analysis",
                "treatment_plan",
                "ro_sizing",
                "quotation",
            ])
            .provides(["proposal"])
            .description("Writes the technical proposal with the quotation appended")
            .output_schema(OutputSchema::from_slice(&OUT_SCHEMA)?),
        prompt: NAME,
        prepare: passthrough_input,
        finish,
    })
}

fn finish(prompts: &PromptLibrary, input: &ToolInput, mut output: ToolOutput) -> OrchestratorResult<ToolOutput> {
    let proposal = section_mut(&mut output, "proposal")?;
    let markdown = compose(prompts, input, &Value::Object(proposal.clone()), Local::now().date_naive())?;
    proposal.insert("markdown".to_string(), json!(markdown));
    Ok(output)
}

/// Proposal body followed by the quotation, when one was laid out.
pub fn compose(
    prompts: &PromptLibrary,
    input: &ToolInput,
    proposal: &Value,
    today: NaiveDate,
) -> OrchestratorResult<String> {
    let mut data = proposal.clone();
    if let Some(fields) = data.as_object_mut() {
        fields.insert("client_name".to_string(), json!(client_name(input)));
        fields.insert("issued_on".to_string(), json!(today.format("%d %B %Y").to_string()));
    }
    let mut markdown = prompts.render_document("proposal_markdown", &data)?;

    if let Some(quotation) = input
        .get("quotation")
        .and_then(|q| q.get("markdown"))
        .and_then(Value::as_str)
    {
        markdown.push_str("\n---\n\n");
        markdown.push_str(quotation);
    }
    Ok(markdown)
}
