//! AquaPlan Tools: the water-treatment consultancy pipeline
//!
//! Five LLM-backed tools chained by context keys:
//!
//! ```text
//! customer_request, guideline
//!   -> analyse_lab_report      -> lab_analysis
//!   -> treatment_recommendation -> treatment_plan
//!   -> ro_sizing               -> ro_sizing
//!   -> quotation_generator     -> quotation
//!   -> proposal_generator      -> proposal
//! ```

use std::sync::Arc;

use tracing::info;

use aquaplan_core::{OrchestratorResult, ToolRegistry};
use aquaplan_llm::StructuredInvoker;

pub mod analyse_lab_report;
mod fields;
pub mod llm_tool;
pub mod prompts;
pub mod proposal_generator;
pub mod quotation_generator;
pub mod ro_sizing;
pub mod treatment_recommendation;

pub use llm_tool::{LlmTool, ToolDefinition};
pub use prompts::{PromptFile, PromptLibrary};

/// Keys a request must seed for the full pipeline.
pub const SEED_KEYS: &[&str] = &["customer_request", "guideline"];

/// Default target: the proposal pulls in every other tool.
pub const DEFAULT_TARGET: &str = proposal_generator::NAME;

/// Tool definitions in declaration order.
pub fn definitions() -> OrchestratorResult<Vec<ToolDefinition>> {
    Ok(vec![
        analyse_lab_report::definition()?,
        treatment_recommendation::definition()?,
        ro_sizing::definition()?,
        quotation_generator::definition()?,
        proposal_generator::definition()?,
    ])
}

/// Register every pipeline tool, sharing one prompt library and invoker.
pub fn water_treatment_registry(
    prompts: Arc<PromptLibrary>,
    invoker: Arc<dyn StructuredInvoker>,
) -> OrchestratorResult<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    for definition in definitions()? {
        registry.register(Arc::new(LlmTool::new(definition, prompts.clone(), invoker.clone())))?;
    }
    registry.check_declaration_order(SEED_KEYS)?;
    info!(
        tools = registry.len(),
        prompts_version = prompts.version(),
        "Water-treatment registry ready"
    );
    Ok(registry)
}
