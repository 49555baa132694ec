//! A tool whose body is one structured LLM call.
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use aquaplan_core::{OrchestratorError, OrchestratorResult, Tool, ToolInput, ToolOutput, ToolSpec};
use aquaplan_llm::StructuredInvoker;

use crate::prompts::PromptLibrary;

/// Builds the template data from the tool input.
pub type PrepareFn = fn(&ToolInput) -> OrchestratorResult<Value>;

/// Post-processes the validated model output.
pub type FinishFn = fn(&PromptLibrary, &ToolInput, ToolOutput) -> OrchestratorResult<ToolOutput>;

/// Static description of one pipeline tool.
#[derive(Clone)]
pub struct ToolDefinition {
    pub spec: ToolSpec,
    /// Prompt name in the library
    pub prompt: &'static str,
    pub prepare: PrepareFn,
    pub finish: FinishFn,
}

pub fn passthrough_input(input: &ToolInput) -> OrchestratorResult<Value> {
    Ok(Value::Object(input.clone()))
}

pub fn keep_output(_: &PromptLibrary, _: &ToolInput, output: ToolOutput) -> OrchestratorResult<ToolOutput> {
    Ok(output)
}

pub struct LlmTool {
    definition: ToolDefinition,
    prompts: Arc<PromptLibrary>,
    invoker: Arc<dyn StructuredInvoker>,
}

impl LlmTool {
    pub fn new(
        definition: ToolDefinition,
        prompts: Arc<PromptLibrary>,
        invoker: Arc<dyn StructuredInvoker>,
    ) -> Self {
        Self {
            definition,
            prompts,
            invoker,
        }
    }
}

#[async_trait]
impl Tool for LlmTool {
    fn spec(&self) -> &ToolSpec {
        &self.definition.spec
    }

    async fn invoke(&self, input: ToolInput) -> OrchestratorResult<ToolOutput> {
        let data = (self.definition.prepare)(&input)?;
        let prompt = self.prompts.render(self.definition.prompt, &data)?;
        debug!(
            tool = %self.definition.spec.name,
            prompt_chars = prompt.system.len() + prompt.user.len(),
            "Rendered prompt"
        );

        let schema = self.definition.spec.output_schema.as_ref();
        let value = self.invoker.invoke(&prompt, schema).await?;
        let output = match value {
            Value::Object(map) => map,
            other => {
                return Err(OrchestratorError::InvalidOutput(format!(
                    "expected a JSON object, got {}",
                    other
                )))
            }
        };

        (self.definition.finish)(&self.prompts, &input, output)
    }
}
