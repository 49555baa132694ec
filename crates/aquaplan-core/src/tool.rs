//! Tool contract: every pipeline stage declares what it reads and writes.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::contract::OutputSchema;
use crate::error::OrchestratorResult;

/// Input handed to a tool: the `requires`-selected subset of the context.
pub type ToolInput = Map<String, Value>;

/// Structured output returned by a tool; merged into the context on success.
pub type ToolOutput = Map<String, Value>;

/// Declared contract of a tool. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Unique name (ex: "treatment_recommendation")
    pub name: String,
    /// Context keys that must be present before the tool can run, in order
    pub requires: Vec<String>,
    /// Context keys the tool guarantees to add on success
    pub provides: Vec<String>,
    /// Human readable description
    pub description: String,
    /// JSON Schema of the full tool output, checked at the invoker boundary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<OutputSchema>,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requires: Vec::new(),
            provides: Vec::new(),
            description: String::new(),
            output_schema: None,
        }
    }

    pub fn requires<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for key in keys {
            let key = key.into();
            if !self.requires.contains(&key) {
                self.requires.push(key);
            }
        }
        self
    }

    pub fn provides<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for key in keys {
            let key = key.into();
            if !self.provides.contains(&key) {
                self.provides.push(key);
            }
        }
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn output_schema(mut self, schema: OutputSchema) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// `provides` keys absent from `output`, in declaration order.
    pub fn missing_outputs(&self, output: &ToolOutput) -> Vec<String> {
        self.provides
            .iter()
            .filter(|key| !output.contains_key(key.as_str()))
            .cloned()
            .collect()
    }
}

/// A single pipeline stage.
///
/// Implementations receive a map holding at least their declared `requires`
/// keys and must return a map holding at least their declared `provides`
/// keys, or fail.
#[async_trait]
pub trait Tool: Send + Sync {
    fn spec(&self) -> &ToolSpec;

    async fn invoke(&self, input: ToolInput) -> OrchestratorResult<ToolOutput>;

    fn name(&self) -> &str {
        &self.spec().name
    }
}
