//! Execution Context: shared state threaded through one pipeline run
use serde_json::{Map, Value};

use crate::tool::{ToolInput, ToolOutput};

/// Key/value store owned by a single run. Seeded with the caller's data and
/// merged into by every successful tool.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub run_id: String,
    values: Map<String, Value>,
}

impl ExecutionContext {
    pub fn new(initial_data: Map<String, Value>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            values: initial_data,
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Keys from `required` that are not present, preserving their order.
    pub fn missing<'a>(&self, required: &'a [String]) -> Vec<&'a str> {
        required
            .iter()
            .filter(|key| !self.contains(key))
            .map(String::as_str)
            .collect()
    }

    /// Copy out the entries named by `keys`. Absent keys are ignored.
    pub fn select(&self, keys: &[String]) -> ToolInput {
        keys.iter()
            .filter_map(|key| self.values.get(key).map(|v| (key.clone(), v.clone())))
            .collect()
    }

    /// Merge a tool output, overwriting existing keys.
    pub fn merge(&mut self, output: &ToolOutput) {
        for (key, value) in output {
            self.values.insert(key.clone(), value.clone());
        }
    }

    pub fn snapshot(&self) -> Map<String, Value> {
        self.values.clone()
    }

    pub fn into_values(self) -> Map<String, Value> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
