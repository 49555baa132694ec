//! Tool Registry: fixed, ordered collection of tools
//!
//! Registration order is the canonical dependency order. The registry is
//! built once at startup and handed to the executor; nothing looks tools up
//! from ambient state.
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::tool::{Tool, ToolSpec};

#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tool at the end of the sequence.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> OrchestratorResult<()> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(OrchestratorError::DuplicateTool(name));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> OrchestratorResult<&Arc<dyn Tool>> {
        self.index
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| OrchestratorError::UnknownTool(name.to_string()))
    }

    pub fn spec(&self, name: &str) -> OrchestratorResult<&ToolSpec> {
        self.get(name).map(|tool| tool.spec())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Position of `name` in registration order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn all_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn specs(&self) -> impl Iterator<Item = &ToolSpec> {
        self.tools.iter().map(|t| t.spec())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Check that declaration order satisfies every `requires` key, given
    /// the keys callers seed the context with.
    pub fn check_declaration_order(&self, seed_keys: &[&str]) -> OrchestratorResult<()> {
        let mut available: HashSet<&str> = seed_keys.iter().copied().collect();
        for spec in self.specs() {
            if let Some(key) = spec.requires.iter().find(|k| !available.contains(k.as_str())) {
                return Err(OrchestratorError::Config(format!(
                    "tool '{}' requires '{}' which no earlier tool provides",
                    spec.name, key
                )));
            }
            available.extend(spec.provides.iter().map(String::as_str));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.all_names())
            .finish()
    }
}
