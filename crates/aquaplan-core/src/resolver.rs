//! Dependency Resolver: picks the slice of the registry a run executes.
//!
//! The default [`ResolutionMode::Prefix`] trusts registration order and runs
//! every tool up to and including the target. [`ResolutionMode::Topological`]
//! is opt-in and keeps only the tools the target transitively needs.
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::registry::ToolRegistry;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMode {
    #[default]
    Prefix,
    Topological,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub sequence: Vec<String>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyResolver {
    mode: ResolutionMode,
}

impl DependencyResolver {
    pub fn new(mode: ResolutionMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ResolutionMode {
        self.mode
    }

    pub fn resolve(
        &self,
        registry: &ToolRegistry,
        target_tool: Option<&str>,
        full_sequence: bool,
    ) -> Resolution {
        let names = registry.all_names();

        if full_sequence {
            return Resolution {
                sequence: names.iter().map(|n| n.to_string()).collect(),
                errors: Vec::new(),
            };
        }

        let Some(target) = target_tool else {
            return Resolution::default();
        };

        let Some(position) = registry.position(target) else {
            return Resolution {
                sequence: Vec::new(),
                errors: vec![format!("Invalid target tool: {}", target)],
            };
        };

        let sequence = match self.mode {
            ResolutionMode::Prefix => names[..=position].iter().map(|n| n.to_string()).collect(),
            ResolutionMode::Topological => needed_for(registry, position),
        };

        Resolution {
            sequence,
            errors: Vec::new(),
        }
    }
}

/// Walk `provides` backwards from the target and keep the producers of
/// every key it transitively needs, in registration order.
fn needed_for(registry: &ToolRegistry, target: usize) -> Vec<String> {
    let specs: Vec<_> = registry.specs().take(target + 1).collect();
    let mut wanted: HashSet<&str> = specs[target].requires.iter().map(String::as_str).collect();
    let mut keep = vec![false; specs.len()];
    keep[target] = true;

    for i in (0..target).rev() {
        let spec = specs[i];
        if spec.provides.iter().any(|k| wanted.contains(k.as_str())) {
            keep[i] = true;
            wanted.extend(spec.requires.iter().map(String::as_str));
        }
    }

    specs
        .iter()
        .zip(keep)
        .filter(|(_, kept)| *kept)
        .map(|(spec, _)| spec.name.clone())
        .collect()
}
