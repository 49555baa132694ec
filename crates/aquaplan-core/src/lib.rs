//! AquaPlan Core: tool registry, resolver and sequential executor
//!
//! Tools declare the context keys they need (`requires`) and add
//! (`provides`). The executor threads one [`ExecutionContext`] through the
//! resolved sequence, records a [`StepRecord`] per tool and folds failures
//! into the [`ExecutionResult`] instead of propagating them.

pub mod context;
pub mod contract;
pub mod data_model;
pub mod error;
pub mod executor;
pub mod registry;
pub mod resolver;
pub mod tool;

pub use context::ExecutionContext;
pub use contract::OutputSchema;
pub use data_model::{
    ExecutionRequest, ExecutionResult, StepOutcome, StepRecord, StepStatus,
};
pub use error::{ContractViolation, OrchestratorError, OrchestratorResult};
pub use executor::{
    execute_tool_sequence, registry_from, ExecutorConfig, SequentialExecutor, StepObserver,
};
pub use registry::ToolRegistry;
pub use resolver::{DependencyResolver, Resolution, ResolutionMode};
pub use tool::{Tool, ToolInput, ToolOutput, ToolSpec};

/// Engine version
pub const AQUAPLAN_VERSION: &str = env!("CARGO_PKG_VERSION");
