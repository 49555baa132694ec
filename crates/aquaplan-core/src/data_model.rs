//! Data Model: ExecutionRequest, StepRecord, ExecutionResult
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Serializable form of the pipeline entry point arguments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// Seed values for the context (ex: `customer_request`, `guideline`)
    #[serde(default)]
    pub initial_data: Map<String, Value>,
    /// Last tool the caller wants executed
    #[serde(default)]
    pub target_tool: Option<String>,
    /// Run every registered tool regardless of `target_tool`
    #[serde(default)]
    pub full_sequence: bool,
}

/// Lifecycle of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Success,
    Skipped,
    Failed,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Running => "running",
            StepStatus::Success => "success",
            StepStatus::Skipped => "skipped",
            StepStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Success | StepStatus::Skipped | StepStatus::Failed)
    }
}

/// Terminal outcome of a step, tagged explicitly so skip and failure are
/// never inferred from an error type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Success {
        outputs: Map<String, Value>,
        output_hash: String,
    },
    Skipped {
        missing: Vec<String>,
    },
    Failed {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context_snapshot: Option<Map<String, Value>>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub tool: String,
    pub timestamp: DateTime<Utc>,
    pub latency_ms: u64,
    /// Hash of the tool input; absent when the tool was never invoked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_hash: Option<String>,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

impl StepRecord {
    pub fn status(&self) -> StepStatus {
        match self.outcome {
            StepOutcome::Success { .. } => StepStatus::Success,
            StepOutcome::Skipped { .. } => StepStatus::Skipped,
            StepOutcome::Failed { .. } => StepStatus::Failed,
        }
    }

    pub fn outputs(&self) -> Option<&Map<String, Value>> {
        match &self.outcome {
            StepOutcome::Success { outputs, .. } => Some(outputs),
            _ => None,
        }
    }
}

/// Final aggregate of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub run_id: String,
    /// Resolved tool order for this run
    pub sequence: Vec<String>,
    pub execution_log: Vec<StepRecord>,
    pub context: Map<String, Value>,
    pub errors: Vec<String>,
    pub final_output: Option<Map<String, Value>>,
    pub success: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ExecutionResult {
    /// Steps with the given status, in execution order.
    pub fn steps_with(&self, status: StepStatus) -> impl Iterator<Item = &StepRecord> {
        self.execution_log.iter().filter(move |r| r.status() == status)
    }

    pub fn step(&self, tool: &str) -> Option<&StepRecord> {
        self.execution_log.iter().find(|r| r.tool == tool)
    }
}

/// `success` is true only when nothing failed and something succeeded.
pub fn overall_success(errors: &[String], log: &[StepRecord]) -> bool {
    errors.is_empty() && log.iter().any(|r| r.status() == StepStatus::Success)
}

/// Outputs of the last successful step, if any.
pub fn final_output(log: &[StepRecord]) -> Option<Map<String, Value>> {
    log.iter().rev().find_map(|r| r.outputs().cloned())
}
