//! Sequential Executor: drives a resolved sequence against one context
//!
//! Steps run one at a time in resolved order. A step whose inputs are
//! missing is skipped, a step that errors or breaks its `provides` contract
//! is failed, and only a failure of the requested target stops the run.
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::context::ExecutionContext;
use crate::data_model::{
    final_output, overall_success, ExecutionRequest, ExecutionResult, StepOutcome, StepRecord,
    StepStatus,
};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::registry::ToolRegistry;
use crate::resolver::{DependencyResolver, ResolutionMode};
use crate::tool::{Tool, ToolOutput};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Attach a copy of the context to failed step records
    pub snapshot_on_failure: bool,
    pub resolution: ResolutionMode,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            snapshot_on_failure: true,
            resolution: ResolutionMode::Prefix,
        }
    }
}

/// Observer for step transitions, used by callers that export metrics.
pub trait StepObserver: Send + Sync {
    fn on_step(&self, record: &StepRecord);

    fn on_run(&self, _result: &ExecutionResult) {}
}

pub struct SequentialExecutor {
    registry: Arc<ToolRegistry>,
    resolver: DependencyResolver,
    config: ExecutorConfig,
    observer: Option<Arc<dyn StepObserver>>,
}

impl SequentialExecutor {
    pub fn new(registry: Arc<ToolRegistry>, config: ExecutorConfig) -> Self {
        Self {
            registry,
            resolver: DependencyResolver::new(config.resolution),
            config,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn StepObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub async fn execute(&self, request: ExecutionRequest) -> ExecutionResult {
        self.execute_tool_sequence(
            request.initial_data,
            request.target_tool.as_deref(),
            request.full_sequence,
        )
        .await
    }

    /// Run the pipeline. Never fails for ordinary tool errors; inspect
    /// `success` and `errors` on the result.
    pub async fn execute_tool_sequence(
        &self,
        initial_data: Map<String, Value>,
        target_tool: Option<&str>,
        full_sequence: bool,
    ) -> ExecutionResult {
        let ctx = ExecutionContext::new(initial_data);
        let span = info_span!("pipeline", run_id = %ctx.run_id);
        self.run(ctx, target_tool, full_sequence).instrument(span).await
    }

    async fn run(
        &self,
        mut ctx: ExecutionContext,
        target_tool: Option<&str>,
        full_sequence: bool,
    ) -> ExecutionResult {
        let started_at = Utc::now();
        let resolution = self.resolver.resolve(&self.registry, target_tool, full_sequence);
        let mut errors = resolution.errors;
        let mut log: Vec<StepRecord> = Vec::with_capacity(resolution.sequence.len());

        info!(
            target = target_tool.unwrap_or("-"),
            full_sequence,
            steps = resolution.sequence.len(),
            "Starting tool sequence"
        );

        for name in &resolution.sequence {
            let tool = match self.registry.get(name) {
                Ok(tool) => tool,
                Err(e) => {
                    errors.push(e.to_string());
                    continue;
                }
            };

            let record = self.run_step(tool.as_ref(), &mut ctx).await;
            let failed = record.status() == StepStatus::Failed;
            if let StepOutcome::Failed { error, .. } = &record.outcome {
                errors.push(format!("Error in {}: {}", name, error));
            }
            if let Some(observer) = &self.observer {
                observer.on_step(&record);
            }
            log.push(record);

            if failed && target_tool == Some(name.as_str()) {
                error!(tool = %name, "Target tool failed, stopping sequence");
                break;
            }
        }

        let result = ExecutionResult {
            run_id: ctx.run_id.clone(),
            sequence: resolution.sequence,
            success: overall_success(&errors, &log),
            final_output: final_output(&log),
            execution_log: log,
            context: ctx.into_values(),
            errors,
            started_at,
            finished_at: Utc::now(),
        };

        info!(
            success = result.success,
            errors = result.errors.len(),
            "Tool sequence finished"
        );
        if let Some(observer) = &self.observer {
            observer.on_run(&result);
        }
        result
    }

    async fn run_step(&self, tool: &dyn Tool, ctx: &mut ExecutionContext) -> StepRecord {
        let spec = tool.spec();
        let timestamp = Utc::now();
        let start = Instant::now();

        let missing = ctx.missing(&spec.requires);
        if !missing.is_empty() {
            warn!(tool = %spec.name, ?missing, "Skipping tool, required inputs absent");
            return StepRecord {
                tool: spec.name.clone(),
                timestamp,
                latency_ms: 0,
                input_hash: None,
                outcome: StepOutcome::Skipped {
                    missing: missing.into_iter().map(String::from).collect(),
                },
            };
        }

        let input = ctx.select(&spec.requires);
        let input_hash = hash_json(&input);
        debug!(tool = %spec.name, from = ?StepStatus::Pending, to = ?StepStatus::Running, "Step transition");

        let result = tool.invoke(input).await.and_then(|output| {
            let missing = spec.missing_outputs(&output);
            if missing.is_empty() {
                Ok(output)
            } else {
                Err(OrchestratorError::missing_outputs(missing))
            }
        });
        let latency_ms = start.elapsed().as_millis() as u64;

        let outcome = match result {
            Ok(output) => {
                ctx.merge(&output);
                info!(tool = %spec.name, latency_ms, keys = ?output.keys().collect::<Vec<_>>(), "Tool succeeded");
                StepOutcome::Success {
                    output_hash: hash_json(&output),
                    outputs: output,
                }
            }
            Err(e) => {
                error!(tool = %spec.name, latency_ms, error = %e, "Tool failed");
                StepOutcome::Failed {
                    error: e.to_string(),
                    context_snapshot: self.config.snapshot_on_failure.then(|| ctx.snapshot()),
                }
            }
        };

        StepRecord {
            tool: spec.name.clone(),
            timestamp,
            latency_ms,
            input_hash: Some(input_hash),
            outcome,
        }
    }
}

fn hash_json(map: &ToolOutput) -> String {
    let bytes = serde_json::to_vec(map).unwrap_or_default();
    format!("blake3:{}", blake3::hash(&bytes))
}

/// Convenience wrapper for one-off runs against a registry.
pub async fn execute_tool_sequence(
    registry: Arc<ToolRegistry>,
    initial_data: Map<String, Value>,
    target_tool: Option<&str>,
    full_sequence: bool,
) -> ExecutionResult {
    SequentialExecutor::new(registry, ExecutorConfig::default())
        .execute_tool_sequence(initial_data, target_tool, full_sequence)
        .await
}

/// Build a registry from tools in declaration order.
pub fn registry_from(tools: Vec<Arc<dyn Tool>>) -> OrchestratorResult<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    for tool in tools {
        registry.register(tool)?;
    }
    Ok(registry)
}
