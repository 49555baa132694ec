//! Prometheus counters fed by the executor's step observer.
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

use aquaplan_core::{ExecutionResult, StepObserver, StepRecord};

pub struct PipelineMetrics {
    registry: Registry,
    runs: IntCounterVec,
    steps: IntCounterVec,
}

impl PipelineMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let runs = IntCounterVec::new(
            Opts::new("aquaplan_runs_total", "Pipeline runs by outcome"),
            &["outcome"],
        )?;
        let steps = IntCounterVec::new(
            Opts::new("aquaplan_steps_total", "Pipeline steps by tool and terminal status"),
            &["tool", "status"],
        )?;
        registry.register(Box::new(runs.clone()))?;
        registry.register(Box::new(steps.clone()))?;
        Ok(Self {
            registry,
            runs,
            steps,
        })
    }

    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}

impl StepObserver for PipelineMetrics {
    fn on_step(&self, record: &StepRecord) {
        self.steps
            .with_label_values(&[record.tool.as_str(), record.status().as_str()])
            .inc();
    }

    fn on_run(&self, result: &ExecutionResult) {
        let outcome = if result.success { "success" } else { "failure" };
        self.runs.with_label_values(&[outcome]).inc();
    }
}
