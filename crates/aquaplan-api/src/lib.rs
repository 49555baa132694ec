//! AquaPlan API /v1: REST endpoints over the pipeline
pub mod config;
pub mod handlers;
pub mod metrics;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use aquaplan_core::{ExecutorConfig, SequentialExecutor, ToolRegistry};
use aquaplan_llm::FallbackInvoker;
use aquaplan_tools::{water_treatment_registry, PromptLibrary};

use crate::config::AppConfig;
use crate::metrics::PipelineMetrics;

#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<SequentialExecutor>,
    pub metrics: Arc<PipelineMetrics>,
}

impl AppState {
    /// Wire an executor over `registry` with metrics attached.
    pub fn new(registry: ToolRegistry, config: ExecutorConfig) -> anyhow::Result<Self> {
        let metrics = Arc::new(PipelineMetrics::new().context("metrics registry")?);
        let executor = SequentialExecutor::new(Arc::new(registry), config)
            .with_observer(metrics.clone());
        Ok(Self {
            executor: Arc::new(executor),
            metrics,
        })
    }

    /// Build the water-treatment pipeline from application config.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let prompts = match &config.prompts_path {
            Some(path) => PromptLibrary::load(path)?,
            None => PromptLibrary::embedded()?,
        };
        let invoker = FallbackInvoker::from_configs(&config.providers)?;
        info!(
            providers = ?invoker.provider_names(),
            prompts_version = prompts.version(),
            "LLM fallback chain ready"
        );
        let registry = water_treatment_registry(Arc::new(prompts), Arc::new(invoker))?;
        Self::new(registry, config.executor.clone())
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/v1/pipeline/run", post(handlers::run_pipeline))
        .route("/v1/tools", get(handlers::list_tools))
        .route("/v1/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let state = AppState::from_config(&config)?;
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;

    info!("AquaPlan API listening on {}", config.listen_addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
