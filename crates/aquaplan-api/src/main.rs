//! Binary entrypoint for the AquaPlan API server.
use tracing_subscriber::EnvFilter;

use aquaplan_api::{config::AppConfig, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // AQUAPLAN_CONFIG selects the YAML file, AQUAPLAN_ADDR overrides the listen address
    let config = AppConfig::from_env()?;
    run(config).await
}
