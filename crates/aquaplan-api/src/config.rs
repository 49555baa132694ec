//! Application config: YAML file plus environment overrides.
//!
//! `AQUAPLAN_CONFIG` points at the file; without it the defaults are used.
//! `AQUAPLAN_ADDR` always wins over `listen_addr`.
use serde::{Deserialize, Serialize};

use aquaplan_core::{ExecutorConfig, OrchestratorError, OrchestratorResult};
use aquaplan_llm::{default_providers, ProviderConfig};

pub const CONFIG_ENV: &str = "AQUAPLAN_CONFIG";
pub const ADDR_ENV: &str = "AQUAPLAN_ADDR";
pub const DEFAULT_ADDR: &str = "0.0.0.0:8787";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub listen_addr: String,
    /// Fallback chain, highest priority first
    pub providers: Vec<ProviderConfig>,
    pub executor: ExecutorConfig,
    /// Prompt library overriding the embedded one
    pub prompts_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_ADDR.to_string(),
            providers: default_providers(),
            executor: ExecutorConfig::default(),
            prompts_path: None,
        }
    }
}

impl AppConfig {
    pub fn from_yaml(yaml: &str) -> OrchestratorResult<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| OrchestratorError::Config(format!("invalid config: {}", e)))
    }

    pub fn load(path: &str) -> OrchestratorResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| OrchestratorError::Config(format!("failed to read {}: {}", path, e)))?;
        Self::from_yaml(&content)
    }

    pub fn from_env() -> OrchestratorResult<Self> {
        let config = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::load(&path)?,
            Err(_) => Self::default(),
        };
        Ok(config.with_addr_override(std::env::var(ADDR_ENV).ok()))
    }

    fn with_addr_override(mut self, addr: Option<String>) -> Self {
        if let Some(addr) = addr.filter(|a| !a.trim().is_empty()) {
            self.listen_addr = addr;
        }
        self
    }
}
