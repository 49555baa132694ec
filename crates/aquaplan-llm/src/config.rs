//! Provider configuration
use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// One entry of the fallback chain. List order is priority order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    /// Base URL of an OpenAI-compatible API (without `/chat/completions`)
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Read the API key from the environment.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

/// Gemini through its OpenAI-compatible endpoint, then an NVIDIA-hosted Llama.
pub fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig {
            name: "gemini".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key_env: "GOOGLE_SECRET_KEY".to_string(),
            temperature: Some(1.0),
            max_tokens: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        },
        ProviderConfig {
            name: "nvidia".to_string(),
            base_url: "https://integrate.api.nvidia.com/v1".to_string(),
            model: "meta/llama-4-scout-17b-16e-instruct".to_string(),
            api_key_env: "NVIDIA_SECRET_KEY".to_string(),
            temperature: Some(0.3),
            max_tokens: Some(4096),
            timeout_secs: 30,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_defaults() {
        let yaml = r#"
name: local
base_url: http://localhost:11434/v1
model: llama3
api_key_env: LOCAL_KEY
"#;
        let config: ProviderConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert!(config.temperature.is_none());
    }

    #[test]
    fn test_blank_api_key_is_absent() {
        let config = ProviderConfig {
            api_key_env: "AQUAPLAN_TEST_BLANK_KEY".to_string(),
            ..default_providers().remove(0)
        };
        std::env::set_var("AQUAPLAN_TEST_BLANK_KEY", "  ");
        assert!(config.api_key().is_none());
    }

    #[test]
    fn test_default_chain_order() {
        let names: Vec<_> = default_providers().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["gemini", "nvidia"]);
    }
}
