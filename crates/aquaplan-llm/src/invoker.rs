//! Fallback Invoker: tries providers in priority order until one returns
//! usable structured output.
//!
//! Each provider gets exactly one attempt, bounded by its own timeout. Empty
//! text, unparseable JSON and schema violations all count as failures and
//! move on to the next provider.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use aquaplan_core::{OrchestratorError, OrchestratorResult, OutputSchema};

use crate::config::ProviderConfig;
use crate::json::extract_json;
use crate::provider::{LlmProvider, OpenAiCompatibleProvider};
use crate::types::Prompt;

/// Something that turns a prompt into validated JSON. Tools depend on this
/// rather than on [`FallbackInvoker`] so they can be tested offline.
///
/// Without a schema any JSON value is accepted.
#[async_trait]
pub trait StructuredInvoker: Send + Sync {
    async fn invoke(&self, prompt: &Prompt, schema: Option<&OutputSchema>) -> OrchestratorResult<Value>;
}

struct ProviderSlot {
    provider: Arc<dyn LlmProvider>,
    timeout: Duration,
}

#[derive(Default)]
pub struct FallbackInvoker {
    slots: Vec<ProviderSlot>,
}

impl FallbackInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a provider at the lowest priority.
    pub fn with_provider(mut self, provider: Arc<dyn LlmProvider>, timeout: Duration) -> Self {
        self.slots.push(ProviderSlot { provider, timeout });
        self
    }

    /// Build the chain from config, skipping providers with no API key.
    pub fn from_configs(configs: &[ProviderConfig]) -> OrchestratorResult<Self> {
        let mut invoker = Self::new();
        for config in configs {
            match OpenAiCompatibleProvider::from_config(config.clone()) {
                Ok(provider) => {
                    info!(provider = %config.name, model = %config.model, "Registered LLM provider");
                    invoker = invoker.with_provider(Arc::new(provider), config.timeout());
                }
                Err(e) => warn!(provider = %config.name, "Skipping provider: {}", e),
            }
        }
        if invoker.is_empty() {
            return Err(OrchestratorError::Config(
                "no LLM provider is usable, set at least one API key".to_string(),
            ));
        }
        Ok(invoker)
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.slots.iter().map(|s| s.provider.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    async fn attempt(
        &self,
        slot: &ProviderSlot,
        prompt: &Prompt,
        schema: Option<&OutputSchema>,
    ) -> OrchestratorResult<Value> {
        let name = slot.provider.name();
        let messages = prompt.messages();

        let text = match timeout(slot.timeout, slot.provider.complete(&messages)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(OrchestratorError::ProviderInvocation {
                    provider: name.to_string(),
                    message: format!("timed out after {}s", slot.timeout.as_secs_f32()),
                })
            }
        };

        if text.trim().is_empty() {
            return Err(OrchestratorError::ProviderInvocation {
                provider: name.to_string(),
                message: "empty response".to_string(),
            });
        }

        extract_json(&text)
            .and_then(|value| match schema {
                Some(schema) => schema.validate(&value).map(|()| value),
                None => Ok(value),
            })
            .map_err(|e| OrchestratorError::ProviderInvocation {
                provider: name.to_string(),
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl StructuredInvoker for FallbackInvoker {
    async fn invoke(&self, prompt: &Prompt, schema: Option<&OutputSchema>) -> OrchestratorResult<Value> {
        let mut last_error: Option<OrchestratorError> = None;

        for (i, slot) in self.slots.iter().enumerate() {
            debug!(provider = %slot.provider.name(), attempt = i + 1, "Invoking provider");
            match self.attempt(slot, prompt, schema).await {
                Ok(value) => {
                    if i > 0 {
                        info!(provider = %slot.provider.name(), "Fallback provider succeeded");
                    }
                    return Ok(value);
                }
                Err(e) => {
                    warn!(provider = %slot.provider.name(), error = %e, "Provider failed, falling back");
                    last_error = Some(e);
                }
            }
        }

        let last_error = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no providers configured".to_string());
        error!(attempts = self.slots.len(), "All LLM providers failed: {}", last_error);
        Err(OrchestratorError::AllProvidersFailed {
            attempts: self.slots.len(),
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessage;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Reply {
        Text(&'static str),
        Fail,
        Hang,
    }

    struct Scripted {
        name: &'static str,
        reply: Reply,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(name: &'static str, reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                name,
                reply,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        async fn complete(&self, _messages: &[ChatMessage]) -> OrchestratorResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Reply::Text(text) => Ok(text.to_string()),
                Reply::Fail => Err(OrchestratorError::ProviderInvocation {
                    provider: self.name.to_string(),
                    message: "HTTP 503: overloaded".to_string(),
                }),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(String::new())
                }
            }
        }
    }

    fn schema() -> OutputSchema {
        OutputSchema::compile(json!({
            "type": "object",
            "required": ["total"],
            "properties": { "total": { "type": "number" } }
        }))
        .unwrap()
    }

    fn prompt() -> Prompt {
        Prompt::new("You price water systems.", "Quote please")
    }

    const SECS: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let primary = Scripted::new("primary", Reply::Text(r#"{"total": 10}"#));
        let secondary = Scripted::new("secondary", Reply::Text(r#"{"total": 20}"#));
        let invoker = FallbackInvoker::new()
            .with_provider(primary.clone(), SECS)
            .with_provider(secondary.clone(), SECS);

        let value = invoker.invoke(&prompt(), Some(&schema())).await.unwrap();
        assert_eq!(value, json!({ "total": 10 }));
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_falls_back_on_error_empty_and_bad_schema() {
        let cases = [
            Reply::Fail,
            Reply::Text("   \n"),
            Reply::Text("not json at all"),
            Reply::Text(r#"{"total": "ten"}"#),
        ];
        for reply in cases {
            let primary = Scripted::new("primary", reply);
            let secondary = Scripted::new("secondary", Reply::Text("```json\n{\"total\": 20}\n```"));
            let invoker = FallbackInvoker::new()
                .with_provider(primary.clone(), SECS)
                .with_provider(secondary.clone(), SECS);

            let value = invoker.invoke(&prompt(), Some(&schema())).await.unwrap();
            assert_eq!(value, json!({ "total": 20 }));
            assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
            assert_eq!(secondary.calls.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn test_exhaustion_reports_last_error() {
        let invoker = FallbackInvoker::new()
            .with_provider(Scripted::new("primary", Reply::Fail), SECS)
            .with_provider(Scripted::new("secondary", Reply::Text("")), SECS);

        let err = invoker.invoke(&prompt(), Some(&schema())).await.unwrap_err();
        match err {
            OrchestratorError::AllProvidersFailed { attempts, last_error } => {
                assert_eq!(attempts, 2);
                assert!(last_error.contains("secondary"));
                assert!(last_error.contains("empty response"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_parse_and_schema_errors_name_the_provider() {
        let invoker = FallbackInvoker::new()
            .with_provider(Scripted::new("primary", Reply::Text("no json here")), SECS)
            .with_provider(Scripted::new("secondary", Reply::Text(r#"{"total": "ten"}"#)), SECS);

        let err = invoker.invoke(&prompt(), Some(&schema())).await.unwrap_err();
        match err {
            OrchestratorError::AllProvidersFailed { last_error, .. } => {
                assert!(last_error.starts_with("PROVIDER/secondary: SCHEMA/MISMATCH at /total:"), "{last_error}");
            }
            other => panic!("unexpected error {other:?}"),
        }

        let parse_only = FallbackInvoker::new()
            .with_provider(Scripted::new("primary", Reply::Text("no json here")), SECS);
        let err = parse_only.invoke(&prompt(), None).await.unwrap_err();
        assert!(err.to_string().contains("PROVIDER/primary: OUTPUT/PARSE"), "{err}");
    }

    #[tokio::test]
    async fn test_no_schema_accepts_any_json() {
        let invoker = FallbackInvoker::new()
            .with_provider(Scripted::new("primary", Reply::Text(r#"["a", 1]"#)), SECS);
        let value = invoker.invoke(&prompt(), None).await.unwrap();
        assert_eq!(value, json!(["a", 1]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_moves_to_next_provider() {
        let invoker = FallbackInvoker::new()
            .with_provider(Scripted::new("stuck", Reply::Hang), Duration::from_secs(30))
            .with_provider(Scripted::new("backup", Reply::Text(r#"{"total": 1}"#)), SECS);

        let value = invoker.invoke(&prompt(), Some(&schema())).await.unwrap();
        assert_eq!(value, json!({ "total": 1 }));
    }

    #[tokio::test]
    async fn test_empty_chain() {
        let err = FallbackInvoker::new().invoke(&prompt(), Some(&schema())).await.unwrap_err();
        assert!(err.to_string().contains("no providers configured"));
    }

    #[test]
    fn test_from_configs_requires_a_key() {
        let configs = vec![ProviderConfig {
            name: "ghost".to_string(),
            base_url: "http://localhost:1".to_string(),
            model: "none".to_string(),
            api_key_env: "AQUAPLAN_TEST_UNSET_KEY".to_string(),
            temperature: None,
            max_tokens: None,
            timeout_secs: 1,
        }];
        std::env::remove_var("AQUAPLAN_TEST_UNSET_KEY");
        assert!(matches!(
            FallbackInvoker::from_configs(&configs),
            Err(OrchestratorError::Config(_))
        ));
    }
}
