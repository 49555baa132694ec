//! AquaPlan LLM: providers and the structured-output fallback chain
pub mod config;
pub mod invoker;
pub mod json;
pub mod provider;
pub mod types;

pub use config::{default_providers, ProviderConfig};
pub use invoker::{FallbackInvoker, StructuredInvoker};
pub use json::extract_json;
pub use provider::{LlmProvider, OpenAiCompatibleProvider};
pub use types::{ChatMessage, Prompt, Role};
