//! HTTP-level tests for the OpenAI-compatible provider and the fallback
//! chain, against wiremock servers.

use std::sync::Arc;
use std::time::Duration;

use aquaplan_core::{OrchestratorError, OutputSchema};
use aquaplan_llm::{
    ChatMessage, FallbackInvoker, LlmProvider, OpenAiCompatibleProvider, Prompt, ProviderConfig,
    StructuredInvoker,
};
use serde_json::json;
use wiremock::matchers::{bearer_token, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(name: &str, server: &MockServer) -> ProviderConfig {
    ProviderConfig {
        name: name.to_string(),
        base_url: format!("{}/v1/", server.uri()),
        model: "test-model".to_string(),
        api_key_env: "UNUSED".to_string(),
        temperature: Some(0.2),
        max_tokens: None,
        timeout_secs: 5,
    }
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "cmpl-1",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    })
}

#[tokio::test]
async fn test_completion_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(bearer_token("secret"))
        .and(body_partial_json(json!({ "model": "test-model", "stream": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("{\"ok\": true}")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAiCompatibleProvider::new(config("primary", &server), "secret".to_string());
    let text = provider
        .complete(&[ChatMessage::user("hello")])
        .await
        .unwrap();
    assert_eq!(text, "{\"ok\": true}");
}

#[tokio::test]
async fn test_api_error_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "message": "Resource has been exhausted", "type": "rate_limit" }
        })))
        .mount(&server)
        .await;

    let provider = OpenAiCompatibleProvider::new(config("gemini", &server), "k".to_string());
    let err = provider.complete(&[ChatMessage::user("hi")]).await.unwrap_err();
    assert_eq!(
        err,
        OrchestratorError::ProviderInvocation {
            provider: "gemini".to_string(),
            message: "HTTP 429: Resource has been exhausted".to_string(),
        }
    );
}

#[tokio::test]
async fn test_fallback_to_second_server() {
    let broken = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .expect(1)
        .mount(&broken)
        .await;

    let healthy = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            "Sure!\n```json\n{\"ro_sizing\": {\"membrane_count\": 4}}\n```",
        )))
        .expect(1)
        .mount(&healthy)
        .await;

    let invoker = FallbackInvoker::new()
        .with_provider(
            Arc::new(OpenAiCompatibleProvider::new(config("broken", &broken), "k".to_string())),
            Duration::from_secs(5),
        )
        .with_provider(
            Arc::new(OpenAiCompatibleProvider::new(config("healthy", &healthy), "k".to_string())),
            Duration::from_secs(5),
        );

    let schema = OutputSchema::compile(json!({
        "type": "object",
        "required": ["ro_sizing"],
        "properties": {
            "ro_sizing": {
                "type": "object",
                "required": ["membrane_count"],
                "properties": { "membrane_count": { "type": "number" } }
            }
        }
    }))
    .unwrap();
    let value = invoker
        .invoke(&Prompt::new("size it", "{}"), Some(&schema))
        .await
        .unwrap();
    assert_eq!(value, json!({ "ro_sizing": { "membrane_count": 4 } }));
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("{\"total\": 1}"))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let invoker = FallbackInvoker::new().with_provider(
        Arc::new(OpenAiCompatibleProvider::new(config("slow", &server), "k".to_string())),
        Duration::from_millis(100),
    );
    let err = invoker
        .invoke(&Prompt::new("", "x"), None)
        .await
        .unwrap_err();
    match err {
        OrchestratorError::AllProvidersFailed { attempts, last_error } => {
            assert_eq!(attempts, 1);
            assert!(last_error.contains("timed out"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}
