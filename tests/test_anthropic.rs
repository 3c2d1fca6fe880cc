//! Integration tests for Anthropic provider
//!
//! - Messages API request shape (headers, system prompt extraction)
//! - Response parsing and token accounting
//! - Error classification by HTTP status

use compliance_screener::llm::provider::{
    CompletionRequest, FinishReason, LlmError, LlmProvider, Message,
};
use compliance_screener::llm::providers::anthropic::{AnthropicConfig, AnthropicProvider};
use std::collections::HashMap;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(base_url: &str) -> AnthropicConfig {
    AnthropicConfig {
        api_key: "test-api-key".to_string(),
        base_url: base_url.to_string(),
        timeout: Duration::from_secs(5),
        version: "2023-06-01".to_string(),
    }
}

fn test_request(model: &str) -> CompletionRequest {
    CompletionRequest {
        messages: vec![
            Message::system("You are an Ethics & Compliance Auditor."),
            Message::user("Review the analyst's findings"),
        ],
        model: model.to_string(),
        max_tokens: Some(256),
        temperature: None,
        metadata: HashMap::new(),
    }
}

fn message_body(text: &str, stop_reason: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "msg_123",
        "type": "message",
        "role": "assistant",
        "content": [{"type": "text", "text": text}],
        "model": "claude-3-5-sonnet-20241022",
        "stop_reason": stop_reason,
        "usage": {"input_tokens": 12, "output_tokens": 30}
    })
}

#[tokio::test]
async fn test_anthropic_provider_returns_successful_completion_with_valid_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(header("x-api-key", "test-api-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(message_body("Audit complete: no ethical concerns", "end_turn")),
        )
        .mount(&mock_server)
        .await;

    let provider = AnthropicProvider::new(test_config(&mock_server.uri())).unwrap();
    let response = provider
        .complete(test_request("claude-3-5-sonnet-20241022"))
        .await
        .unwrap();

    assert_eq!(
        response.content.as_deref(),
        Some("Audit complete: no ethical concerns")
    );
    assert_eq!(response.usage.prompt_tokens, 12);
    assert_eq!(response.usage.completion_tokens, 30);
    assert_eq!(response.usage.total_tokens, 42);
    assert_eq!(response.finish_reason, FinishReason::Stop);
}

#[tokio::test]
async fn test_anthropic_provider_moves_system_prompt_out_of_messages() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(body_partial_json(serde_json::json!({
            "model": "claude-3-5-sonnet-20241022",
            "max_tokens": 256,
            "system": "You are an Ethics & Compliance Auditor.",
            "messages": [{"role": "user", "content": "Review the analyst's findings"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(message_body("ok", "end_turn")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = AnthropicProvider::new(test_config(&mock_server.uri())).unwrap();
    let result = provider
        .complete(test_request("claude-3-5-sonnet-20241022"))
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_anthropic_provider_converts_max_tokens_stop_reason() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(message_body("partial", "max_tokens")))
        .mount(&mock_server)
        .await;

    let provider = AnthropicProvider::new(test_config(&mock_server.uri())).unwrap();
    let response = provider.complete(test_request("claude")).await.unwrap();

    assert_eq!(response.finish_reason, FinishReason::Length);
}

#[tokio::test]
async fn test_anthropic_provider_classifies_403_as_authentication_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(403).set_body_string("permission denied"))
        .mount(&mock_server)
        .await;

    let provider = AnthropicProvider::new(test_config(&mock_server.uri())).unwrap();
    let result = provider.complete(test_request("claude")).await;

    assert!(matches!(result, Err(LlmError::AuthenticationFailed(_))));
}

#[tokio::test]
async fn test_anthropic_provider_classifies_429_as_rate_limit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(429).set_body_string("overloaded"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = AnthropicProvider::new(test_config(&mock_server.uri())).unwrap();
    let result = provider.complete(test_request("claude")).await;

    assert!(matches!(result, Err(LlmError::RateLimitExceeded(_))));
}

#[tokio::test]
async fn test_anthropic_provider_reports_server_error_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal failure"))
        .mount(&mock_server)
        .await;

    let provider = AnthropicProvider::new(test_config(&mock_server.uri())).unwrap();

    match provider.complete(test_request("claude")).await.unwrap_err() {
        LlmError::ApiError(msg) => {
            assert!(msg.contains("Anthropic"));
            assert!(msg.contains("internal failure"));
        }
        other => panic!("Expected ApiError, got {other:?}"),
    }
}

#[tokio::test]
async fn test_anthropic_provider_rejects_empty_content() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "content": [],
            "model": "claude",
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 1, "output_tokens": 0}
        })))
        .mount(&mock_server)
        .await;

    let provider = AnthropicProvider::new(test_config(&mock_server.uri())).unwrap();
    let result = provider.complete(test_request("claude")).await;

    assert!(matches!(result, Err(LlmError::InvalidResponse(_))));
}

#[test]
fn test_anthropic_provider_requires_api_key() {
    let config = AnthropicConfig::default();

    assert!(matches!(
        AnthropicProvider::new(config),
        Err(LlmError::NotConfigured(_))
    ));
}
