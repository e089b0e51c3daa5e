//! Integration tests for `AzureProvider` against a mock HTTP server —
//! verifies request construction, auth header selection, and error
//! classification without calling a live provider endpoint.

use agentkern_nexus::{AzureProvider, Provider, RouteRequest, RouterError};
use wiremock::matchers::{header, method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn api_key_auth_used_for_non_cognitiveservices_host() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/openai/deployments/gpt4/chat/completions$"))
        .and(header("api-key", "secret-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"content": "hello there"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 5, "completion_tokens": 3}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = AzureProvider::new("primary", server.uri(), "gpt4", "secret-key");
    let response = provider.complete(&RouteRequest::new("hi")).await.unwrap();

    assert_eq!(response.content, "hello there");
    assert_eq!(response.stop_reason.as_deref(), Some("stop"));
    assert_eq!(response.usage.tokens_in, 5);
    assert!(!response.usage.is_estimated);
}

#[tokio::test]
async fn rate_limit_response_marks_provider_unhealthy() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/openai/deployments/gpt4/chat/completions$"))
        .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
            "error": {"code": "rate_limited", "type": "rate_limit_error", "message": "slow down"}
        })))
        .mount(&server)
        .await;

    let provider = AzureProvider::new("primary", server.uri(), "gpt4", "secret-key").with_max_retries(0);
    let err = provider.complete(&RouteRequest::new("hi")).await.unwrap_err();

    match err {
        RouterError::Provider(api_err) => {
            assert!(api_err.is_rate_limit());
            assert!(api_err.is_transient());
        }
        other => panic!("expected a provider error, got {other:?}"),
    }
    assert!(!provider.is_healthy());
}

#[tokio::test]
async fn successful_call_restores_health_after_prior_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/openai/deployments/gpt4/chat/completions$"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/openai/deployments/gpt4/chat/completions$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"content": "recovered"}, "finish_reason": "stop"}]
        })))
        .mount(&server)
        .await;

    let provider = AzureProvider::new("primary", server.uri(), "gpt4", "secret-key").with_max_retries(0);
    assert!(provider.complete(&RouteRequest::new("hi")).await.is_err());
    assert!(!provider.is_healthy());

    let response = provider.complete(&RouteRequest::new("hi")).await.unwrap();
    assert_eq!(response.content, "recovered");
    assert!(provider.is_healthy());
}
