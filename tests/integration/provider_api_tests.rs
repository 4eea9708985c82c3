/*!
 * Provider API integration tests against a local HTTP stub
 */

use std::sync::Arc;
use std::time::Duration;

use srtai::errors::ProviderError;
use srtai::providers::openai::OpenAI;
use srtai::providers::{ChatRequest, Provider, RawResponse};
use srtai::translation::{normalize_response, Mode, PromptPolicy, TranslationClient};
use crate::common::{self, StubResponse};

fn request() -> ChatRequest {
    ChatRequest::new("gpt-4o-mini")
        .add_message("system", "Translate into English")
        .add_message("user", "こんにちは")
}

/// A well-formed completion is parsed into the structured shape
#[tokio::test]
async fn test_openai_withStructuredResponse_shouldParseUsage() {
    let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":" Hello "}}],"usage":{"prompt_tokens":21,"completion_tokens":2,"total_tokens":23}}"#;
    let base_url = common::spawn_stub_server(StubResponse::json(body)).await.unwrap();
    let provider = OpenAI::new("sk-test", base_url, Duration::from_secs(5));

    let response = provider.complete(request()).await.unwrap();
    assert!(matches!(response, RawResponse::Structured(_)));
    assert_eq!(normalize_response(response).unwrap(), ("Hello".to_string(), 21, 2));
    assert!(provider.is_connected());

    provider.close().await;
    assert!(!provider.is_connected());
}

/// A 200 answer with a login page is a misconfigured endpoint
#[tokio::test]
async fn test_openai_withHtmlOkResponse_shouldFailMisconfigured() {
    let page = "<!DOCTYPE html><html><head><title>Sign in</title></head><body></body></html>";
    let base_url = common::spawn_stub_server(StubResponse::html(200, page)).await.unwrap();
    let provider = OpenAI::new("sk-test", base_url, Duration::from_secs(5));

    let response = provider.complete(request()).await.unwrap();
    assert!(matches!(normalize_response(response), Err(ProviderError::MisconfiguredEndpoint)));
}

/// An error status with a web page is also a misconfigured endpoint
#[tokio::test]
async fn test_openai_withHtmlErrorStatus_shouldFailMisconfigured() {
    let base_url = common::spawn_stub_server(StubResponse::html(404, "<html><body>Not Found</body></html>"))
        .await
        .unwrap();
    let provider = OpenAI::new("sk-test", base_url, Duration::from_secs(5));

    let err = provider.complete(request()).await.unwrap_err();
    assert!(matches!(err, ProviderError::MisconfiguredEndpoint));
}

/// An error status with a JSON body keeps the status and message
#[tokio::test]
async fn test_openai_withApiErrorStatus_shouldReportStatus() {
    let body = r#"{"error":{"message":"Incorrect API key provided"}}"#;
    let response = StubResponse {
        status: 401,
        ..StubResponse::json(body)
    };
    let base_url = common::spawn_stub_server(response).await.unwrap();
    let provider = OpenAI::new("sk-bad", base_url, Duration::from_secs(5));

    match provider.complete(request()).await {
        Err(ProviderError::ApiError { status_code, message }) => {
            assert_eq!(status_code, 401);
            assert!(message.contains("Incorrect API key"));
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

/// A slow endpoint times out through the client deadline
#[tokio::test]
async fn test_client_withSlowEndpoint_shouldTimeOut() {
    let slow = StubResponse::json(r#"{"choices":[]}"#).delayed(Duration::from_secs(3));
    let base_url = common::spawn_stub_server(slow).await.unwrap();

    let mut settings = common::test_settings(Duration::from_secs(1));
    settings.base_url = Some(base_url.clone());
    let provider = Arc::new(OpenAI::new("sk-test", base_url, Duration::from_secs(1)));
    let client = TranslationClient::with_provider(provider, settings, PromptPolicy::default());

    let err = client.translate_unit("hello", Mode::Translate).await.unwrap_err();
    assert!(matches!(err, ProviderError::Timeout { secs: 1 }));
}

/// Nothing listening on the port is a connection failure
#[tokio::test]
async fn test_openai_withClosedPort_shouldFailToConnect() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let provider = OpenAI::new("sk-test", format!("http://{}/v1", addr), Duration::from_secs(2));
    let err = provider.complete(request()).await.unwrap_err();
    assert!(matches!(err, ProviderError::ConnectionError(_) | ProviderError::RequestFailed(_)));
    assert_eq!(err.kind(), srtai::errors::ErrorKind::TransportError);
}

/// The whole client path over HTTP, from config to trimmed text
#[tokio::test]
async fn test_client_fromConfig_withStubEndpoint_shouldTranslate() {
    let body = r#"{"choices":[{"message":{"content":"Good night"}}],"usage":{"prompt_tokens":30,"completion_tokens":2}}"#;
    let base_url = common::spawn_stub_server(StubResponse::json(body)).await.unwrap();

    let mut config = common::test_config(2);
    config.base_url = base_url;
    let client = TranslationClient::from_config(&config);

    let result = client.translate_unit("おやすみなさい", Mode::Translate).await.unwrap();
    assert_eq!(result.text, "Good night");
    assert_eq!(result.prompt_tokens, 30);
    client.close().await;
}
