use serde_json::json;
use std::sync::Arc;
use tutor_core::*;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> OpenAIClient {
    OpenAIClient::new("test-key").with_base_url(format!("{}/", server.uri()))
}

fn completion_body(text: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "choices": [
            {"index": 0, "message": {"role": "assistant", "content": text}, "finish_reason": "stop"}
        ],
        "usage": {"prompt_tokens": 12, "completion_tokens": 7, "total_tokens": 19}
    })
}

async fn mount_status(server: &MockServer, status: u16, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

fn prompt() -> Vec<Message> {
    build_prompt("You are a tutor.", &[], "What is a derivative?")
}

// ========================================================================
// Successful completions
// ========================================================================

#[tokio::test]
async fn test_complete_sends_options_and_parses_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "gemini-2.0-flash",
            "max_tokens": 500,
            "messages": [
                {"role": "system", "content": "You are a tutor."},
                {"role": "user", "content": "What is a derivative?"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("A rate of change.")))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server)
        .complete(&prompt(), &CompletionOptions::default())
        .await
        .unwrap();

    assert_eq!(response.text, "A rate of change.");
    let usage = response.usage.unwrap();
    assert_eq!(usage.input_tokens, 12);
    assert_eq!(usage.output_tokens, 7);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let temperature = body["temperature"].as_f64().unwrap();
    assert!((temperature - 0.7).abs() < 1e-6);
}

#[tokio::test]
async fn test_tutor_title_uses_title_options() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"max_tokens": 20})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("  Derivatives\n")))
        .expect(1)
        .mount(&server)
        .await;

    let tutor = Tutor::new(Arc::new(client_for(&server)));
    let title = tutor.generate_title("What is a derivative?").await.unwrap();
    assert_eq!(title, "Derivatives");
}

// ========================================================================
// Failure classification
// ========================================================================

#[tokio::test]
async fn test_unauthorized_and_forbidden_map_to_auth() {
    for status in [401u16, 403] {
        let server = MockServer::start().await;
        mount_status(&server, status, json!({"error": {"message": "bad key"}})).await;

        let err = client_for(&server)
            .complete(&prompt(), &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TutorError::Auth { status: s } if s == status));
        assert!(err.is_completion_failure());
    }
}

#[tokio::test]
async fn test_too_many_requests_maps_to_rate_limited() {
    let server = MockServer::start().await;
    mount_status(&server, 429, json!({"error": {"message": "slow down"}})).await;

    let err = client_for(&server)
        .complete(&prompt(), &CompletionOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, TutorError::RateLimited));
}

#[tokio::test]
async fn test_upstream_error_message_is_surfaced() {
    let server = MockServer::start().await;
    mount_status(&server, 500, json!({"error": {"message": "model overloaded"}})).await;

    let err = client_for(&server)
        .complete(&prompt(), &CompletionOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(&err, TutorError::Service(m) if m == "model overloaded"));
    assert!(err.user_message().contains("model overloaded"));
}

#[tokio::test]
async fn test_empty_choices_is_service_error() {
    let server = MockServer::start().await;
    mount_status(&server, 200, json!({"choices": []})).await;

    let err = client_for(&server)
        .complete(&prompt(), &CompletionOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, TutorError::Service(_)));
}

#[tokio::test]
async fn test_no_response_is_unreachable() {
    let client = OpenAIClient::new("test-key").with_base_url("http://127.0.0.1:1");

    let err = client
        .complete(&prompt(), &CompletionOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, TutorError::Unreachable(_)));
}
