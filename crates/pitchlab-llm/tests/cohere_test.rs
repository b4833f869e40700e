use pitchlab_llm::{
    ApiVersion, ChatMessage, ChatRequest, CohereClient, CohereConfig, GenerationBackend, LlmError,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn conversation_request() -> ChatRequest {
    ChatRequest::new(vec![
        ChatMessage::system("You are Alex Johnson, VP of Sales at TechCorp."),
        ChatMessage::user("Hi Alex, thanks for taking the call."),
        ChatMessage::assistant("Sure. What's this about?"),
        ChatMessage::user("We help teams cut onboarding time in half."),
    ])
    .with_temperature(0.7)
    .with_max_tokens(150)
}

#[tokio::test]
async fn v2_chat_returns_trimmed_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/chat"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {
                "content": [
                    {"type": "text", "text": "  How does that work in practice?  "}
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client =
        CohereClient::new(CohereConfig::new("test-key", "command-r-plus")).with_base_url(server.uri());

    let reply = client
        .generate(conversation_request())
        .await
        .expect("generation should succeed");
    assert_eq!(reply, "How does that work in practice?");
}

#[tokio::test]
async fn v2_sends_role_tagged_message_array() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/chat"))
        .and(body_partial_json(json!({
            "model": "command-r-plus",
            "messages": [
                {"role": "system", "content": "You are Alex Johnson, VP of Sales at TechCorp."},
                {"role": "user", "content": "Hi Alex, thanks for taking the call."},
                {"role": "assistant", "content": "Sure. What's this about?"},
                {"role": "user", "content": "We help teams cut onboarding time in half."}
            ],
            "max_tokens": 150
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"content": [{"type": "text", "text": "ok"}]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client =
        CohereClient::new(CohereConfig::new("test-key", "command-r-plus")).with_base_url(server.uri());

    client
        .generate(conversation_request())
        .await
        .expect("generation should succeed");
}

#[tokio::test]
async fn v1_splits_history_from_current_message() {
    let server = MockServer::start().await;

    // The legacy API takes the current utterance as `message` and everything
    // before it as `chat_history` in the SYSTEM/USER/CHATBOT vocabulary.
    Mock::given(method("POST"))
        .and(path("/v1/chat"))
        .and(body_partial_json(json!({
            "message": "We help teams cut onboarding time in half.",
            "chat_history": [
                {"role": "SYSTEM", "message": "You are Alex Johnson, VP of Sales at TechCorp."},
                {"role": "USER", "message": "Hi Alex, thanks for taking the call."},
                {"role": "CHATBOT", "message": "Sure. What's this about?"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": " Interesting. "})))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = CohereConfig::new("test-key", "command-a-03-2025");
    config.api_version = ApiVersion::V1;
    let client = CohereClient::new(config).with_base_url(server.uri());

    let reply = client
        .generate(conversation_request())
        .await
        .expect("generation should succeed");
    assert_eq!(reply, "Interesting.");
}

#[tokio::test]
async fn v1_rejects_a_request_that_does_not_end_with_a_user_message() {
    let mut config = CohereConfig::new("test-key", "command-a-03-2025");
    config.api_version = ApiVersion::V1;
    let client = CohereClient::new(config);

    let request = ChatRequest::new(vec![ChatMessage::assistant("dangling reply")]);
    let err = client.generate(request).await.expect_err("should fail");
    assert!(matches!(err, LlmError::InvalidRequest(_)));
}

#[tokio::test]
async fn provider_error_carries_status_and_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/chat"))
        .respond_with(
            ResponseTemplate::new(429).set_body_json(json!({"message": "rate limited"})),
        )
        .mount(&server)
        .await;

    let client =
        CohereClient::new(CohereConfig::new("test-key", "command-r-plus")).with_base_url(server.uri());

    let err = client
        .generate(conversation_request())
        .await
        .expect_err("should surface the provider error");
    match err {
        LlmError::Api { status, message } => {
            assert_eq!(status, 429);
            assert_eq!(message, "rate limited");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn empty_content_is_an_empty_response_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/chat"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"message": {"content": []}})),
        )
        .mount(&server)
        .await;

    let client =
        CohereClient::new(CohereConfig::new("test-key", "command-r-plus")).with_base_url(server.uri());

    let err = client
        .generate(conversation_request())
        .await
        .expect_err("empty content should fail");
    assert!(matches!(err, LlmError::EmptyResponse));
}
