mod common;

use axum::http::StatusCode;
use common::{generate_request, read_json, unconfigured_config, TestApp, TEST_CLIENT_IP};
use relay_service::handlers::generate::QUOTA_GUIDANCE;
use relay_service::services::providers::mock::{MockReply, MockTextProvider, RecordedCall};
use relay_service::services::providers::ProviderError;
use serde_json::json;

#[tokio::test]
async fn test_generate_returns_provider_output() {
    let app = TestApp::new(MockTextProvider::replying("pong"));

    let response = app.generate(json!({"prompt": "ping"})).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await, json!({"output": "pong"}));
    assert_eq!(app.provider.generate_calls(), 1);
    assert_eq!(
        app.provider.last_call(),
        Some(RecordedCall {
            prompt: "ping".to_string(),
            system_instruction: None,
        })
    );
}

#[tokio::test]
async fn test_generate_forwards_system_instruction() {
    let app = TestApp::new(MockTextProvider::new(MockReply::Echo));

    let response = app
        .generate(json!({"prompt": "hello", "systemInstruction": "You are a terminal."}))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        read_json(response).await,
        json!({"output": "Mock response for: hello"})
    );
    assert_eq!(
        app.provider.last_call().and_then(|c| c.system_instruction),
        Some("You are a terminal.".to_string())
    );
}

#[tokio::test]
async fn test_output_is_returned_verbatim() {
    let text = "  line one\n\n```rust\nfn main() {}\n```\n";
    let app = TestApp::new(MockTextProvider::replying(text));

    let response = app.generate(json!({"prompt": "code please"})).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["output"], text);
}

#[tokio::test]
async fn test_empty_prompt_is_rejected_without_provider_call() {
    let app = TestApp::new(MockTextProvider::replying("unused"));

    let response = app.generate(json!({"prompt": ""})).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await, json!({"error": "Invalid prompt"}));
    assert_eq!(app.provider.generate_calls(), 0);
}

#[tokio::test]
async fn test_missing_or_non_string_prompt_is_rejected() {
    let app = TestApp::new(MockTextProvider::replying("unused"));

    for body in [
        json!({}),
        json!({"prompt": 7}),
        json!({"prompt": {"text": "hi"}}),
        json!({"prompt": "  \t "}),
    ] {
        let response = app.generate(body.clone()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);
        assert_eq!(read_json(response).await["error"], "Invalid prompt");
    }
    assert_eq!(app.provider.generate_calls(), 0);
}

#[tokio::test]
async fn test_oversized_prompts_never_reach_provider() {
    let mut config = common::test_config();
    config.limits.max_prompt_chars = 50;
    let app = TestApp::with_config(config, MockTextProvider::replying("unused"));

    for len in [51, 64, 500, 5_000] {
        let response = app.generate(json!({"prompt": "a".repeat(len)})).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "len: {}", len);

        let body = read_json(response).await;
        assert_eq!(body["error"], "Invalid prompt");
        assert_eq!(
            body["details"],
            "Prompt exceeds the maximum length of 50 characters"
        );
    }
    assert_eq!(app.provider.generate_calls(), 0);

    let response = app.generate(json!({"prompt": "a".repeat(50)})).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.provider.generate_calls(), 1);
}

#[tokio::test]
async fn test_invalid_system_instruction_is_rejected() {
    let app = TestApp::new(MockTextProvider::replying("unused"));

    let response = app
        .generate(json!({"prompt": "ping", "systemInstruction": ["be brief"]}))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        read_json(response).await["error"],
        "Invalid system instruction"
    );
    assert_eq!(app.provider.generate_calls(), 0);
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let app = TestApp::new(MockTextProvider::replying("unused"));

    let response = app
        .send(generate_request(TEST_CLIENT_IP, "{\"prompt\": "))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["error"], "Invalid request body");
    assert!(body["details"].is_string());
    assert_eq!(app.provider.generate_calls(), 0);
}

#[tokio::test]
async fn test_non_object_body_is_rejected() {
    let app = TestApp::new(MockTextProvider::replying("unused"));

    let response = app.generate(json!("ping")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["error"], "Invalid request body");
    assert_eq!(app.provider.generate_calls(), 0);
}

#[tokio::test]
async fn test_missing_api_key_fails_before_provider_call() {
    let app = TestApp::with_config(unconfigured_config(), MockTextProvider::replying("unused"));

    let response = app.generate(json!({"prompt": "ping"})).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = read_json(response).await;
    assert_eq!(body["error"], "Server configuration error");
    assert!(body["details"].is_string());
    assert_eq!(app.provider.generate_calls(), 0);
}

#[tokio::test]
async fn test_provider_quota_error_maps_to_429() {
    let app = TestApp::new(MockTextProvider::failing(ProviderError::QuotaExceeded(
        "Resource has been exhausted (e.g. check quota).".to_string(),
    )));

    let response = app.generate(json!({"prompt": "ping"})).await;

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().get("retry-after").is_none());
    assert_eq!(
        read_json(response).await,
        json!({"error": "API quota exceeded", "details": QUOTA_GUIDANCE})
    );
}

#[tokio::test]
async fn test_model_not_found_includes_remediation_hint() {
    let app = TestApp::new(
        MockTextProvider::failing(ProviderError::ModelNotFound {
            model: "gemini-test-model".to_string(),
            message: "models/gemini-test-model is not found".to_string(),
        })
        .with_model("gemini-test-model"),
    );

    let response = app.generate(json!({"prompt": "ping"})).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = read_json(response).await;
    assert_eq!(body["error"], "Model not found");
    let details = body["details"].as_str().unwrap();
    assert!(details.contains("gemini-test-model"));
    assert!(details.contains("GEMINI_MODEL"));
}

#[tokio::test]
async fn test_other_provider_failures_map_to_500() {
    let app = TestApp::new(MockTextProvider::failing(ProviderError::Api {
        status: 503,
        message: "The model is overloaded.".to_string(),
    }));

    let response = app.generate(json!({"prompt": "ping"})).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = read_json(response).await;
    assert_eq!(body["error"], "Failed to generate content");
    assert!(body["details"]
        .as_str()
        .unwrap()
        .contains("The model is overloaded."));
}

#[tokio::test]
async fn test_blocked_content_maps_to_500() {
    let app = TestApp::new(MockTextProvider::failing(ProviderError::ContentBlocked(
        "SAFETY".to_string(),
    )));

    let response = app.generate(json!({"prompt": "ping"})).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = read_json(response).await;
    assert_eq!(body["error"], "Failed to generate content");
    assert!(body["details"].as_str().unwrap().contains("SAFETY"));
}
