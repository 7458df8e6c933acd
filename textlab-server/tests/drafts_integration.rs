//! AI draft flow over HTTP: Gemini via a mock server, failures, and
//! overlapping requests.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use textlab_server::{
    DraftServiceError, GeminiConfig, GeminiLayoutService, LayoutService, RetryConfig,
    SampleLayoutService,
};
use tokio::sync::Notify;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::TestServer;

/// Holds every request until released.
struct GatedService {
    gate: Arc<Notify>,
}

#[async_trait]
impl LayoutService for GatedService {
    fn name(&self) -> &'static str {
        "gated"
    }

    async fn propose(&self, prompt: &str) -> Result<Value, DraftServiceError> {
        self.gate.notified().await;
        SampleLayoutService.propose(prompt).await
    }
}

fn gemini_for(server: &MockServer) -> Arc<dyn LayoutService> {
    let config = GeminiConfig {
        api_key: "test-key".to_string(),
        model: "gemini-test".to_string(),
        endpoint: server.uri(),
    };
    Arc::new(
        GeminiLayoutService::with_retry_config(&config, RetryConfig::no_retry())
            .expect("gemini service"),
    )
}

async fn wait_for_status(server: &TestServer, session: &str, status: &str) {
    for _ in 0..100 {
        let (_, snapshot) = server.get_json(&format!("/api/sessions/{session}")).await;
        if snapshot["drafts"]["status"] == status {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("drafts never reached {status}");
}

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn test_gemini_drafts_drop_invalid_candidates() {
    let mock = MockServer::start().await;
    let layouts = json!({
        "layouts": [
            {
                "description": "A bird in flight",
                "elements": [
                    { "glyph": "pie", "x": 120, "y": 140, "scale": 1.4, "rotation": -20, "fontWeight": 700 },
                    { "glyph": "na", "x": 180, "y": 140, "scale": 1.4, "rotation": 20, "fontWeight": 700 },
                    { "glyph": "dian", "x": 150, "y": 120, "scale": 0.5, "rotation": 0, "fontWeight": 950 }
                ]
            },
            {
                "description": "Invented glyph",
                "elements": [
                    { "glyph": "dragon", "x": 150, "y": 150, "scale": 1, "rotation": 0, "fontWeight": 400 }
                ]
            },
            {
                "description": "Collapsed",
                "elements": [
                    { "glyph": "kou", "x": 150, "y": 150, "scale": 0.05, "rotation": 0, "fontWeight": 400 }
                ]
            }
        ]
    });
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-test:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": layouts.to_string() }] } }]
        })))
        .mount(&mock)
        .await;

    let server = TestServer::with_layouts(gemini_for(&mock)).await;

    let (status, batch) = server.post("g", "/drafts", &json!({ "prompt": "bird" })).await;
    assert_eq!(status, 200);
    assert_eq!(batch["candidates"].as_array().map(Vec::len), Some(1));
    assert_eq!(batch["rejected"].as_array().map(Vec::len), Some(2));
    assert_eq!(batch["rejected"][0]["index"], 1);
    assert_eq!(batch["rejected"][1]["index"], 2);

    let (status, accepted) = server.post("g", "/drafts/0/accept", &json!({})).await;
    assert_eq!(status, 200);
    let elements = accepted["session"]["elements"].as_array().expect("elements");
    assert_eq!(elements.len(), 3);
    assert_eq!(elements[2]["fontWeight"], 900);
    assert_eq!(elements[0]["char"], "丿");

    server.shutdown().await;
}

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn test_gemini_failure_leaves_scene_untouched() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock)
        .await;

    let server = TestServer::with_layouts(gemini_for(&mock)).await;
    server
        .post("f", "/elements", &json!({ "glyph": "huo", "x": 150.0, "y": 150.0 }))
        .await;

    let (status, body) = server.post("f", "/drafts", &json!({ "prompt": "fire" })).await;
    assert_eq!(status, 502);
    assert_eq!(body["code"], "layout_service");

    let (_, snapshot) = server.get_json("/api/sessions/f").await;
    assert_eq!(snapshot["drafts"]["status"], "failed");
    assert_eq!(snapshot["drafts"]["prompt"], "fire");
    assert_eq!(snapshot["elements"].as_array().map(Vec::len), Some(1));
    assert_eq!(snapshot["history_len"], 2);

    // A failed request does not block the next one.
    let (status, _) = server.post("f", "/drafts", &json!({ "prompt": "fire" })).await;
    assert_eq!(status, 502);

    server.shutdown().await;
}

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn test_gemini_payload_without_usable_drafts() {
    let mock = MockServer::start().await;
    let layouts = json!({ "layouts": [{ "description": "empty", "elements": [] }] });
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": layouts.to_string() }] } }]
        })))
        .mount(&mock)
        .await;

    let server = TestServer::with_layouts(gemini_for(&mock)).await;
    let (status, body) = server.post("n", "/drafts", &json!({ "prompt": "void" })).await;
    assert_eq!(status, 502);
    assert_eq!(body["code"], "no_usable_drafts");

    server.shutdown().await;
}

#[tokio::test]
async fn test_overlapping_request_rejected_and_discard_makes_reply_stale() {
    let gate = Arc::new(Notify::new());
    let server = Arc::new(
        TestServer::with_layouts(Arc::new(GatedService { gate: gate.clone() })).await,
    );

    let first = {
        let server = server.clone();
        tokio::spawn(async move { server.post("p", "/drafts", &json!({ "prompt": "tree" })).await })
    };
    wait_for_status(&server, "p", "pending").await;

    let (status, body) = server.post("p", "/drafts", &json!({ "prompt": "forest" })).await;
    assert_eq!(status, 409);
    assert_eq!(body["code"], "draft_pending");

    let discarded: Value = server
        .client()
        .delete(server.session_url("p", "/drafts"))
        .send()
        .await
        .expect("delete")
        .json()
        .await
        .expect("json");
    assert_eq!(discarded["drafts"]["status"], "idle");

    gate.notify_one();
    let (status, body) = first.await.expect("join");
    assert_eq!(status, 409);
    assert_eq!(body["code"], "stale_draft");

    let (_, snapshot) = server.get_json("/api/sessions/p").await;
    assert_eq!(snapshot["drafts"]["status"], "idle");
    assert!(snapshot["elements"].as_array().is_some_and(Vec::is_empty));
}
