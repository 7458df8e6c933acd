//! Layout services that turn a prompt into AI layout proposals.
//!
//! Two implementations sit behind [`LayoutService`]:
//! - [`GeminiLayoutService`] calls the Generative Language API
//!   `generateContent` endpoint with a JSON response schema.
//! - [`SampleLayoutService`] answers offline with three fixed compositions,
//!   used when no API key is configured.
//!
//! Both return the raw payload; validation happens in
//! [`textlab_core::parse_proposals`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use textlab_core::GlyphId;
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::config::GeminiConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const SYSTEM_INSTRUCTION: &str = "You are a creative visual artist specializing in typography art. \
Your task is to create a visual representation of a user's concept by arranging a set of predefined \
Chinese radicals and strokes on a canvas. Your goal is to form a recognizable shape or silhouette of \
the concept, not to create a new, valid Chinese character.

1. Visualize the concept as a simple, iconic shape or silhouette.
2. Use the glyphs as building blocks. A glyph may be used more than once. Every design MUST use at \
least 5 glyphs; more is welcome for detail.
3. The canvas is a 300x300 grid. The main drawing area is the central 200x200 box (x=50..250, \
y=50..250). Coordinates are for the element's CENTER. Use 'scale' (1 is normal size) and 'rotation' \
(degrees) to fit glyphs to the contours of the shape. Use 'fontWeight' (100-900) for hierarchy: \
700-900 for main structure, 400-600 for support, 100-300 for subtle detail.
4. Create 3 distinct variations that differ in composition, glyph choice or style.
5. Describe each layout briefly: what it depicts and how the glyphs achieve the effect.";

/// Errors from a layout service.
#[derive(Debug, Error)]
pub enum DraftServiceError {
    /// The configured endpoint is not a usable base URL.
    #[error("invalid layout service endpoint: {0}")]
    InvalidEndpoint(String),
    /// HTTP layer failed (connection, timeout, etc.).
    #[error("layout service request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The service answered with a non-success status.
    #[error("layout service returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },
    /// The response held no candidate text.
    #[error("layout service response had no content")]
    EmptyResponse,
    /// The candidate text was not JSON.
    #[error("layout service returned invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl DraftServiceError {
    /// Returns true for transient failures worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(err) => !err.is_decode(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Configuration for retry with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts.
    pub max_attempts: u32,
    /// Delay before the first retry in milliseconds.
    pub initial_delay_ms: u64,
    /// Upper bound for any delay in milliseconds.
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 250,
            max_delay_ms: 4_000,
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// A configuration that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before retrying after `attempt` (0-indexed).
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        clippy::cast_possible_wrap
    )]
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        let base = self.initial_delay_ms as f64 * self.multiplier.powi(attempt as i32);
        base.min(self.max_delay_ms as f64) as u64
    }
}

/// Something that proposes layouts for a prompt.
#[async_trait]
pub trait LayoutService: Send + Sync {
    /// Short name for logs and metrics.
    fn name(&self) -> &'static str;

    /// Ask for layouts. The payload is returned unvalidated.
    async fn propose(&self, prompt: &str) -> Result<Value, DraftServiceError>;
}

/// Gemini `generateContent` client.
#[derive(Debug, Clone)]
pub struct GeminiLayoutService {
    http: Client,
    endpoint: Url,
    retry: RetryConfig,
}

impl GeminiLayoutService {
    /// Create a client with the default retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`DraftServiceError::InvalidEndpoint`] if the endpoint cannot
    /// be parsed or cannot carry a path, and [`DraftServiceError::Http`] if
    /// the HTTP client fails to build.
    pub fn new(config: &GeminiConfig) -> Result<Self, DraftServiceError> {
        Self::with_retry_config(config, RetryConfig::default())
    }

    /// Create a client with a custom retry policy.
    ///
    /// # Errors
    ///
    /// Same as [`Self::new`].
    pub fn with_retry_config(
        config: &GeminiConfig,
        retry: RetryConfig,
    ) -> Result<Self, DraftServiceError> {
        let mut endpoint = Url::parse(&config.endpoint)
            .map_err(|e| DraftServiceError::InvalidEndpoint(e.to_string()))?;
        let method = format!("{}:generateContent", config.model);
        endpoint
            .path_segments_mut()
            .map_err(|()| DraftServiceError::InvalidEndpoint(config.endpoint.clone()))?
            .pop_if_empty()
            .extend(["v1beta", "models", method.as_str()]);
        endpoint
            .query_pairs_mut()
            .append_pair("key", &config.api_key);

        let http = Client::builder()
            .user_agent(concat!("text-lab/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            endpoint,
            retry,
        })
    }

    async fn generate(&self, body: &Value) -> Result<Value, DraftServiceError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(DraftServiceError::Status {
                status: status.as_u16(),
                body: body.chars().take(512).collect(),
            });
        }

        let envelope: Value = response.json().await?;
        let text = candidate_text(&envelope).ok_or(DraftServiceError::EmptyResponse)?;
        Ok(serde_json::from_str(text.trim())?)
    }
}

#[async_trait]
impl LayoutService for GeminiLayoutService {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn propose(&self, prompt: &str) -> Result<Value, DraftServiceError> {
        let body = request_body(prompt);
        let attempts = self.retry.max_attempts.max(1);

        let mut attempt = 0;
        loop {
            match self.generate(&body).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt + 1 < attempts => {
                    let delay = self.retry.delay_for_attempt(attempt);
                    warn!(
                        "Gemini request failed (attempt {}/{}), retrying in {}ms: {}",
                        attempt + 1,
                        attempts,
                        delay,
                        err
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// `candidates[0].content.parts[0].text` of a `generateContent` response.
fn candidate_text(envelope: &Value) -> Option<&str> {
    envelope
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
}

/// The `generateContent` request body for `prompt`.
#[must_use]
pub fn request_body(prompt: &str) -> Value {
    json!({
        "systemInstruction": { "parts": [{ "text": SYSTEM_INSTRUCTION }] },
        "contents": [{
            "role": "user",
            "parts": [{ "text": format!("Generate layouts for the concept: \"{prompt}\"") }]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": response_schema()
        }
    })
}

fn response_schema() -> Value {
    let glyph_names: Vec<&str> = GlyphId::ALL.iter().map(|g| g.name()).collect();
    json!({
        "type": "OBJECT",
        "properties": {
            "layouts": {
                "type": "ARRAY",
                "description": "An array of 3 distinct layout proposals for the seal.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "description": {
                            "type": "STRING",
                            "description": "A brief, artistic description of the visual style."
                        },
                        "elements": {
                            "type": "ARRAY",
                            "description": "The glyphs that compose the design. Use at least 5.",
                            "items": {
                                "type": "OBJECT",
                                "properties": {
                                    "glyph": {
                                        "type": "STRING",
                                        "enum": glyph_names,
                                        "description": "The name of the glyph or stroke to use."
                                    },
                                    "x": {
                                        "type": "NUMBER",
                                        "description": "Center x on a 300x300 canvas."
                                    },
                                    "y": {
                                        "type": "NUMBER",
                                        "description": "Center y on a 300x300 canvas."
                                    },
                                    "scale": {
                                        "type": "NUMBER",
                                        "description": "Scale of the element. 1 is normal size."
                                    },
                                    "rotation": {
                                        "type": "NUMBER",
                                        "description": "Rotation in degrees."
                                    },
                                    "fontWeight": {
                                        "type": "NUMBER",
                                        "description": "Font weight from 100 to 900."
                                    }
                                },
                                "required": ["glyph", "x", "y", "scale", "rotation", "fontWeight"]
                            }
                        }
                    },
                    "required": ["description", "elements"]
                }
            }
        },
        "required": ["layouts"]
    })
}

/// Offline layout service with three fixed compositions.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleLayoutService;

#[async_trait]
impl LayoutService for SampleLayoutService {
    fn name(&self) -> &'static str {
        "sample"
    }

    async fn propose(&self, prompt: &str) -> Result<Value, DraftServiceError> {
        Ok(sample_layouts(prompt))
    }
}

fn sample_layouts(prompt: &str) -> Value {
    json!({
        "layouts": [
            {
                "description": format!("Minimalist design of \"{prompt}\""),
                "elements": [
                    { "glyph": "zhong", "x": 150, "y": 150, "scale": 1.2, "rotation": 0, "fontWeight": 900 },
                    { "glyph": "heng", "x": 150, "y": 120, "scale": 0.8, "rotation": 0, "fontWeight": 700 },
                    { "glyph": "shu", "x": 120, "y": 150, "scale": 0.8, "rotation": 0, "fontWeight": 700 },
                    { "glyph": "dian", "x": 180, "y": 150, "scale": 0.6, "rotation": 0, "fontWeight": 500 },
                    { "glyph": "dian", "x": 150, "y": 180, "scale": 0.6, "rotation": 0, "fontWeight": 500 }
                ]
            },
            {
                "description": format!("Dynamic composition of \"{prompt}\""),
                "elements": [
                    { "glyph": "shan", "x": 140, "y": 140, "scale": 1.0, "rotation": 15, "fontWeight": 800 },
                    { "glyph": "shui", "x": 160, "y": 160, "scale": 1.1, "rotation": -10, "fontWeight": 900 },
                    { "glyph": "huo", "x": 150, "y": 120, "scale": 0.9, "rotation": 30, "fontWeight": 600 },
                    { "glyph": "tu", "x": 130, "y": 170, "scale": 0.8, "rotation": 45, "fontWeight": 700 },
                    { "glyph": "jin", "x": 170, "y": 130, "scale": 0.7, "rotation": -30, "fontWeight": 500 }
                ]
            },
            {
                "description": format!("Traditional style of \"{prompt}\""),
                "elements": [
                    { "glyph": "da", "x": 150, "y": 130, "scale": 1.3, "rotation": 0, "fontWeight": 900 },
                    { "glyph": "xin", "x": 150, "y": 170, "scale": 1.0, "rotation": 0, "fontWeight": 800 },
                    { "glyph": "dian", "x": 130, "y": 150, "scale": 0.7, "rotation": 0, "fontWeight": 600 },
                    { "glyph": "dian", "x": 170, "y": 150, "scale": 0.7, "rotation": 0, "fontWeight": 600 },
                    { "glyph": "heng", "x": 150, "y": 100, "scale": 0.9, "rotation": 0, "fontWeight": 700 },
                    { "glyph": "heng", "x": 150, "y": 200, "scale": 0.9, "rotation": 0, "fontWeight": 700 }
                ]
            }
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use textlab_core::parse_proposals;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> GeminiConfig {
        GeminiConfig {
            api_key: "test-key".to_string(),
            model: "gemini-test".to_string(),
            endpoint: server.uri(),
        }
    }

    fn envelope(text: &str) -> Value {
        json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] }
            }]
        })
    }

    #[tokio::test]
    async fn test_sample_service_yields_three_valid_layouts() {
        let payload = SampleLayoutService.propose("cat").await.expect("payload");
        let batch = parse_proposals(&payload).expect("batch");
        assert_eq!(batch.candidates.len(), 3);
        assert!(batch.rejected.is_empty());
        assert_eq!(batch.candidates[0].description, "Minimalist design of \"cat\"");
        assert_eq!(batch.candidates[2].elements.len(), 6);
    }

    #[test]
    fn test_request_body_shape() {
        let body = request_body("dragon");
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        let glyphs = &body["generationConfig"]["responseSchema"]["properties"]["layouts"]["items"]
            ["properties"]["elements"]["items"]["properties"]["glyph"]["enum"];
        assert_eq!(glyphs.as_array().map(Vec::len), Some(28));
        assert_eq!(glyphs[0], "shou");
        assert!(body["contents"][0]["parts"][0]["text"]
            .as_str()
            .is_some_and(|t| t.contains("\"dragon\"")));
    }

    #[test]
    fn test_retryable_errors() {
        let server_error = DraftServiceError::Status {
            status: 503,
            body: String::new(),
        };
        let rate_limited = DraftServiceError::Status {
            status: 429,
            body: String::new(),
        };
        let bad_request = DraftServiceError::Status {
            status: 400,
            body: String::new(),
        };
        assert!(server_error.is_retryable());
        assert!(rate_limited.is_retryable());
        assert!(!bad_request.is_retryable());
        assert!(!DraftServiceError::EmptyResponse.is_retryable());
    }

    #[test]
    fn test_backoff_is_capped() {
        let retry = RetryConfig::default();
        assert_eq!(retry.delay_for_attempt(0), 250);
        assert_eq!(retry.delay_for_attempt(1), 500);
        assert_eq!(retry.delay_for_attempt(10), 4_000);
    }

    #[test]
    fn test_invalid_endpoint() {
        let config = GeminiConfig {
            api_key: "k".to_string(),
            model: "m".to_string(),
            endpoint: "not a url".to_string(),
        };
        assert!(matches!(
            GeminiLayoutService::new(&config),
            Err(DraftServiceError::InvalidEndpoint(_))
        ));
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn test_gemini_success() {
        let server = MockServer::start().await;
        let layouts = json!({
            "layouts": [{
                "description": "A mountain",
                "elements": [
                    { "glyph": "shan", "x": 150, "y": 150, "scale": 1.5, "rotation": 0, "fontWeight": 900 }
                ]
            }]
        });

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-test:generateContent"))
            .and(query_param("key", "test-key"))
            .and(body_string_contains("responseSchema"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(&layouts.to_string())))
            .expect(1)
            .mount(&server)
            .await;

        let service = GeminiLayoutService::new(&config_for(&server)).expect("service");
        let payload = service.propose("mountain").await.expect("payload");
        assert_eq!(payload, layouts);
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn test_gemini_client_error_is_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad key"))
            .expect(1)
            .mount(&server)
            .await;

        let service = GeminiLayoutService::new(&config_for(&server)).expect("service");
        let err = service.propose("x").await.expect_err("should fail");
        assert!(matches!(err, DraftServiceError::Status { status: 400, .. }));
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn test_gemini_server_error_is_retried() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let retry = RetryConfig {
            max_attempts: 2,
            initial_delay_ms: 1,
            max_delay_ms: 1,
            multiplier: 1.0,
        };
        let service =
            GeminiLayoutService::with_retry_config(&config_for(&server), retry).expect("service");
        let err = service.propose("x").await.expect_err("should fail");
        assert!(matches!(err, DraftServiceError::Status { status: 503, .. }));
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn test_gemini_unparsable_text() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope("not json")))
            .mount(&server)
            .await;

        let service = GeminiLayoutService::with_retry_config(
            &config_for(&server),
            RetryConfig::no_retry(),
        )
        .expect("service");
        let err = service.propose("x").await.expect_err("should fail");
        assert!(matches!(err, DraftServiceError::InvalidJson(_)));
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn test_gemini_missing_candidates() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let service = GeminiLayoutService::with_retry_config(
            &config_for(&server),
            RetryConfig::no_retry(),
        )
        .expect("service");
        let err = service.propose("x").await.expect_err("should fail");
        assert!(matches!(err, DraftServiceError::EmptyResponse));
    }
}
