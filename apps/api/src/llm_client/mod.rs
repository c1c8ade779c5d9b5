//! Gemini access for the prep API.
//!
//! Only this module speaks HTTP to Gemini. Generation code holds an
//! `Arc<dyn ModelTransport>` and never sees the wire format.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

#[cfg(test)]
pub(crate) mod fake;
pub mod prompts;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const RESPONSE_MIME_TYPE: &str = "application/json";

/// Coarse classification of a [`GenerationError`], stable enough for callers to branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    ResponseParse,
    SchemaViolation,
    InvalidInput,
}

/// The single failure type surfaced by every generation operation.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("transport error{}: {message}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Transport { status: Option<u16>, message: String },

    #[error("response parse error: {0}")]
    ResponseParse(String),

    #[error("schema violation at `{path}`: {reason}")]
    SchemaViolation { path: String, reason: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl GenerationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } => ErrorKind::Transport,
            Self::ResponseParse(_) => ErrorKind::ResponseParse,
            Self::SchemaViolation { .. } => ErrorKind::SchemaViolation,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
        }
    }

    pub(crate) fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Request model (provider-neutral)
// ────────────────────────────────────────────────────────────────────────────

/// Author of a content block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// Inline binary attachment, base64 encoded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Part {
    Text(String),
    InlineData(Blob),
}

#[cfg(test)]
impl Part {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text(text) => Some(text),
            Part::InlineData(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text(text.into())],
        }
    }
}

/// One schema-constrained generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub contents: Vec<Content>,
    pub system_instruction: Option<String>,
    /// Serialized response schema; the model is told to answer in this shape.
    pub response_schema: Value,
}

#[cfg(test)]
impl GenerationRequest {
    /// All text parts of the request, in submission order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.contents
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(Part::as_text)
    }
}

/// Issues a single generation call and returns the raw response text.
///
/// Implementations must not retry. An empty string is a valid return value;
/// interpreting it is the caller's job.
#[async_trait]
pub trait ModelTransport: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Gemini wire format
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: &'a [Content],
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction<'a>>,
    generation_config: GeminiGenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig<'a> {
    response_mime_type: &'a str,
    response_schema: &'a Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<CandidateContent>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    pub prompt_token_count: Option<u32>,
    pub candidates_token_count: Option<u32>,
}

impl GeminiResponse {
    /// Concatenated text of the first candidate. Empty when the model produced none.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Production transport
// ────────────────────────────────────────────────────────────────────────────

/// Connection settings for [`GeminiClient`].
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

/// Gemini `generateContent` transport. One HTTP request per call, no retries.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(settings: GeminiSettings) -> Result<Self, GenerationError> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            client,
            api_key: settings.api_key,
            model: settings.model,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

fn wire_request(request: &GenerationRequest) -> GeminiRequest<'_> {
    GeminiRequest {
        contents: &request.contents,
        system_instruction: request
            .system_instruction
            .as_deref()
            .map(|text| SystemInstruction {
                parts: vec![TextPart { text }],
            }),
        generation_config: GeminiGenerationConfig {
            response_mime_type: RESPONSE_MIME_TYPE,
            response_schema: &request.response_schema,
        },
    }
}

#[async_trait]
impl ModelTransport for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&wire_request(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Gemini API returned {}: {}", status, body);
            let message = serde_json::from_str::<GeminiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(GenerationError::Transport {
                status: Some(status.as_u16()),
                message,
            });
        }

        let body: GeminiResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::transport(format!("undecodable Gemini response: {e}")))?;

        if let Some(usage) = &body.usage_metadata {
            debug!(
                "Gemini call succeeded: prompt_tokens={:?}, output_tokens={:?}",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }
        if let Some(reason) = body.candidates.first().and_then(|c| c.finish_reason.as_deref()) {
            if reason != "STOP" {
                warn!("Gemini finished with reason {reason}");
            }
        }

        Ok(body.text())
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
pub(crate) fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(inner) = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
    else {
        return text;
    };
    let inner = inner.trim_start();
    inner.strip_suffix("```").map(str::trim).unwrap_or(inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::http::{HeaderMap, StatusCode, Uri};
    use serde_json::json;

    fn sample_request() -> GenerationRequest {
        GenerationRequest {
            contents: vec![
                Content {
                    role: Role::User,
                    parts: vec![
                        Part::InlineData(Blob {
                            mime_type: "application/pdf".to_string(),
                            data: "JVBERi0=".to_string(),
                        }),
                        Part::Text("Analyze this resume.".to_string()),
                    ],
                },
                Content {
                    role: Role::Model,
                    parts: vec![Part::Text("Next question?".to_string())],
                },
            ],
            system_instruction: Some("Be strict.".to_string()),
            response_schema: json!({"type": "OBJECT"}),
        }
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n[1, 2]\n```";
        assert_eq!(strip_json_fences(input), "[1, 2]");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        assert_eq!(strip_json_fences("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn test_wire_request_matches_gemini_shape() {
        let request = sample_request();
        let wire = serde_json::to_value(wire_request(&request)).unwrap();

        assert_eq!(wire["contents"][0]["role"], "user");
        assert_eq!(
            wire["contents"][0]["parts"][0]["inlineData"]["mimeType"],
            "application/pdf"
        );
        assert_eq!(wire["contents"][0]["parts"][0]["inlineData"]["data"], "JVBERi0=");
        assert_eq!(wire["contents"][0]["parts"][1]["text"], "Analyze this resume.");
        assert_eq!(wire["contents"][1]["role"], "model");
        assert_eq!(wire["systemInstruction"]["parts"][0]["text"], "Be strict.");
        assert_eq!(
            wire["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(wire["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn test_wire_request_omits_absent_system_instruction() {
        let mut request = sample_request();
        request.system_instruction = None;
        let wire = serde_json::to_value(wire_request(&request)).unwrap();
        assert!(wire.get("systemInstruction").is_none());
    }

    #[test]
    fn test_response_text_joins_parts_of_first_candidate() {
        let body: GeminiResponse = serde_json::from_value(json!({
            "candidates": [
                {"content": {"parts": [{"text": "{\"a\":"}, {"text": " 1}"}]}, "finishReason": "STOP"},
                {"content": {"parts": [{"text": "ignored"}]}}
            ],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 4}
        }))
        .unwrap();
        assert_eq!(body.text(), "{\"a\": 1}");
    }

    #[test]
    fn test_response_without_candidates_has_empty_text() {
        let body: GeminiResponse =
            serde_json::from_value(json!({"promptFeedback": {"blockReason": "SAFETY"}})).unwrap();
        assert_eq!(body.text(), "");
    }

    #[test]
    fn test_texts_skips_inline_data() {
        let request = sample_request();
        let texts: Vec<&str> = request.texts().collect();
        assert_eq!(texts, vec!["Analyze this resume.", "Next question?"]);
    }

    #[test]
    fn test_error_kind_classification() {
        let transport = GenerationError::Transport {
            status: Some(503),
            message: "unavailable".to_string(),
        };
        assert_eq!(transport.kind(), ErrorKind::Transport);
        assert!(transport.to_string().contains("status 503"));
        assert_eq!(
            GenerationError::ResponseParse("empty".into()).kind(),
            ErrorKind::ResponseParse
        );
        assert_eq!(
            GenerationError::SchemaViolation {
                path: "$.score".into(),
                reason: "missing".into()
            }
            .kind(),
            ErrorKind::SchemaViolation
        );
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = GeminiClient::new(GeminiSettings {
            api_key: "key".to_string(),
            model: DEFAULT_MODEL.to_string(),
            base_url: format!("{DEFAULT_BASE_URL}/"),
            timeout: Duration::from_secs(5),
        })
        .unwrap();
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    // ────────────────────────────────────────────────────────────────────────
    // GeminiClient against a local stub server
    // ────────────────────────────────────────────────────────────────────────

    /// (path, x-goog-api-key, body) of every request the stub received.
    type Received = Arc<Mutex<Vec<(String, Option<String>, String)>>>;

    async fn stub_gemini(status: StatusCode, reply: &'static str) -> (GeminiClient, Received) {
        let received: Received = Arc::default();
        let recorder = received.clone();
        let app = axum::Router::new().fallback(
            move |uri: Uri, headers: HeaderMap, body: String| {
                let recorder = recorder.clone();
                async move {
                    let key = headers
                        .get("x-goog-api-key")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    recorder
                        .lock()
                        .unwrap()
                        .push((uri.path().to_string(), key, body));
                    (status, reply)
                }
            },
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = GeminiClient::new(GeminiSettings {
            api_key: "stub-key".to_string(),
            model: DEFAULT_MODEL.to_string(),
            base_url: format!("http://{addr}"),
            timeout: Duration::from_secs(5),
        })
        .unwrap();
        (client, received)
    }

    #[tokio::test]
    async fn test_generate_returns_joined_text_and_sends_key() {
        let (client, received) = stub_gemini(
            StatusCode::OK,
            r#"{"candidates": [{"content": {"parts": [{"text": "{\"ok\":"}, {"text": " true}"}]},
                "finishReason": "STOP"}],
                "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 3}}"#,
        )
        .await;

        let text = client.generate(&sample_request()).await.unwrap();
        assert_eq!(text, "{\"ok\": true}");

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        let (path, key, body) = &received[0];
        assert_eq!(path, "/v1beta/models/gemini-2.5-flash:generateContent");
        assert_eq!(key.as_deref(), Some("stub-key"));
        let sent: Value = serde_json::from_str(body).unwrap();
        assert_eq!(sent["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(sent["systemInstruction"]["parts"][0]["text"], "Be strict.");
    }

    #[tokio::test]
    async fn test_generate_non_success_carries_status_and_provider_message() {
        let (client, received) = stub_gemini(
            StatusCode::UNAUTHORIZED,
            r#"{"error": {"code": 401, "message": "API key not valid. Please pass a valid API key.",
                "status": "UNAUTHENTICATED"}}"#,
        )
        .await;

        let err = client.generate(&sample_request()).await.unwrap_err();
        match err {
            GenerationError::Transport { status, message } => {
                assert_eq!(status, Some(401));
                assert_eq!(message, "API key not valid. Please pass a valid API key.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(received.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_generate_non_success_without_error_envelope_keeps_raw_body() {
        let (client, _) = stub_gemini(StatusCode::SERVICE_UNAVAILABLE, "upstream overloaded").await;

        let err = client.generate(&sample_request()).await.unwrap_err();
        match err {
            GenerationError::Transport { status, message } => {
                assert_eq!(status, Some(503));
                assert_eq!(message, "upstream overloaded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_generate_undecodable_envelope_is_transport_error() {
        let (client, received) = stub_gemini(StatusCode::OK, "<html>not gemini</html>").await;

        let err = client.generate(&sample_request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.to_string().contains("undecodable Gemini response"));
        assert_eq!(received.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_generate_without_candidates_returns_empty_text() {
        let (client, _) = stub_gemini(
            StatusCode::OK,
            r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#,
        )
        .await;

        assert_eq!(client.generate(&sample_request()).await.unwrap(), "");
    }
}
