//! Axum route handlers for the job-prep tools.
//!
//! Each handler maps one request onto one `GenerationClient` call. Nothing is
//! kept between requests; the mock interview history travels in the body.

use axum::{
    extract::{multipart::MultipartError, rejection::JsonRejection, Multipart, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::generation::client::ResumeDocument;
use crate::generation::interview::{InterviewPhase, InterviewSession};
use crate::generation::models::{ChatTurn, GdTopic, InterviewQuestion, JdMatchResult, ResumeAnalysis};
use crate::state::AppState;

const RESUME_FIELD: &str = "file";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchJdRequest {
    pub resume_text: String,
    pub jd_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionsRequest {
    pub role: String,
    #[serde(default)]
    pub jd_text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GdTopicRequest {
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InterviewFeedbackRequest {
    #[serde(default)]
    pub history: Vec<ChatTurn>,
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct InterviewStartResponse {
    pub phase: InterviewPhase,
    pub history: Vec<ChatTurn>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewFeedbackResponse {
    pub feedback: String,
    pub next_question: String,
    /// The submitted history with the answer and the interviewer's reply appended.
    pub history: Vec<ChatTurn>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/resume/analyze
///
/// Multipart upload, field `file`: a PDF, PNG or JPG no larger than the configured ceiling.
pub async fn handle_analyze_resume(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ResumeAnalysis>, AppError> {
    let document = read_resume_upload(&mut multipart, state.config.max_upload_bytes).await?;
    let analysis = state.generation.analyze_resume(&document).await?;
    Ok(Json(analysis))
}

/// POST /api/v1/jd/match
///
/// Texts longer than the configured limit are cut before they reach the model.
pub async fn handle_match_jd(
    State(state): State<AppState>,
    Json(request): Json<MatchJdRequest>,
) -> Result<Json<JdMatchResult>, AppError> {
    if request.resume_text.trim().is_empty() || request.jd_text.trim().is_empty() {
        return Err(AppError::Validation(
            "resumeText and jdText cannot be empty".to_string(),
        ));
    }

    let result = state
        .generation
        .match_jd(&request.resume_text, &request.jd_text)
        .await?;
    Ok(Json(result))
}

/// POST /api/v1/interview/questions
pub async fn handle_generate_questions(
    State(state): State<AppState>,
    Json(request): Json<QuestionsRequest>,
) -> Result<Json<Vec<InterviewQuestion>>, AppError> {
    let questions = state
        .generation
        .generate_questions(&request.role, request.jd_text.as_deref())
        .await?;
    Ok(Json(questions))
}

/// POST /api/v1/gd/topic
///
/// The body is optional; without a topic the model picks one. A body sent
/// as JSON must still be a valid request.
pub async fn handle_gd_topic(
    State(state): State<AppState>,
    body: Result<Json<GdTopicRequest>, JsonRejection>,
) -> Result<Json<GdTopic>, AppError> {
    let request = match body {
        Ok(Json(request)) => request,
        Err(JsonRejection::MissingJsonContentType(_)) => GdTopicRequest::default(),
        Err(rejection) => return Err(AppError::Validation(rejection.body_text())),
    };
    let topic = state
        .generation
        .generate_gd_topic(request.topic.as_deref())
        .await?;
    Ok(Json(topic))
}

/// POST /api/v1/interview/start
///
/// Returns the seeded conversation. The greeting is fixed text, not a model call.
pub async fn handle_interview_start() -> Json<InterviewStartResponse> {
    let mut session = InterviewSession::new();
    session.start();
    Json(InterviewStartResponse {
        phase: session.phase(),
        history: session.into_history(),
    })
}

/// POST /api/v1/interview/feedback
pub async fn handle_interview_feedback(
    State(state): State<AppState>,
    Json(request): Json<InterviewFeedbackRequest>,
) -> Result<Json<InterviewFeedbackResponse>, AppError> {
    let mut session = InterviewSession::resume(request.history);
    let reply = session.submit(&state.generation, &request.answer).await?;

    let feedback = reply.feedback.clone().unwrap_or_default();
    let next_question = reply.text.clone();
    Ok(Json(InterviewFeedbackResponse {
        feedback,
        next_question,
        history: session.into_history(),
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Upload helpers
// ────────────────────────────────────────────────────────────────────────────

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("resume upload exceeds the size limit".to_string())
    } else {
        AppError::Validation(format!("invalid multipart body: {}", e.body_text()))
    }
}

async fn read_resume_upload(
    multipart: &mut Multipart,
    max_bytes: usize,
) -> Result<ResumeDocument, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(RESUME_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let declared = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(multipart_error)?;

        if data.is_empty() {
            return Err(AppError::Validation("uploaded file is empty".to_string()));
        }
        if data.len() > max_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "resume is {} bytes; the limit is {max_bytes}",
                data.len()
            )));
        }
        let mime_type = resolve_mime_type(declared.as_deref(), file_name.as_deref())
            .ok_or_else(|| {
                AppError::Validation("unsupported file type; expected PDF, PNG or JPG".to_string())
            })?;

        return Ok(ResumeDocument {
            data,
            mime_type: mime_type.to_string(),
        });
    }
    Err(AppError::Validation(format!(
        "multipart field `{RESUME_FIELD}` is required"
    )))
}

/// Accepted resume MIME type from the declared content type, falling back to the extension.
fn resolve_mime_type(declared: Option<&str>, file_name: Option<&str>) -> Option<&'static str> {
    let from_declared = declared.and_then(|ct| {
        match ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase().as_str() {
            "application/pdf" => Some("application/pdf"),
            "image/png" => Some("image/png"),
            "image/jpeg" | "image/jpg" => Some("image/jpeg"),
            _ => None,
        }
    });
    from_declared.or_else(|| {
        let extension = file_name?.rsplit_once('.')?.1.to_ascii_lowercase();
        match extension.as_str() {
            "pdf" => Some("application/pdf"),
            "png" => Some("image/png"),
            "jpg" | "jpeg" => Some("image/jpeg"),
            _ => None,
        }
    })
}
