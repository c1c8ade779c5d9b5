//! Generation client: the five job-prep operations on top of one request pattern.
//!
//! Every operation builds a content payload plus a response schema, calls the
//! model exactly once, and turns the reply into a typed record:
//!
//! text → strip fences → JSON parse → [`enforce`] against the schema → deserialize.
//!
//! Empty or `null` text is a [`GenerationError::ResponseParse`], never an empty
//! record. The client holds no mutable state and is cheap to clone.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde_json::Value;
use tracing::{info, warn};

use crate::generation::models::{
    ChatTurn, GdTopic, InterviewFeedback, InterviewQuestion, JdMatchResult, ResumeAnalysis,
};
use crate::generation::prompts;
use crate::generation::schema::{enforce, StructuredOutput};
use crate::llm_client::{
    strip_json_fences, Blob, Content, GenerationError, GenerationRequest, ModelTransport, Part,
    Role,
};

pub const DEFAULT_RESUME_TEXT_LIMIT: usize = 5000;
pub const DEFAULT_JD_SNIPPET_LIMIT: usize = 1000;

/// Input size limits applied before a request is built.
///
/// Truncation is silent and lossy: anything past the limit never reaches the
/// model. Limits count Unicode scalar values, not bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationLimits {
    /// Prefix kept from each of the resume and JD texts in `match_jd`.
    pub match_text_chars: usize,
    /// Prefix kept from the optional JD snippet in `generate_questions`.
    pub jd_snippet_chars: usize,
    /// Most recent history turns submitted by `get_interview_feedback`; `None` sends all.
    pub max_history_turns: Option<usize>,
}

impl Default for GenerationLimits {
    fn default() -> Self {
        Self {
            match_text_chars: DEFAULT_RESUME_TEXT_LIMIT,
            jd_snippet_chars: DEFAULT_JD_SNIPPET_LIMIT,
            max_history_turns: None,
        }
    }
}

/// An uploaded resume: raw bytes plus their MIME type.
#[derive(Debug, Clone)]
pub struct ResumeDocument {
    pub data: Bytes,
    pub mime_type: String,
}

#[derive(Clone)]
pub struct GenerationClient {
    transport: Arc<dyn ModelTransport>,
    limits: GenerationLimits,
}

impl GenerationClient {
    pub fn new(transport: Arc<dyn ModelTransport>, limits: GenerationLimits) -> Self {
        Self { transport, limits }
    }

    /// Sends the document inline (base64) with the analysis instruction.
    pub async fn analyze_resume(
        &self,
        document: &ResumeDocument,
    ) -> Result<ResumeAnalysis, GenerationError> {
        if document.data.is_empty() {
            return Err(GenerationError::InvalidInput(
                "resume document is empty".to_string(),
            ));
        }
        info!(
            "analyze_resume: {} bytes of {}",
            document.data.len(),
            document.mime_type
        );

        let contents = vec![Content {
            role: Role::User,
            parts: vec![
                Part::InlineData(Blob {
                    mime_type: document.mime_type.clone(),
                    data: STANDARD.encode(&document.data),
                }),
                Part::Text(prompts::resume_analysis_prompt()),
            ],
        }];
        self.execute("analyze_resume", contents, None).await
    }

    /// Compares a resume against a job description.
    ///
    /// Both texts are cut to `limits.match_text_chars` before submission.
    pub async fn match_jd(
        &self,
        resume_text: &str,
        jd_text: &str,
    ) -> Result<JdMatchResult, GenerationError> {
        let limit = self.limits.match_text_chars;
        let resume = truncate_chars(resume_text, limit);
        let jd = truncate_chars(jd_text, limit);
        if resume.len() < resume_text.len() || jd.len() < jd_text.len() {
            info!("match_jd: input truncated to {limit} chars");
        }

        let prompt = prompts::jd_match_prompt(resume, jd);
        self.execute("match_jd", vec![Content::user_text(prompt)], None)
            .await
    }

    /// Questions come back in model order. The 8 technical / 4 behavioral split is
    /// only asked for; a list of any length is accepted.
    pub async fn generate_questions(
        &self,
        role: &str,
        jd_snippet: Option<&str>,
    ) -> Result<Vec<InterviewQuestion>, GenerationError> {
        let role = role.trim();
        if role.is_empty() {
            return Err(GenerationError::InvalidInput(
                "role cannot be empty".to_string(),
            ));
        }
        let snippet = jd_snippet
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| truncate_chars(s, self.limits.jd_snippet_chars));

        let prompt = prompts::questions_prompt(role, snippet);
        self.execute("generate_questions", vec![Content::user_text(prompt)], None)
            .await
    }

    /// A blank or absent topic asks the model to pick a trending one.
    pub async fn generate_gd_topic(&self, topic: Option<&str>) -> Result<GdTopic, GenerationError> {
        let topic = topic.map(str::trim).filter(|t| !t.is_empty());
        let prompt = prompts::gd_topic_prompt(topic);
        self.execute("generate_gd_topic", vec![Content::user_text(prompt)], None)
            .await
    }

    /// Evaluates `last_answer` in the context of `history` and asks the next question.
    ///
    /// `history` is only read. Appending the user turn and the resulting model
    /// turn is the caller's job (see `InterviewSession`).
    pub async fn get_interview_feedback(
        &self,
        history: &[ChatTurn],
        last_answer: &str,
    ) -> Result<InterviewFeedback, GenerationError> {
        if last_answer.trim().is_empty() {
            return Err(GenerationError::InvalidInput(
                "answer cannot be empty".to_string(),
            ));
        }
        let window = match self.limits.max_history_turns {
            Some(cap) if history.len() > cap => {
                info!(
                    "get_interview_feedback: submitting last {cap} of {} turns",
                    history.len()
                );
                &history[history.len() - cap..]
            }
            _ => history,
        };

        let contents = window
            .iter()
            .map(|turn| Content {
                role: turn.role,
                parts: vec![Part::Text(turn.text.clone())],
            })
            .chain(std::iter::once(Content::user_text(last_answer)))
            .collect();

        self.execute(
            "get_interview_feedback",
            contents,
            Some(prompts::INTERVIEWER_SYSTEM),
        )
        .await
    }

    async fn execute<T: StructuredOutput>(
        &self,
        operation: &'static str,
        contents: Vec<Content>,
        system_instruction: Option<&str>,
    ) -> Result<T, GenerationError> {
        let schema = T::response_schema();
        info!("{operation}: {} content block(s)", contents.len());
        let request = GenerationRequest {
            contents,
            system_instruction: system_instruction.map(str::to_string),
            response_schema: schema.to_value(),
        };

        let result = self
            .transport
            .generate(&request)
            .await
            .and_then(|text| parse_structured::<T>(&text));

        if let Err(e) = &result {
            warn!("{operation} failed: {e}");
        }
        result
    }
}

/// Longest prefix of `text` holding at most `limit` characters.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Parses model output into `T`, enforcing `T`'s response schema first.
pub(crate) fn parse_structured<T: StructuredOutput>(text: &str) -> Result<T, GenerationError> {
    let text = strip_json_fences(text);
    if text.is_empty() {
        return Err(GenerationError::ResponseParse(
            "model returned no text".to_string(),
        ));
    }
    let mut value: Value = serde_json::from_str(text)
        .map_err(|e| GenerationError::ResponseParse(format!("invalid JSON: {e}")))?;
    if value.is_null() {
        return Err(GenerationError::ResponseParse(
            "model returned null".to_string(),
        ));
    }

    enforce(&mut value, &T::response_schema())?;

    serde_json::from_value(value).map_err(|e| GenerationError::SchemaViolation {
        path: "$".to_string(),
        reason: e.to_string(),
    })
}
