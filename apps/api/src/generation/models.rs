//! Result records returned by the generation operations.
//!
//! Each record is produced whole from one model response. Field names on the
//! wire are camelCase, matching what the front-end renders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::generation::schema::{Schema, StructuredOutput};
use crate::llm_client::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeAnalysis {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub skills: Vec<String>,
    /// Completeness and formatting score, 0–100.
    pub score: u32,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub missing_keywords: Vec<String>,
    pub improvements: Vec<String>,
    #[serde(default)]
    pub education: Vec<String>,
    #[serde(default)]
    pub experience: Vec<String>,
}

impl StructuredOutput for ResumeAnalysis {
    fn response_schema() -> Schema {
        Schema::object()
            .required_property("name", Schema::string())
            .property("email", Schema::string())
            .required_property("skills", Schema::string_list())
            .required_property(
                "score",
                Schema::integer()
                    .range(0.0, 100.0)
                    .describe("A score from 0 to 100 based on resume completeness and formatting"),
            )
            .property("summary", Schema::string())
            .property("missingKeywords", Schema::string_list())
            .required_property("improvements", Schema::string_list())
            .property("education", Schema::string_list())
            .property("experience", Schema::string_list())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JdMatchResult {
    pub match_percentage: u32,
    pub ats_score: u32,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    #[serde(default)]
    pub recruiter_feedback: String,
}

impl StructuredOutput for JdMatchResult {
    fn response_schema() -> Schema {
        Schema::object()
            .required_property("matchPercentage", Schema::integer().range(0.0, 100.0))
            .required_property("matchedSkills", Schema::string_list())
            .required_property("missingSkills", Schema::string_list())
            .property("recruiterFeedback", Schema::string())
            .required_property(
                "atsScore",
                Schema::integer()
                    .at_least(0.0)
                    .describe("Estimated ATS score based on keyword matching"),
            )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Technical,
    Behavioral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewQuestion {
    pub id: i64,
    pub question: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub follow_up: Vec<String>,
}

impl StructuredOutput for InterviewQuestion {
    fn response_schema() -> Schema {
        Schema::object()
            .required_property("id", Schema::integer())
            .required_property("question", Schema::string())
            .required_property("type", Schema::enumeration(&["technical", "behavioral"]))
            .required_property("difficulty", Schema::enumeration(&["easy", "medium", "hard"]))
            .property("followUp", Schema::string_list())
    }
}

/// Group-discussion preparation guide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GdTopic {
    pub topic: String,
    pub opening_lines: Vec<String>,
    pub points: Vec<String>,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    #[serde(default)]
    pub conclusions: Vec<String>,
}

impl StructuredOutput for GdTopic {
    fn response_schema() -> Schema {
        Schema::object()
            .required_property("topic", Schema::string())
            .required_property("openingLines", Schema::string_list())
            .required_property("points", Schema::string_list())
            .required_property("pros", Schema::string_list())
            .required_property("cons", Schema::string_list())
            .property(
                "conclusions",
                Schema::string_list()
                    .describe("Strategies or lines to effectively conclude the discussion."),
            )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewFeedback {
    pub feedback: String,
    pub next_question: String,
}

impl StructuredOutput for InterviewFeedback {
    fn response_schema() -> Schema {
        Schema::object()
            .required_property(
                "feedback",
                Schema::string().describe("Critique of the candidate's last answer."),
            )
            .required_property(
                "nextQuestion",
                Schema::string().describe("The next interview question."),
            )
    }
}

/// One message of the mock-interview conversation. Owned by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
    /// Critique of the preceding user answer; only set on model turns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChatTurn {
    fn new(role: Role, text: impl Into<String>, feedback: Option<String>) -> Self {
        Self {
            role,
            text: text.into(),
            feedback,
            id: Some(Uuid::new_v4().to_string()),
            timestamp: Some(Utc::now()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text, None)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, text, None)
    }

    /// The model turn that records a feedback response: its text is the next question.
    pub fn from_feedback(response: InterviewFeedback) -> Self {
        Self::new(Role::Model, response.next_question, Some(response.feedback))
    }
}
