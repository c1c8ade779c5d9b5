#![allow(dead_code)]
//! Mock interview session: the caller-side state machine around
//! `GenerationClient::get_interview_feedback`.
//!
//! NotStarted → InProgress (start seeds the greeting) → InProgress (each
//! successful exchange appends the user turn and the model turn) → Ended.
//! The session is open-ended; only the caller ends it.

use serde::Serialize;

use crate::generation::client::GenerationClient;
use crate::generation::models::{ChatTurn, InterviewFeedback};
use crate::generation::prompts::INTERVIEW_GREETING;
use crate::llm_client::GenerationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewPhase {
    NotStarted,
    InProgress,
    Ended,
}

#[derive(Debug, Clone)]
pub struct InterviewSession {
    phase: InterviewPhase,
    history: Vec<ChatTurn>,
}

impl Default for InterviewSession {
    fn default() -> Self {
        Self::new()
    }
}

impl InterviewSession {
    pub fn new() -> Self {
        Self {
            phase: InterviewPhase::NotStarted,
            history: Vec::new(),
        }
    }

    /// Picks up a conversation the caller has been holding, e.g. one sent back
    /// over HTTP. The history is taken as submitted; nothing is seeded.
    pub fn resume(history: Vec<ChatTurn>) -> Self {
        Self {
            phase: InterviewPhase::InProgress,
            history,
        }
    }

    pub fn phase(&self) -> InterviewPhase {
        self.phase
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    pub fn into_history(self) -> Vec<ChatTurn> {
        self.history
    }

    /// Starts (or restarts) the interview with the fixed greeting as the only turn.
    pub fn start(&mut self) -> &ChatTurn {
        self.phase = InterviewPhase::InProgress;
        self.history.clear();
        self.history.push(ChatTurn::model(INTERVIEW_GREETING));
        &self.history[0]
    }

    /// Ends the interview and discards the conversation.
    pub fn end(&mut self) {
        self.phase = InterviewPhase::Ended;
        self.history.clear();
    }

    /// Appends the candidate's answer followed by the interviewer's reply.
    pub fn record_exchange(
        &mut self,
        answer: &str,
        response: InterviewFeedback,
    ) -> Result<&ChatTurn, GenerationError> {
        self.ensure_in_progress()?;
        self.history.push(ChatTurn::user(answer));
        self.history.push(ChatTurn::from_feedback(response));
        Ok(&self.history[self.history.len() - 1])
    }

    /// Submits `answer` and records the exchange on success.
    ///
    /// On failure the held history is left exactly as it was.
    pub async fn submit(
        &mut self,
        client: &GenerationClient,
        answer: &str,
    ) -> Result<&ChatTurn, GenerationError> {
        self.ensure_in_progress()?;
        let response = client.get_interview_feedback(&self.history, answer).await?;
        self.record_exchange(answer, response)
    }

    fn ensure_in_progress(&self) -> Result<(), GenerationError> {
        if self.phase != InterviewPhase::InProgress {
            return Err(GenerationError::InvalidInput(format!(
                "interview is not in progress (phase: {:?})",
                self.phase
            )));
        }
        Ok(())
    }
}
