//! Independent safety review of the primary reply.
//!
//! A second model reads the user input and the candidate reply and either
//! approves it or supplies a complete replacement. It never returns a partial
//! edit.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, instrument};

use crate::actors::messages::{AppError, ModelRequest};
use crate::actors::traits::LlmActor;

const APPROVAL_TOKEN: &str = "APPROVED";

const REVIEW_INSTRUCTION: &str = "You are a clinical safety reviewer for an Omani Arabic mental health assistant.";

/// Outcome of a safety review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", content = "text", rename_all = "snake_case")]
pub enum SafetyVerdict {
    /// The primary reply is delivered unchanged.
    Approved,
    /// The reviewer's text is delivered instead, verbatim.
    Replace(String),
}

/// Reads the reviewer's raw output.
///
/// Output starting with `APPROVED` (any case, after leading whitespace)
/// approves; anything else is the replacement text as-is.
pub fn parse_verdict(raw: &str) -> SafetyVerdict {
    let head = raw.trim_start();
    let approved = head
        .get(..APPROVAL_TOKEN.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(APPROVAL_TOKEN));

    if approved {
        SafetyVerdict::Approved
    } else {
        SafetyVerdict::Replace(raw.to_string())
    }
}

pub fn review_prompt(transcript: &str, primary: &str) -> String {
    format!(
        "Review this therapeutic response for Omani Arabic cultural appropriateness:

User Input: {transcript}
AI Response: {primary}

Check for:
1. Empathy and supportiveness
2. Correct use of Omani Arabic dialect
3. Cultural and religious sensitivity
4. Safety: no harmful advice, crisis situations directed to professional help

If the response is appropriate, reply with exactly: APPROVED
Otherwise reply with only the corrected response text, nothing else."
    )
}

pub struct SafetyReviewer {
    llm: Arc<dyn LlmActor>,
    call_timeout: Duration,
    max_output_tokens: u32,
    temperature: f32,
}

impl SafetyReviewer {
    pub fn new(llm: Arc<dyn LlmActor>, call_timeout: Duration) -> Self {
        Self {
            llm,
            call_timeout,
            max_output_tokens: 800,
            temperature: 0.2,
        }
    }

    pub fn with_sampling(mut self, max_output_tokens: u32, temperature: f32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self.temperature = temperature;
        self
    }

    pub fn model_id(&self) -> &str {
        self.llm.model_id()
    }

    /// Review `primary` against `transcript`.
    ///
    /// Call failures, timeouts and empty output are errors; the caller applies
    /// its review-failure policy.
    #[instrument(skip_all, fields(model = %self.llm.model_id()))]
    pub async fn review(&self, transcript: &str, primary: &str) -> Result<SafetyVerdict, AppError> {
        let request = ModelRequest::new(REVIEW_INSTRUCTION, review_prompt(transcript, primary))
            .max_output_tokens(self.max_output_tokens)
            .temperature(self.temperature);

        let raw = timeout(self.call_timeout, self.llm.complete(request)).await??;
        if raw.trim().is_empty() {
            return Err(AppError::MalformedResponse(
                "Safety reviewer returned empty output".to_string(),
            ));
        }

        let verdict = parse_verdict(&raw);
        info!(
            approved = matches!(verdict, SafetyVerdict::Approved),
            "Safety review complete"
        );
        Ok(verdict)
    }
}
