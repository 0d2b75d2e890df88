use serde::Serialize;
use tokio::sync::oneshot;

/// Defines errors that can occur while talking to an external model.
#[derive(Debug, thiserror::Error, Serialize, Clone)]
pub enum ActorError {
    /// The request never produced an HTTP response (DNS, connect, reset...).
    #[error("Transport failure: {0}")]
    Transport(String),
    /// The model service answered with a non-success status.
    #[error("Model request failed: {0}")]
    Status(String),
    /// The actor has been shut down or its runner task is gone.
    #[error("Model actor unavailable: {0}")]
    Unavailable(String),
    /// A generic internal error within an actor.
    #[error("Internal system error: {0}")]
    Internal(String),
}

// Re-export AppError for convenience
pub use crate::error::AppError;

/// One call to a generative model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelRequest {
    pub system_instruction: String,
    pub prompt: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    /// Ask the backend for a JSON-only reply when it supports it.
    pub json_output: bool,
}

impl ModelRequest {
    pub fn new(system_instruction: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            prompt: prompt.into(),
            max_output_tokens: 800,
            temperature: 0.7,
            json_output: false,
        }
    }

    pub fn max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn json_output(mut self) -> Self {
        self.json_output = true;
        self
    }
}

/// Messages that can be sent to the `LlmActor` runner.
#[derive(Debug)]
pub enum LlmMessage {
    /// A request to generate a complete text response.
    Complete {
        request: ModelRequest,
        /// A channel to send the final `String` result back.
        responder: oneshot::Sender<Result<String, AppError>>,
    },
    /// Stop accepting requests. The responder fires once the runner loop exits.
    Shutdown { responder: oneshot::Sender<()> },
}
