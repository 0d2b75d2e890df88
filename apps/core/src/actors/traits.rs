use crate::actors::messages::{AppError, ModelRequest};
use async_trait::async_trait;

/// Defines the public interface for a generative model actor.
///
/// The analyzer, the primary generator and the safety reviewer each hold one
/// of these, so any backend (remote API, local server, test double) can stand
/// behind any role.
#[async_trait]
pub trait LlmActor: Send + Sync + 'static {
    /// Generates a complete text response for one request.
    async fn complete(&self, request: ModelRequest) -> Result<String, AppError>;

    /// Identifier of the model behind this actor, reported in `model_used`.
    fn model_id(&self) -> &str;

    /// Whether the actor still accepts requests.
    fn is_available(&self) -> bool {
        true
    }

    /// Stops the actor. Later calls to `complete` fail. Idempotent.
    async fn shutdown(&self) {}
}
