//! Hybrid crisis detection and therapeutic response pipeline for an Omani
//! Arabic mental-health voice assistant.
//!
//! A turn runs a deterministic crisis matcher alongside a model analysis,
//! fuses them safety-first, generates a reply, has it reviewed by a second
//! model and tags its cultural adaptations. See [`TherapySupervisor`].

pub mod actors;
pub mod brain;
pub mod config;
pub mod error;
pub mod models;
pub mod telemetry;

pub use actors::supervisor::{PipelineActors, PipelineOptions, TherapySupervisor};
pub use config::Settings;
pub use error::AppError;
pub use models::{SafetyIncident, TurnOutcome, TurnRequest};

#[cfg(test)]
mod tests;
