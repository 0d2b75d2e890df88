//! # Actors Module
//!
//! Components that depend on external models. Each model role sits behind an
//! [`traits::LlmActor`]; the supervisor wires them into a turn.
//!
//! ## Components
//! - `llm`: actor handle and runner for the HTTP model backends
//! - `analyzer`: emotional / intent / cultural analysis
//! - `generator`: primary reply generation
//! - `reviewer`: independent safety review
//! - `supervisor`: per-turn orchestration

pub mod analyzer;
pub mod generator;
pub mod llm;
pub mod messages;
pub mod reviewer;
pub mod supervisor;
pub mod traits;
