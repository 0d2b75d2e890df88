//! Test Module
//!
//! Cross-module test suites for the therapy pipeline.
//!
//! ## Test Categories
//! - `brain_tests`: crisis matching, fusion, tagging and fallback together
//! - `actor_tests`: analyzer, generator and reviewer against mock models
//! - `supervisor_tests`: per-turn orchestration and review-failure policy
//! - `chaos_test`: outages, slow models and shutdown
//! - `integration_tests`: full turns against mocked HTTP backends

pub mod chaos_test;
