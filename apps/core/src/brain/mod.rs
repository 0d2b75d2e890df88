//! # Brain Module
//!
//! Deterministic, I/O-free half of the pipeline. Runs before and around the
//! model calls and keeps working when every model is down.
//!
//! ## Components
//! - `assessment`: types shared by every stage of a turn
//! - `crisis`: rule-based crisis detection (regex)
//! - `fusion`: safety-first merge of rule and model analyses
//! - `cultural`: cultural adaptation tagging of final replies
//! - `fallback`: canned safe replies

pub mod assessment;
pub mod crisis;
pub mod cultural;
pub mod fallback;
pub mod fusion;

pub use assessment::{
    AnalysisSource, CrisisAssessment, CrisisCategory, CulturalAdaptation, CulturalContext,
    CulturalSignal, FusedAnalysis, GeneratedResponse, LlmAssessment, ResponseOrigin, RiskLevel,
    RuleAssessment, SafetyAssessment,
};
pub use crisis::CrisisPatternMatcher;
pub use cultural::CulturalAdaptationTagger;
pub use fallback::{FallbackCatalog, FallbackResponder};
pub use fusion::{fuse, fuse_at};
