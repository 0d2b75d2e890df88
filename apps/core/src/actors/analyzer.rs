//! Model-based emotional / intent / cultural analysis.
//!
//! One JSON-mode request per turn. The caller always gets an assessment back:
//! any failure degrades to [`LlmAssessment::safe_default`].

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, instrument, warn};

use crate::actors::messages::{AppError, ModelRequest};
use crate::actors::traits::LlmActor;
use crate::brain::{
    AnalysisSource, CrisisAssessment, CulturalContext, CulturalSignal, LlmAssessment, RiskLevel,
};

const ANALYSIS_INSTRUCTION: &str = "You are a therapeutic AI assistant. \
Analyze the user's message and output JSON only. \
Keys: emotional_state, intent, crisis_assessment {risk_level, requires_intervention}, \
recommended_technique, cultural_context {religious, family, social}. \
risk_level must be one of: low, medium, high, critical.";

const ANALYSIS_MAX_TOKENS: u32 = 300;

/// Payload shape the analyzer model must return. Every key is required.
#[derive(Debug, Deserialize)]
struct AnalysisPayload {
    emotional_state: String,
    intent: String,
    crisis_assessment: CrisisPayload,
    recommended_technique: String,
    cultural_context: CulturalPayload,
}

#[derive(Debug, Deserialize)]
struct CrisisPayload {
    risk_level: String,
    requires_intervention: bool,
}

/// Stricter than `CulturalContext`: all three cues must be present.
#[derive(Debug, Deserialize)]
struct CulturalPayload {
    religious: CulturalSignal,
    family: CulturalSignal,
    social: CulturalSignal,
}

impl From<CulturalPayload> for CulturalContext {
    fn from(payload: CulturalPayload) -> Self {
        Self {
            religious: payload.religious,
            family: payload.family,
            social: payload.social,
        }
    }
}

pub struct LlmAnalyzer {
    llm: Arc<dyn LlmActor>,
    confidence: f32,
    call_timeout: Duration,
}

impl LlmAnalyzer {
    pub fn new(llm: Arc<dyn LlmActor>, confidence: f32, call_timeout: Duration) -> Self {
        Self {
            llm,
            confidence,
            call_timeout,
        }
    }

    /// Analyze a transcript. Never fails.
    #[instrument(skip_all, fields(model = %self.llm.model_id()))]
    pub async fn analyze(&self, transcript: &str) -> LlmAssessment {
        match self.try_analyze(transcript).await {
            Ok(assessment) => {
                info!(
                    emotional_state = %assessment.emotional_state,
                    risk = %assessment.crisis_assessment.risk_level,
                    "Model analysis complete"
                );
                assessment
            }
            Err(e) => {
                warn!("Model analysis failed, using safe default: {}", e);
                LlmAssessment::safe_default()
            }
        }
    }

    async fn try_analyze(&self, transcript: &str) -> Result<LlmAssessment, AppError> {
        let request = ModelRequest::new(ANALYSIS_INSTRUCTION, transcript)
            .temperature(0.0)
            .max_output_tokens(ANALYSIS_MAX_TOKENS)
            .json_output();

        let raw = timeout(self.call_timeout, self.llm.complete(request)).await??;
        parse_analysis(&raw, self.confidence)
    }
}

/// Validate raw model output against the analysis schema.
pub fn parse_analysis(raw: &str, confidence: f32) -> Result<LlmAssessment, AppError> {
    let payload: AnalysisPayload = serde_json::from_str(strip_code_fence(raw))?;
    let risk_level: RiskLevel = payload.crisis_assessment.risk_level.parse()?;

    if payload.emotional_state.trim().is_empty() || payload.intent.trim().is_empty() {
        return Err(AppError::MalformedResponse(
            "emotional_state and intent must not be empty".to_string(),
        ));
    }

    Ok(LlmAssessment {
        emotional_state: payload.emotional_state.trim().to_string(),
        intent: payload.intent.trim().to_string(),
        crisis_assessment: CrisisAssessment {
            risk_level,
            indicators: Default::default(),
            requires_intervention: payload.crisis_assessment.requires_intervention,
            escalation_required: risk_level == RiskLevel::Critical,
        },
        recommended_technique: payload.recommended_technique,
        cultural_context: payload.cultural_context.into(),
        confidence,
        source: AnalysisSource::Llm,
    })
}

/// Models sometimes wrap JSON in a markdown fence even in JSON mode.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "emotional_state": "anxiety",
        "intent": "seeking_support",
        "crisis_assessment": {"risk_level": "medium", "requires_intervention": false},
        "recommended_technique": "breathing_exercise",
        "cultural_context": {"religious": true, "family": false, "social": "work pressure"}
    }"#;

    #[test]
    fn test_parse_valid_payload() {
        let assessment = parse_analysis(VALID, 0.8).unwrap();

        assert_eq!(assessment.emotional_state, "anxiety");
        assert_eq!(assessment.intent, "seeking_support");
        assert_eq!(assessment.crisis_assessment.risk_level, RiskLevel::Medium);
        assert_eq!(assessment.recommended_technique, "breathing_exercise");
        assert!(assessment.cultural_context.religious.is_present());
        assert_eq!(assessment.confidence, 0.8);
        assert_eq!(assessment.source, AnalysisSource::Llm);
    }

    #[test]
    fn test_parse_fenced_payload() {
        let fenced = format!("```json\n{}\n```", VALID);
        assert!(parse_analysis(&fenced, 0.8).is_ok());
    }

    #[test]
    fn test_missing_key_is_malformed() {
        let missing = r#"{"emotional_state": "sad", "intent": "vent"}"#;
        assert!(matches!(
            parse_analysis(missing, 0.8),
            Err(AppError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_missing_cultural_key_is_malformed() {
        let empty = VALID.replace(
            r#"{"religious": true, "family": false, "social": "work pressure"}"#,
            "{}",
        );
        assert!(matches!(
            parse_analysis(&empty, 0.8),
            Err(AppError::MalformedResponse(_))
        ));

        let partial = VALID.replace(r#", "social": "work pressure""#, "");
        assert!(matches!(
            parse_analysis(&partial, 0.8),
            Err(AppError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_unknown_risk_label_is_validation_error() {
        let payload = VALID.replace("\"medium\"", "\"extreme\"");
        assert!(matches!(
            parse_analysis(&payload, 0.8),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_non_json_is_malformed() {
        assert!(matches!(
            parse_analysis("I think the user is sad.", 0.8),
            Err(AppError::MalformedResponse(_))
        ));
    }
}
