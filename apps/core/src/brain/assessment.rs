//! Assessment types shared by every stage of a turn.
//!
//! Everything here lives for exactly one conversational turn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Crisis severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    /// High and critical are the levels that make a turn a crisis.
    pub fn is_crisis(&self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for RiskLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            "critical" => Ok(RiskLevel::Critical),
            other => Err(AppError::Validation(format!("Unrecognized risk level '{}'", other))),
        }
    }
}

/// A named class of self-harm / suicide-risk language.
///
/// The three built-in categories drive the risk ladder; any other configured
/// category only raises risk to `medium`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CrisisCategory {
    SuicideIdeation,
    SelfHarm,
    Hopelessness,
    Other(String),
}

impl CrisisCategory {
    pub fn label(&self) -> &str {
        match self {
            CrisisCategory::SuicideIdeation => "suicide_ideation",
            CrisisCategory::SelfHarm => "self_harm",
            CrisisCategory::Hopelessness => "hopelessness",
            CrisisCategory::Other(name) => name,
        }
    }
}

impl From<String> for CrisisCategory {
    fn from(value: String) -> Self {
        match value.as_str() {
            "suicide_ideation" => CrisisCategory::SuicideIdeation,
            "self_harm" => CrisisCategory::SelfHarm,
            "hopelessness" => CrisisCategory::Hopelessness,
            _ => CrisisCategory::Other(value),
        }
    }
}

impl From<&str> for CrisisCategory {
    fn from(value: &str) -> Self {
        CrisisCategory::from(value.to_string())
    }
}

impl From<CrisisCategory> for String {
    fn from(value: CrisisCategory) -> Self {
        value.label().to_string()
    }
}

impl fmt::Display for CrisisCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Which channel produced an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisSource {
    RuleBased,
    Llm,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CrisisAssessment {
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub indicators: BTreeSet<CrisisCategory>,
    #[serde(default)]
    pub requires_intervention: bool,
    #[serde(default)]
    pub escalation_required: bool,
}

impl CrisisAssessment {
    /// The no-risk assessment.
    pub fn low() -> Self {
        Self::default()
    }
}

/// Output of the deterministic pattern scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleAssessment {
    pub crisis_assessment: CrisisAssessment,
    pub confidence: f32,
    pub source: AnalysisSource,
}

impl RuleAssessment {
    pub fn risk_level(&self) -> RiskLevel {
        self.crisis_assessment.risk_level
    }
}

/// A cultural cue reported by the analyzer model. Models answer with either a
/// flag or a short note, both are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CulturalSignal {
    Flag(bool),
    Note(String),
}

impl Default for CulturalSignal {
    fn default() -> Self {
        CulturalSignal::Flag(false)
    }
}

impl CulturalSignal {
    pub fn is_present(&self) -> bool {
        match self {
            CulturalSignal::Flag(flag) => *flag,
            CulturalSignal::Note(note) => !note.trim().is_empty(),
        }
    }
}

impl fmt::Display for CulturalSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CulturalSignal::Flag(flag) => write!(f, "{}", flag),
            CulturalSignal::Note(note) => write!(f, "{}", note),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CulturalContext {
    #[serde(default)]
    pub religious: CulturalSignal,
    #[serde(default)]
    pub family: CulturalSignal,
    #[serde(default)]
    pub social: CulturalSignal,
}

/// Output of the model-based analysis, or its safe default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmAssessment {
    pub emotional_state: String,
    pub intent: String,
    pub crisis_assessment: CrisisAssessment,
    pub recommended_technique: String,
    pub cultural_context: CulturalContext,
    pub confidence: f32,
    pub source: AnalysisSource,
}

impl LlmAssessment {
    /// The fixed answer used whenever the analyzer model cannot be trusted.
    pub fn safe_default() -> Self {
        Self {
            emotional_state: "neutral".to_string(),
            intent: "general_conversation".to_string(),
            crisis_assessment: CrisisAssessment::low(),
            recommended_technique: "active_listening".to_string(),
            cultural_context: CulturalContext::default(),
            confidence: 0.0,
            source: AnalysisSource::Llm,
        }
    }
}

/// The merged analysis handed to generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedAnalysis {
    pub emotional_state: String,
    pub intent: String,
    pub crisis_assessment: CrisisAssessment,
    pub recommended_technique: String,
    pub cultural_context: CulturalContext,
    /// Confidence of the model channel.
    pub confidence: f32,
    /// Confidence of the rule channel.
    pub rule_confidence: f32,
    pub source: AnalysisSource,
    pub is_crisis: bool,
    /// True when the rule channel replaced the model's crisis assessment.
    pub overridden_by_rules: bool,
    pub timestamp: DateTime<Utc>,
}

impl FusedAnalysis {
    /// Get a summary for logging
    pub fn summary(&self) -> String {
        format!(
            "Emotion: {}, Intent: {}, Risk: {}, Crisis: {}, Rule override: {}",
            self.emotional_state,
            self.intent,
            self.crisis_assessment.risk_level,
            if self.is_crisis { "yes" } else { "no" },
            if self.overridden_by_rules { "yes" } else { "no" }
        )
    }
}

/// Audit tags describing how a reply relates to the user's culture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CulturalAdaptation {
    ReligiousSensitivity,
    FamilyContext,
    SocialNorms,
    TherapeuticTerminology,
    EmergencyFallback,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SafetyAssessment {
    pub risk_level: RiskLevel,
    pub intervention_required: bool,
}

impl From<&CrisisAssessment> for SafetyAssessment {
    fn from(crisis: &CrisisAssessment) -> Self {
        Self {
            risk_level: crisis.risk_level,
            intervention_required: crisis.requires_intervention,
        }
    }
}

/// Which path produced a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseOrigin {
    /// Written by the primary model (possibly replaced by the reviewer).
    #[default]
    Model,
    /// Taken from the pre-approved fallback catalog.
    Fallback,
}

/// The reply for one turn, whichever path produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedResponse {
    pub text: String,
    pub model_used: String,
    #[serde(default)]
    pub origin: ResponseOrigin,
    pub confidence: f32,
    pub cultural_adaptations: BTreeSet<CulturalAdaptation>,
    pub therapeutic_techniques: Vec<String>,
    pub safety_assessment: SafetyAssessment,
}

impl GeneratedResponse {
    /// True only for catalog replies, whatever `model_used` says.
    pub fn is_fallback(&self) -> bool {
        self.origin == ResponseOrigin::Fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_levels_are_ordered() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
        assert!(RiskLevel::High.is_crisis());
        assert!(!RiskLevel::Medium.is_crisis());
    }

    #[test]
    fn test_unknown_risk_label_is_validation_error() {
        assert_eq!("CRITICAL".parse::<RiskLevel>().unwrap(), RiskLevel::Critical);
        assert!(matches!(
            "severe".parse::<RiskLevel>(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_crisis_category_labels() {
        assert_eq!(CrisisCategory::from("self_harm"), CrisisCategory::SelfHarm);
        assert_eq!(
            CrisisCategory::from("isolation"),
            CrisisCategory::Other("isolation".to_string())
        );
        let json = serde_json::to_string(&CrisisCategory::SuicideIdeation).unwrap();
        assert_eq!(json, "\"suicide_ideation\"");
    }

    #[test]
    fn test_cultural_signal_accepts_flags_and_notes() {
        let ctx: CulturalContext =
            serde_json::from_str(r#"{"religious": true, "family": "mentions parents", "social": ""}"#)
                .unwrap();
        assert!(ctx.religious.is_present());
        assert!(ctx.family.is_present());
        assert!(!ctx.social.is_present());
    }

    #[test]
    fn test_safe_default() {
        let default = LlmAssessment::safe_default();
        assert_eq!(default.emotional_state, "neutral");
        assert_eq!(default.intent, "general_conversation");
        assert_eq!(default.crisis_assessment.risk_level, RiskLevel::Low);
        assert!(!default.crisis_assessment.requires_intervention);
        assert!(!default.crisis_assessment.escalation_required);
        assert_eq!(default.confidence, 0.0);
    }
}
