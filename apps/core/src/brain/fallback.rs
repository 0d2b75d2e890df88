//! Canned replies used when generation or review cannot be trusted.
//!
//! Pure lookup. No I/O, no failure path.

use std::collections::{BTreeSet, HashMap};

use super::assessment::{CulturalAdaptation, GeneratedResponse, ResponseOrigin, SafetyAssessment};
use crate::error::AppError;

/// `model_used` value of every fallback reply.
pub const FALLBACK_MODEL: &str = "fallback";

/// Catalog key used when the emotional state is unknown.
pub const GENERAL_KEY: &str = "general";

const CRISIS_REPLY: &str =
    "أفهم أنك تمر بوقت صعب. هل يمكنك مشاركة المزيد حول ما تشعر به؟ أنا هنا لمساعدتك.";
const ANXIETY_REPLY: &str = "القلق أمر طبيعي أحياناً. دعنا نتحدث عن طرق للتعامل مع هذه المشاعر.";
const SADNESS_REPLY: &str = "أرى أنك تشعر بالحزن. هذا شعور طبيعي. هل تريد التحدث عما يزعجك؟";
const GENERAL_REPLY: &str = "شكراً لك على مشاركة مشاعرك معي. كيف يمكنني مساعدتك اليوم؟";

/// Pre-approved replies keyed by emotional state. Always has a `general` entry.
#[derive(Debug, Clone)]
pub struct FallbackCatalog {
    entries: HashMap<String, String>,
}

impl Default for FallbackCatalog {
    fn default() -> Self {
        let entries = [
            ("crisis", CRISIS_REPLY),
            ("anxiety", ANXIETY_REPLY),
            ("sadness", SADNESS_REPLY),
            (GENERAL_KEY, GENERAL_REPLY),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self { entries }
    }
}

impl FallbackCatalog {
    /// Custom catalog. Rejected unless it has a non-empty `general` entry.
    pub fn new(entries: HashMap<String, String>) -> Result<Self, AppError> {
        match entries.get(GENERAL_KEY) {
            Some(text) if !text.trim().is_empty() => Ok(Self { entries }),
            _ => Err(AppError::Config(
                "Fallback catalog needs a non-empty 'general' entry".to_string(),
            )),
        }
    }

    /// Exact-match lookup, `general` when the label is unknown.
    pub fn reply_for(&self, emotional_state: &str) -> &str {
        self.entries
            .get(emotional_state)
            .or_else(|| self.entries.get(GENERAL_KEY))
            .map(String::as_str)
            .unwrap_or(GENERAL_REPLY)
    }
}

#[derive(Debug, Clone)]
pub struct FallbackResponder {
    catalog: FallbackCatalog,
    confidence: f32,
}

impl Default for FallbackResponder {
    fn default() -> Self {
        Self::new(FallbackCatalog::default(), 0.5)
    }
}

impl FallbackResponder {
    pub fn new(catalog: FallbackCatalog, confidence: f32) -> Self {
        Self { catalog, confidence }
    }

    pub fn respond(&self, emotional_state: &str) -> GeneratedResponse {
        GeneratedResponse {
            text: self.catalog.reply_for(emotional_state).to_string(),
            model_used: FALLBACK_MODEL.to_string(),
            origin: ResponseOrigin::Fallback,
            confidence: self.confidence,
            cultural_adaptations: BTreeSet::from([CulturalAdaptation::EmergencyFallback]),
            therapeutic_techniques: vec!["active_listening".to_string()],
            safety_assessment: SafetyAssessment::default(),
        }
    }
}
