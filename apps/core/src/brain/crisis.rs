//! Crisis detection using regex patterns.
//!
//! Deterministic, synchronous scan of a transcript against a table of crisis
//! categories. No model, no I/O. This is the backstop for crisis detection
//! when every external service is down.

use regex::{Regex, RegexBuilder};
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::debug;

use super::assessment::{AnalysisSource, CrisisAssessment, CrisisCategory, RiskLevel, RuleAssessment};
use crate::config::PipelineTuning;
use crate::error::AppError;

/// Built-in pattern table: Omani/Gulf Arabic phrases plus the English crisis
/// keywords. Order within a category is preserved.
pub const DEFAULT_PATTERNS: &[(&str, &[&str])] = &[
    (
        "suicide_ideation",
        &[
            r"أريد أن أموت",
            r"قتل نفسي",
            r"انتحار",
            r"لا أستطيع العيش",
            r"أفضل الموت",
            r"لا فائدة من الحياة",
            r"أريد إنهاء حياتي",
            r"\bsuicid(e|al)\b",
            r"\bkill myself\b",
            r"\bwant to die\b",
            r"\bcan['’]?t live\b",
        ],
    ),
    (
        "self_harm",
        &[r"أجرح نفسي", r"أؤذي نفسي", r"أقطع نفسي", r"أحرق نفسي"],
    ),
    (
        "hopelessness",
        &[r"لا أمل", r"لا فائدة", r"مستحيل", r"لا أرى مخرج", r"ضائع"],
    ),
];

// NOTE: expect() is acceptable here: the built-in table is a compile-time
// constant and is covered by tests.
static DEFAULT_CATEGORIES: LazyLock<Vec<CategoryPatterns>> = LazyLock::new(|| {
    compile_table(DEFAULT_PATTERNS.iter().map(|(category, patterns)| {
        (
            CrisisCategory::from(*category),
            patterns.iter().map(|p| p.to_string()).collect(),
        )
    }))
    .expect("Invalid regex: built-in crisis pattern table")
});

/// Compiled patterns for one category.
#[derive(Clone)]
struct CategoryPatterns {
    category: CrisisCategory,
    patterns: Vec<Regex>,
}

/// Rule-based crisis scanner.
#[derive(Clone)]
pub struct CrisisPatternMatcher {
    categories: Vec<CategoryPatterns>,
    indicator_confidence: f32,
    baseline_confidence: f32,
}

impl Default for CrisisPatternMatcher {
    fn default() -> Self {
        let tuning = PipelineTuning::default();
        Self {
            categories: DEFAULT_CATEGORIES.clone(),
            indicator_confidence: tuning.rule_indicator_confidence,
            baseline_confidence: tuning.rule_baseline_confidence,
        }
    }
}

impl CrisisPatternMatcher {
    /// Built-in table with the confidence constants from `tuning`.
    pub fn new(tuning: &PipelineTuning) -> Self {
        Self {
            categories: DEFAULT_CATEGORIES.clone(),
            indicator_confidence: tuning.rule_indicator_confidence,
            baseline_confidence: tuning.rule_baseline_confidence,
        }
    }

    /// Custom table. Every problem with the table (bad regex, empty pattern,
    /// empty or duplicated category) is reported here, once, as a `Config`
    /// error.
    pub fn with_table<I>(table: I, tuning: &PipelineTuning) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = (CrisisCategory, Vec<String>)>,
    {
        Ok(Self {
            categories: compile_table(table)?,
            indicator_confidence: tuning.rule_indicator_confidence,
            baseline_confidence: tuning.rule_baseline_confidence,
        })
    }

    /// Categories in evaluation order.
    pub fn categories(&self) -> impl Iterator<Item = &CrisisCategory> {
        self.categories.iter().map(|c| &c.category)
    }

    /// Scan a transcript. Total: never fails, never blocks.
    pub fn assess(&self, transcript: &str) -> RuleAssessment {
        let indicators: BTreeSet<CrisisCategory> = self
            .categories
            .iter()
            .filter(|group| group.patterns.iter().any(|p| p.is_match(transcript)))
            .map(|group| group.category.clone())
            .collect();

        let risk_level = derive_risk(&indicators);
        if !indicators.is_empty() {
            debug!(?indicators, %risk_level, "Crisis patterns matched");
        }

        let confidence = if indicators.is_empty() {
            self.baseline_confidence
        } else {
            self.indicator_confidence
        };

        RuleAssessment {
            crisis_assessment: CrisisAssessment {
                risk_level,
                indicators,
                requires_intervention: risk_level.is_crisis(),
                escalation_required: risk_level == RiskLevel::Critical,
            },
            confidence,
            source: AnalysisSource::RuleBased,
        }
    }
}

/// Strict priority ladder over the categories that were hit.
fn derive_risk(indicators: &BTreeSet<CrisisCategory>) -> RiskLevel {
    if indicators.contains(&CrisisCategory::SuicideIdeation)
        || indicators.contains(&CrisisCategory::SelfHarm)
    {
        RiskLevel::Critical
    } else if indicators.contains(&CrisisCategory::Hopelessness) {
        RiskLevel::High
    } else if !indicators.is_empty() {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

fn compile_table<I>(table: I) -> Result<Vec<CategoryPatterns>, AppError>
where
    I: IntoIterator<Item = (CrisisCategory, Vec<String>)>,
{
    let mut compiled: Vec<CategoryPatterns> = Vec::new();

    for (category, patterns) in table {
        if category.label().trim().is_empty() {
            return Err(AppError::Config("Crisis category name is empty".to_string()));
        }
        if compiled.iter().any(|c| c.category == category) {
            return Err(AppError::Config(format!(
                "Crisis category '{}' is defined twice",
                category
            )));
        }

        let mut regexes = Vec::with_capacity(patterns.len());
        for pattern in &patterns {
            // An empty pattern matches every transcript.
            if pattern.trim().is_empty() {
                return Err(AppError::Config(format!(
                    "Empty pattern in crisis category '{}'",
                    category
                )));
            }
            let regex = RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| {
                    AppError::Config(format!(
                        "Invalid pattern '{}' in crisis category '{}': {}",
                        pattern, category, e
                    ))
                })?;
            regexes.push(regex);
        }

        compiled.push(CategoryPatterns {
            category,
            patterns: regexes,
        });
    }

    Ok(compiled)
}
