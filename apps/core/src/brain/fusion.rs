//! Safety-first fusion of the rule-based and model-based analyses.
//!
//! The deterministic channel can only escalate: when it reports high or
//! critical risk its crisis assessment replaces the model's, whatever the
//! model said.

use chrono::{DateTime, Utc};
use tracing::warn;

use super::assessment::{FusedAnalysis, LlmAssessment, RuleAssessment};

/// Fuse the two analyses, stamped with the current time.
pub fn fuse(rule: &RuleAssessment, llm: LlmAssessment) -> FusedAnalysis {
    fuse_at(rule, llm, Utc::now())
}

/// Fuse the two analyses with an explicit capture time.
pub fn fuse_at(rule: &RuleAssessment, llm: LlmAssessment, timestamp: DateTime<Utc>) -> FusedAnalysis {
    let rule_is_crisis = rule.risk_level().is_crisis();

    let (crisis_assessment, is_crisis) = if rule_is_crisis {
        if llm.crisis_assessment.risk_level < rule.risk_level() {
            warn!(
                rule = %rule.risk_level(),
                model = %llm.crisis_assessment.risk_level,
                "Model under-rated crisis risk; rule-based assessment takes precedence"
            );
        }
        (rule.crisis_assessment.clone(), true)
    } else {
        let is_crisis = llm.crisis_assessment.risk_level.is_crisis();
        (llm.crisis_assessment, is_crisis)
    };

    FusedAnalysis {
        emotional_state: llm.emotional_state,
        intent: llm.intent,
        crisis_assessment,
        recommended_technique: llm.recommended_technique,
        cultural_context: llm.cultural_context,
        confidence: llm.confidence,
        rule_confidence: rule.confidence,
        source: llm.source,
        is_crisis,
        overridden_by_rules: rule_is_crisis,
        timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::assessment::{AnalysisSource, CrisisAssessment, CrisisCategory, RiskLevel};
    use crate::brain::crisis::CrisisPatternMatcher;

    fn llm_with_risk(risk_level: RiskLevel) -> LlmAssessment {
        LlmAssessment {
            emotional_state: "sadness".to_string(),
            intent: "seeking_support".to_string(),
            crisis_assessment: CrisisAssessment {
                risk_level,
                requires_intervention: risk_level.is_crisis(),
                ..CrisisAssessment::default()
            },
            recommended_technique: "validation".to_string(),
            cultural_context: Default::default(),
            confidence: 0.8,
            source: AnalysisSource::Llm,
        }
    }

    #[test]
    fn test_rule_critical_overrides_model_low() {
        let rule = CrisisPatternMatcher::default().assess("أريد أن أموت");
        let fused = fuse(&rule, llm_with_risk(RiskLevel::Low));

        assert!(fused.is_crisis);
        assert!(fused.overridden_by_rules);
        assert_eq!(fused.crisis_assessment, rule.crisis_assessment);
        assert_eq!(fused.crisis_assessment.risk_level, RiskLevel::Critical);
        // Non-crisis fields still come from the model.
        assert_eq!(fused.emotional_state, "sadness");
        assert_eq!(fused.recommended_technique, "validation");
    }

    #[test]
    fn test_rule_assessment_wins_even_over_higher_model_fields() {
        let rule = CrisisPatternMatcher::default().assess("لا أمل");
        assert_eq!(rule.risk_level(), RiskLevel::High);

        let fused = fuse(&rule, llm_with_risk(RiskLevel::Critical));
        assert_eq!(fused.crisis_assessment.risk_level, RiskLevel::High);
        assert!(fused
            .crisis_assessment
            .indicators
            .contains(&CrisisCategory::Hopelessness));
        assert!(fused.is_crisis);
    }

    #[test]
    fn test_model_decides_when_rules_are_quiet() {
        let rule = CrisisPatternMatcher::default().assess("يومي كان طويلا");

        let fused = fuse(&rule, llm_with_risk(RiskLevel::High));
        assert!(fused.is_crisis);
        assert!(!fused.overridden_by_rules);
        assert_eq!(fused.crisis_assessment.risk_level, RiskLevel::High);

        let fused = fuse(&rule, llm_with_risk(RiskLevel::Medium));
        assert!(!fused.is_crisis);
        assert_eq!(fused.crisis_assessment.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn test_fusion_uses_given_timestamp() {
        let rule = CrisisPatternMatcher::default().assess("hello");
        let at = Utc::now() - chrono::Duration::minutes(5);
        let fused = fuse_at(&rule, LlmAssessment::safe_default(), at);
        assert_eq!(fused.timestamp, at);
        assert_eq!(fused.rule_confidence, 0.3);
    }
}
