use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::actors::reviewer::SafetyVerdict;
use crate::brain::{FusedAnalysis, GeneratedResponse, RiskLevel};

/// One user turn entering the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TurnRequest {
    /// The transcribed user utterance.
    #[validate(length(min = 1))]
    pub transcript: String,
    /// Identifier of the conversation this turn belongs to.
    #[validate(length(min = 1))]
    pub session_id: String,
    /// 1-based position of the turn within the session.
    #[validate(range(min = 1))]
    pub turn_number: u32,
}

impl TurnRequest {
    pub fn new(transcript: impl Into<String>, session_id: impl Into<String>, turn_number: u32) -> Self {
        Self {
            transcript: transcript.into(),
            session_id: session_id.into(),
            turn_number,
        }
    }
}

/// What happened to the primary reply at the safety review stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReviewOutcome {
    /// The reviewer returned a verdict.
    Reviewed { verdict: SafetyVerdict },
    /// The reply already came from the fallback catalog; no review call made.
    Skipped,
    /// The review call failed; `action` names what the failure policy did.
    Failed { error: String, action: String },
}

/// A crisis detected during a turn, ready for the persistence layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyIncident {
    pub id: Uuid,
    pub session_id: String,
    pub incident_type: String,
    pub severity_level: RiskLevel,
    pub detected_at: DateTime<Utc>,
    pub user_input: String,
    pub ai_response: String,
    pub intervention_taken: String,
    pub escalation_required: bool,
}

impl SafetyIncident {
    /// Incident for a crisis turn, `None` when the turn was not a crisis.
    pub fn from_turn(
        request: &TurnRequest,
        analysis: &FusedAnalysis,
        response: &GeneratedResponse,
    ) -> Option<Self> {
        if !analysis.is_crisis {
            return None;
        }

        let intervention_taken = if response.is_fallback() {
            "fallback_crisis_response"
        } else {
            "supportive_response_with_referral"
        };

        Some(Self {
            id: Uuid::new_v4(),
            session_id: request.session_id.clone(),
            incident_type: "crisis".to_string(),
            severity_level: analysis.crisis_assessment.risk_level,
            detected_at: analysis.timestamp,
            user_input: request.transcript.clone(),
            ai_response: response.text.clone(),
            intervention_taken: intervention_taken.to_string(),
            escalation_required: analysis.crisis_assessment.escalation_required,
        })
    }
}

/// Result of one processed turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub response: GeneratedResponse,
    pub analysis: FusedAnalysis,
    pub review: ReviewOutcome,
    pub incident: Option<SafetyIncident>,
}

/// Status of one configured model role.
#[derive(Debug, Clone, Serialize)]
pub struct ModelHealth {
    pub role: &'static str,
    pub model_id: String,
    pub available: bool,
}

/// Service health snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineHealth {
    /// `healthy` when every model handle is running, `degraded` otherwise.
    pub status: String,
    pub models: Vec<ModelHealth>,
    pub timestamp: DateTime<Utc>,
}

impl PipelineHealth {
    pub fn new(models: Vec<ModelHealth>) -> Self {
        let status = if models.iter().all(|m| m.available) {
            "healthy"
        } else {
            "degraded"
        };
        Self {
            status: status.to_string(),
            models,
            timestamp: Utc::now(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_turn_request_validation() {
        assert!(TurnRequest::new("مرحبا", "s1", 1).validate().is_ok());
        assert!(TurnRequest::new("", "s1", 1).validate().is_err());
        assert!(TurnRequest::new("hi", "", 1).validate().is_err());
        assert!(TurnRequest::new("hi", "s1", 0).validate().is_err());
    }

    #[test]
    fn test_turn_request_from_json() {
        let request: TurnRequest =
            serde_json::from_str(r#"{"transcript":"أحس بضيق","session_id":"abc","turn_number":2}"#)
                .unwrap();
        assert_eq!(request.turn_number, 2);
        assert_eq!(request.session_id, "abc");
    }

    #[test]
    fn test_health_status() {
        let up = ModelHealth {
            role: "analyzer",
            model_id: "gpt-4o-mini".to_string(),
            available: true,
        };
        let down = ModelHealth {
            role: "reviewer",
            model_id: "gemini-2.5-flash-lite".to_string(),
            available: false,
        };
        assert!(PipelineHealth::new(vec![up.clone()]).is_healthy());
        assert_eq!(PipelineHealth::new(vec![up, down]).status, "degraded");
    }
}
