//! Primary reply generation.
//!
//! Builds a therapeutic context from the fused analysis, renders it into a
//! prompt and asks the primary model for a reply. Any failure hands the turn
//! to the fallback responder; there is no retry.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, instrument};

use crate::actors::messages::{AppError, ModelRequest};
use crate::actors::traits::LlmActor;
use crate::brain::{
    CulturalContext, FallbackResponder, FusedAnalysis, GeneratedResponse, ResponseOrigin,
    SafetyAssessment,
};

/// Cultural persona for every primary generation call.
pub const CULTURAL_CONTEXT_PROMPT: &str = "You are a virtual therapist speaking in the Omani Arabic dialect.
Your role is to listen with empathy and calmness, and reply with short, clear
voice-friendly responses that make the user feel safe and supported.

Core guidelines:
- Always reply in natural Omani Arabic conversational style.
- Focus more on listening and understanding than giving orders or ready-made solutions.
- Use simple, everyday words and avoid heavy clinical terms.
- Show respect for Islamic values, family dynamics, and cultural norms.
- If the user shows signs of serious crisis (e.g., thoughts of self-harm), stop normal
  conversation, respond with a safe supportive message, and direct them to seek
  immediate professional help.
- If the user mixes Arabic and English, respond in the same way while keeping the
  main tone in Omani Arabic.";

const COUNSELOR_INSTRUCTION: &str = "You are a mental health counselor specializing in Omani Arabic dialect. \
Respond empathetically, using culturally sensitive therapeutic language. \
Always reply in Arabic unless the user specifically requests English.";

const THERAPEUTIC_GOALS: &[&str] = &[
    "Provide empathetic support",
    "Offer culturally appropriate guidance",
    "Maintain therapeutic boundaries",
    "Ensure user safety",
];

/// Generation parameters for the primary model.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub response_confidence: f32,
    pub call_timeout: Duration,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_output_tokens: 800,
            temperature: 0.7,
            response_confidence: 0.85,
            call_timeout: Duration::from_secs(20),
        }
    }
}

/// Everything the primary model is told about the turn.
#[derive(Debug, Clone, Serialize)]
pub struct TherapeuticContext<'a> {
    pub user_input: &'a str,
    pub emotional_state: &'a str,
    pub intent: &'a str,
    pub cultural_context: &'a CulturalContext,
    pub session_id: &'a str,
    pub turn_number: u32,
    pub is_crisis: bool,
    pub therapeutic_goals: &'static [&'static str],
}

impl<'a> TherapeuticContext<'a> {
    pub fn new(
        transcript: &'a str,
        analysis: &'a FusedAnalysis,
        session_id: &'a str,
        turn_number: u32,
    ) -> Self {
        Self {
            user_input: transcript,
            emotional_state: &analysis.emotional_state,
            intent: &analysis.intent,
            cultural_context: &analysis.cultural_context,
            session_id,
            turn_number,
            is_crisis: analysis.is_crisis,
            therapeutic_goals: THERAPEUTIC_GOALS,
        }
    }

    pub fn render_prompt(&self) -> String {
        let goals = self
            .therapeutic_goals
            .iter()
            .map(|g| format!("- {}", g))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "User Input (Omani Arabic): {user_input}

Emotional State: {emotional_state}
Intent: {intent}
Cultural Context: religious={religious}, family={family}, social={social}
Turn Number: {turn}
Crisis Session: {is_crisis}

Therapeutic Goals:
{goals}

Please provide a therapeutic response that:
1. Is empathetic and supportive
2. Uses appropriate Omani Arabic dialect
3. Incorporates Islamic values when relevant
4. Respects cultural norms and family dynamics
5. Uses proper mental health terminology in Arabic
6. Maintains therapeutic boundaries
7. Ensures user safety

Respond in Arabic unless the user specifically requests English.
Keep response concise but meaningful (2-3 sentences).",
            user_input = self.user_input,
            emotional_state = self.emotional_state,
            intent = self.intent,
            religious = self.cultural_context.religious,
            family = self.cultural_context.family,
            social = self.cultural_context.social,
            turn = self.turn_number,
            is_crisis = self.is_crisis,
            goals = goals,
        )
    }
}

/// The persona system instruction sent with every generation call.
pub fn system_instruction() -> String {
    format!("{}\n\n{}", CULTURAL_CONTEXT_PROMPT, COUNSELOR_INSTRUCTION)
}

pub struct ResponseGenerator {
    llm: Arc<dyn LlmActor>,
    params: GenerationParams,
    fallback: FallbackResponder,
}

impl ResponseGenerator {
    pub fn new(llm: Arc<dyn LlmActor>, params: GenerationParams, fallback: FallbackResponder) -> Self {
        Self {
            llm,
            params,
            fallback,
        }
    }

    pub fn model_id(&self) -> &str {
        self.llm.model_id()
    }

    /// Generate the primary reply. Never fails: a fallback reply comes back
    /// instead of an error.
    #[instrument(skip(self, transcript, analysis), fields(model = %self.llm.model_id()))]
    pub async fn generate(
        &self,
        transcript: &str,
        analysis: &FusedAnalysis,
        session_id: &str,
        turn_number: u32,
    ) -> GeneratedResponse {
        let context = TherapeuticContext::new(transcript, analysis, session_id, turn_number);

        match self.try_generate(&context).await {
            Ok(text) => {
                info!(chars = text.chars().count(), "Primary reply generated");
                GeneratedResponse {
                    text,
                    model_used: self.llm.model_id().to_string(),
                    origin: ResponseOrigin::Model,
                    confidence: self.params.response_confidence,
                    cultural_adaptations: Default::default(),
                    therapeutic_techniques: vec![
                        "active_listening".to_string(),
                        "empathetic_response".to_string(),
                    ],
                    safety_assessment: SafetyAssessment::from(&analysis.crisis_assessment),
                }
            }
            Err(e) => {
                error!("AI response generation error: {}", e);
                self.fallback_for(analysis)
            }
        }
    }

    /// Fallback reply for a turn. Crisis turns always get the crisis entry.
    pub fn fallback_for(&self, analysis: &FusedAnalysis) -> GeneratedResponse {
        let key = if analysis.is_crisis {
            "crisis"
        } else {
            analysis.emotional_state.as_str()
        };
        self.fallback.respond(key)
    }

    async fn try_generate(&self, context: &TherapeuticContext<'_>) -> Result<String, AppError> {
        let request = ModelRequest::new(system_instruction(), context.render_prompt())
            .max_output_tokens(self.params.max_output_tokens)
            .temperature(self.params.temperature);

        let raw = timeout(self.params.call_timeout, self.llm.complete(request)).await??;
        let text = raw.trim();
        if text.is_empty() {
            return Err(AppError::MalformedResponse(
                "Primary model returned an empty reply".to_string(),
            ));
        }
        Ok(text.to_string())
    }
}
