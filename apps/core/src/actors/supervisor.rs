//! Per-turn orchestration.
//!
//! The supervisor owns one handle per model role and runs a turn through
//! detection, fusion, generation, review and tagging. Every stage below it
//! degrades on its own, so `process_turn` only fails on an invalid request.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::actors::analyzer::LlmAnalyzer;
use crate::actors::generator::{GenerationParams, ResponseGenerator};
use crate::actors::llm::LlmActorHandle;
use crate::actors::messages::AppError;
use crate::actors::reviewer::{SafetyReviewer, SafetyVerdict};
use crate::actors::traits::LlmActor;
use crate::brain::{
    fuse, CrisisPatternMatcher, CulturalAdaptationTagger, FallbackCatalog, FallbackResponder,
    FusedAnalysis, GeneratedResponse,
};
use crate::config::{PipelineTuning, ReviewFailurePolicy, Settings};
use crate::models::{ModelHealth, PipelineHealth, ReviewOutcome, SafetyIncident, TurnOutcome, TurnRequest};

/// The three model roles of the pipeline.
pub struct PipelineActors {
    pub analyzer: Arc<dyn LlmActor>,
    pub primary: Arc<dyn LlmActor>,
    pub reviewer: Arc<dyn LlmActor>,
}

/// Everything the supervisor needs besides the model actors.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub tuning: PipelineTuning,
    /// Bound on every single model call.
    pub call_timeout: Duration,
    pub review_failure_policy: ReviewFailurePolicy,
    pub primary_temperature: f32,
    pub primary_max_output_tokens: u32,
    pub reviewer_temperature: f32,
    pub reviewer_max_output_tokens: u32,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            tuning: PipelineTuning::default(),
            call_timeout: Duration::from_secs(20),
            review_failure_policy: ReviewFailurePolicy::default(),
            primary_temperature: 0.7,
            primary_max_output_tokens: 800,
            reviewer_temperature: 0.2,
            reviewer_max_output_tokens: 800,
        }
    }
}

impl From<&Settings> for PipelineOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            tuning: settings.tuning.clone(),
            call_timeout: settings.model_timeout(),
            review_failure_policy: settings.review_failure_policy,
            primary_temperature: settings.primary.temperature,
            primary_max_output_tokens: settings.primary.max_output_tokens,
            reviewer_temperature: settings.reviewer.temperature,
            reviewer_max_output_tokens: settings.reviewer.max_output_tokens,
        }
    }
}

pub struct TherapySupervisor {
    matcher: CrisisPatternMatcher,
    analyzer: LlmAnalyzer,
    generator: ResponseGenerator,
    reviewer: SafetyReviewer,
    tagger: CulturalAdaptationTagger,
    review_failure_policy: ReviewFailurePolicy,
    roles: Vec<(&'static str, Arc<dyn LlmActor>)>,
}

impl TherapySupervisor {
    /// Spawns one model actor per role from `settings`.
    ///
    /// Must be called inside a tokio runtime.
    pub fn from_settings(settings: &Settings) -> Result<Self, AppError> {
        settings
            .validate()
            .map_err(|e| AppError::Config(format!("Invalid settings: {}", e)))?;

        let timeout = settings.model_timeout();
        let actors = PipelineActors {
            analyzer: Arc::new(LlmActorHandle::new(settings.analyzer.clone(), timeout)?),
            primary: Arc::new(LlmActorHandle::new(settings.primary.clone(), timeout)?),
            reviewer: Arc::new(LlmActorHandle::new(settings.reviewer.clone(), timeout)?),
        };

        info!(
            analyzer = %settings.analyzer.model_id,
            primary = %settings.primary.model_id,
            reviewer = %settings.reviewer.model_id,
            policy = ?settings.review_failure_policy,
            "Therapy pipeline started"
        );

        Ok(Self::with_actors(actors, PipelineOptions::from(settings)))
    }

    /// Builds the pipeline around existing actors.
    pub fn with_actors(actors: PipelineActors, options: PipelineOptions) -> Self {
        let tuning = &options.tuning;
        let fallback = FallbackResponder::new(FallbackCatalog::default(), tuning.fallback_confidence);

        let generator = ResponseGenerator::new(
            Arc::clone(&actors.primary),
            GenerationParams {
                max_output_tokens: options.primary_max_output_tokens,
                temperature: options.primary_temperature,
                response_confidence: tuning.response_confidence,
                call_timeout: options.call_timeout,
            },
            fallback,
        );

        Self {
            matcher: CrisisPatternMatcher::new(tuning),
            analyzer: LlmAnalyzer::new(
                Arc::clone(&actors.analyzer),
                tuning.analyzer_confidence,
                options.call_timeout,
            ),
            generator,
            reviewer: SafetyReviewer::new(Arc::clone(&actors.reviewer), options.call_timeout)
                .with_sampling(options.reviewer_max_output_tokens, options.reviewer_temperature),
            tagger: CulturalAdaptationTagger::new(),
            review_failure_policy: options.review_failure_policy,
            roles: vec![
                ("analyzer", actors.analyzer),
                ("primary", actors.primary),
                ("reviewer", actors.reviewer),
            ],
        }
    }

    /// Replaces the built-in crisis pattern table.
    pub fn with_matcher(mut self, matcher: CrisisPatternMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    /// Runs one turn end to end.
    ///
    /// Only an invalid request is an error. Model failures degrade to the
    /// analyzer default or a fallback reply, and the crisis assessment always
    /// includes the rule-based result.
    #[instrument(skip(self, request), fields(session_id = %request.session_id, turn = request.turn_number))]
    pub async fn process_turn(&self, request: TurnRequest) -> Result<TurnOutcome, AppError> {
        request.validate()?;
        info!(chars = request.transcript.chars().count(), "Processing turn");

        let transcript = request.transcript.as_str();
        let (rule, llm) = tokio::join!(
            async { self.matcher.assess(transcript) },
            self.analyzer.analyze(transcript)
        );

        let analysis = fuse(&rule, llm);
        info!("{}", analysis.summary());

        let primary = self
            .generator
            .generate(transcript, &analysis, &request.session_id, request.turn_number)
            .await;

        let (mut response, review) = self.review(transcript, &analysis, primary).await;
        self.tagger.tag(&mut response);

        let incident = SafetyIncident::from_turn(&request, &analysis, &response);
        if let Some(incident) = &incident {
            warn!(
                incident_id = %incident.id,
                severity = %incident.severity_level,
                escalation = incident.escalation_required,
                "Crisis detected in turn"
            );
        }

        Ok(TurnOutcome {
            response,
            analysis,
            review,
            incident,
        })
    }

    async fn review(
        &self,
        transcript: &str,
        analysis: &FusedAnalysis,
        primary: GeneratedResponse,
    ) -> (GeneratedResponse, ReviewOutcome) {
        if primary.is_fallback() {
            return (primary, ReviewOutcome::Skipped);
        }

        match self.reviewer.review(transcript, &primary.text).await {
            Ok(verdict) => {
                let mut response = primary;
                response.model_used = format!("{}+{}", response.model_used, self.reviewer.model_id());
                if let SafetyVerdict::Replace(text) = &verdict {
                    info!("Safety reviewer replaced the primary reply");
                    response.text = text.clone();
                }
                (response, ReviewOutcome::Reviewed { verdict })
            }
            Err(e) => match self.review_failure_policy {
                ReviewFailurePolicy::Fallback => {
                    warn!("Safety review failed, answering from fallback catalog: {}", e);
                    (
                        self.generator.fallback_for(analysis),
                        ReviewOutcome::Failed {
                            error: e.to_string(),
                            action: "fallback".to_string(),
                        },
                    )
                }
                ReviewFailurePolicy::KeepPrimary => {
                    warn!("Safety review failed, delivering unreviewed reply: {}", e);
                    (
                        primary,
                        ReviewOutcome::Failed {
                            error: e.to_string(),
                            action: "keep_primary".to_string(),
                        },
                    )
                }
            },
        }
    }

    pub fn health(&self) -> PipelineHealth {
        PipelineHealth::new(
            self.roles
                .iter()
                .map(|(role, actor)| ModelHealth {
                    role: *role,
                    model_id: actor.model_id().to_string(),
                    available: actor.is_available(),
                })
                .collect(),
        )
    }

    /// Stops every model actor. Later turns still complete, on the
    /// rule-based and fallback paths.
    pub async fn shutdown(&self) {
        for (role, actor) in &self.roles {
            actor.shutdown().await;
            info!("Stopped {} model {}", role, actor.model_id());
        }
    }
}
