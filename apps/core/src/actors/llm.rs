use crate::actors::messages::{ActorError, AppError, LlmMessage, ModelRequest};
use crate::actors::traits::LlmActor;
use crate::config::{ModelConfig, Provider};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// A handle to a running model actor.
///
/// Cloneable; every clone talks to the same runner task. The runner owns the
/// HTTP client and credentials and is stopped with [`LlmActor::shutdown`].
#[derive(Clone)]
pub struct LlmActorHandle {
    sender: mpsc::Sender<LlmMessage>,
    model_id: Arc<str>,
    request_timeout: Duration,
}

impl LlmActorHandle {
    /// Spawns the runner for `config` and returns a handle to it.
    ///
    /// `request_timeout` bounds each call end to end, including queueing.
    pub fn new(config: ModelConfig, request_timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;
        let auth = build_auth_headers(&config)?;

        let (sender, receiver) = mpsc::channel(32);
        let model_id: Arc<str> = Arc::from(config.model_id.as_str());
        let actor = LlmActorRunner {
            receiver,
            backend: Arc::new(Backend {
                config,
                client,
                auth,
            }),
        };
        tokio::spawn(async move { actor.run().await });

        Ok(Self {
            sender,
            model_id,
            request_timeout,
        })
    }
}

#[async_trait]
impl LlmActor for LlmActorHandle {
    async fn complete(&self, request: ModelRequest) -> Result<String, AppError> {
        let (send, recv) = oneshot::channel();
        let msg = LlmMessage::Complete {
            request,
            responder: send,
        };

        self.sender
            .send(msg)
            .await
            .map_err(|e| ActorError::Unavailable(e.to_string()))?;
        timeout(self.request_timeout, recv)
            .await?
            .map_err(|e| ActorError::Unavailable(e.to_string()))?
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn is_available(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Stops the runner. Requests already in flight finish; later ones fail
    /// with `ActorError::Unavailable`.
    async fn shutdown(&self) {
        let (send, recv) = oneshot::channel();
        if self
            .sender
            .send(LlmMessage::Shutdown { responder: send })
            .await
            .is_err()
        {
            debug!("Model actor {} already stopped", self.model_id);
            return;
        }
        let _ = recv.await;
    }
}

fn build_auth_headers(config: &ModelConfig) -> Result<HeaderMap, AppError> {
    let mut headers = HeaderMap::new();
    let (name, value) = match config.provider {
        Provider::OpenAi => (AUTHORIZATION, format!("Bearer {}", config.api_key)),
        Provider::Gemini => (
            HeaderName::from_static("x-goog-api-key"),
            config.api_key.clone(),
        ),
    };
    let mut value = HeaderValue::from_str(&value)
        .map_err(|e| AppError::Config(format!("Invalid API key for {}: {}", config.model_id, e)))?;
    value.set_sensitive(true);
    headers.insert(name, value);
    Ok(headers)
}

// --- Actor Runner (Internal Logic) ---
struct LlmActorRunner {
    receiver: mpsc::Receiver<LlmMessage>,
    backend: Arc<Backend>,
}

impl LlmActorRunner {
    async fn run(mut self) {
        info!(
            "LlmActor started: {} via {}",
            self.backend.config.model_id, self.backend.config.provider
        );

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                LlmMessage::Complete { request, responder } => {
                    // Calls run concurrently; the runner only dispatches.
                    let backend = Arc::clone(&self.backend);
                    tokio::spawn(async move {
                        let result = backend.complete(request).await;
                        if let Err(e) = &result {
                            warn!("Model {} call failed: {}", backend.config.model_id, e);
                        }
                        let _ = responder.send(result);
                    });
                }
                LlmMessage::Shutdown { responder } => {
                    info!("LlmActor {} shutting down", self.backend.config.model_id);
                    self.receiver.close();
                    let _ = responder.send(());
                    break;
                }
            }
        }

        info!("LlmActor stopped: {}", self.backend.config.model_id);
    }
}

struct Backend {
    config: ModelConfig,
    client: Client,
    auth: HeaderMap,
}

impl Backend {
    async fn complete(&self, request: ModelRequest) -> Result<String, AppError> {
        debug!(
            model = %self.config.model_id,
            prompt_chars = request.prompt.chars().count(),
            "Model request"
        );
        let text = match self.config.provider {
            Provider::OpenAi => self.chat_completion(&request).await?,
            Provider::Gemini => self.generate_content(&request).await?,
        };
        Ok(text)
    }

    async fn chat_completion(&self, request: &ModelRequest) -> Result<String, AppError> {
        let payload = ChatCompletionRequest {
            model: &self.config.model_id,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system_instruction,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            max_tokens: request.max_output_tokens,
            temperature: request.temperature,
            response_format: request
                .json_output
                .then_some(ResponseFormat { kind: "json_object" }),
        };

        let url = self.config.endpoint("chat/completions")?;
        let res = self
            .client
            .post(url)
            .headers(self.auth.clone())
            .json(&payload)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            error!("Chat completion failed with status {}", status);
            return Err(ActorError::Status(format!(
                "Completion request failed with status {}: {}",
                status, body
            ))
            .into());
        }

        let body: ChatCompletionResponse = res.json().await?;
        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::MalformedResponse("Completion has no choices".to_string()))?;
        choice.message.content.ok_or_else(|| {
            AppError::MalformedResponse("Completion choice has no content".to_string())
        })
    }

    async fn generate_content(&self, request: &ModelRequest) -> Result<String, AppError> {
        let payload = GenerateContentRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: request.system_instruction.clone(),
                }],
            },
            contents: vec![GeminiContent {
                role: Some("user"),
                parts: vec![GeminiPart {
                    text: request.prompt.clone(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_output_tokens,
                response_mime_type: request.json_output.then_some("application/json"),
            },
        };

        let url = self
            .config
            .endpoint(&format!("models/{}:generateContent", self.config.model_id))?;
        let res = self
            .client
            .post(url)
            .headers(self.auth.clone())
            .json(&payload)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            error!("generateContent failed with status {}", status);
            return Err(ActorError::Status(format!(
                "generateContent failed with status {}: {}",
                status, body
            ))
            .into());
        }

        let body: GenerateContentResponse = res.json().await?;
        let candidate = body.candidates.into_iter().next().ok_or_else(|| {
            AppError::MalformedResponse("generateContent returned no candidates".to_string())
        })?;
        Ok(candidate
            .content
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join(""))
    }
}

// --- Wire types ---

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiCandidateContent,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Deserialize)]
struct GeminiCandidatePart {
    text: Option<String>,
}
