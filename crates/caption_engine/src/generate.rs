use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use caption_core::CaptionResult;
use caption_logging::caption_debug;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;

use crate::prompt::{
    build_chat_request, DEFAULT_BASE_URL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_PROMPT,
};
use crate::repair::{ParseFailure, ResponseRepairer, TolerantJsonRepairer};

#[derive(Debug, Clone)]
pub struct ModelSettings {
    /// OpenAI-compatible API root, e.g. `http://localhost:8088/v1`.
    pub base_url: String,
    pub model: String,
    /// Sent as a bearer token when non-empty.
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub prompt: String,
    /// `None` waits on the model indefinitely.
    pub request_timeout: Option<Duration>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            prompt: DEFAULT_PROMPT.to_string(),
            request_timeout: None,
        }
    }
}

impl ModelSettings {
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationFailure {
    #[error("model request failed: {0}")]
    Transport(String),
    #[error("model returned http status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("model response was not a chat completion: {0}")]
    Envelope(String),
    #[error("model returned an empty response")]
    EmptyResponse,
    #[error("model output could not be parsed: {0}")]
    Parse(#[from] ParseFailure),
}

/// One model invocation per image. No retries; callers decide when to retry.
#[async_trait::async_trait]
pub trait CaptionGenerator: Send + Sync {
    async fn generate(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<CaptionResult, GenerationFailure>;
}

pub struct ChatCompletionsGenerator {
    settings: ModelSettings,
    client: reqwest::Client,
    repairer: Box<dyn ResponseRepairer>,
}

impl ChatCompletionsGenerator {
    pub fn new(settings: ModelSettings) -> Result<Self, GenerationFailure> {
        Self::with_repairer(settings, Box::new(TolerantJsonRepairer))
    }

    pub fn with_repairer(
        settings: ModelSettings,
        repairer: Box<dyn ResponseRepairer>,
    ) -> Result<Self, GenerationFailure> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| GenerationFailure::Transport(err.to_string()))?;
        Ok(Self {
            settings,
            client,
            repairer,
        })
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[async_trait::async_trait]
impl CaptionGenerator for ChatCompletionsGenerator {
    async fn generate(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<CaptionResult, GenerationFailure> {
        let body = build_chat_request(
            &self.settings.model,
            &self.settings.prompt,
            self.settings.max_tokens,
            mime_type,
            &BASE64.encode(image),
        );
        let payload = serde_json::to_vec(&body)
            .map_err(|err| GenerationFailure::Transport(err.to_string()))?;

        let mut request = self
            .client
            .post(self.settings.completions_url())
            .header(CONTENT_TYPE, "application/json")
            .body(payload);
        if let Some(key) = self.settings.api_key.as_deref().filter(|key| !key.is_empty()) {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|err| GenerationFailure::Transport(err.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| GenerationFailure::Transport(err.to_string()))?;
        if !status.is_success() {
            return Err(GenerationFailure::HttpStatus {
                status: status.as_u16(),
                body: text,
            });
        }
        if text.trim().is_empty() {
            return Err(GenerationFailure::EmptyResponse);
        }

        let completion: ChatCompletion = serde_json::from_str(&text)
            .map_err(|err| GenerationFailure::Envelope(err.to_string()))?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(GenerationFailure::EmptyResponse)?;
        caption_debug!("model replied with {} chars", content.len());

        Ok(self.repairer.repair(&content)?)
    }
}
