//! Vision-LLM text recognition through `edgequake-llm`.
//!
//! Each image becomes one chat request: the transcription prompt as the
//! system message and the image as a base64 PNG attachment on an empty user
//! turn. Markdown heading markers and image links are stripped from the reply.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 errors are frequent under concurrent load. Failed calls are
//! retried with exponential backoff (`retry_backoff_ms * 2^(attempt-1)`):
//! with 500 ms base and 3 retries the waits are 500 ms → 1 s → 2 s.

use super::encode::to_image_data;
use super::TextRecognizer;
use crate::error::Doc2TextError;
use crate::postprocess::strip_markdown;
use crate::prompts::DEFAULT_OCR_PROMPT;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use image::DynamicImage;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// Model used when a provider is named without one.
pub const DEFAULT_VISION_MODEL: &str = "gpt-4.1-nano";

/// Recognises text by asking a vision-capable LLM to transcribe the image.
pub struct VisionRecognizer {
    provider: Arc<dyn LLMProvider>,
    prompt: String,
    temperature: f32,
    max_tokens: usize,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl fmt::Debug for VisionRecognizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisionRecognizer")
            .field("provider", &"<dyn LLMProvider>")
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .finish()
    }
}

impl VisionRecognizer {
    /// Wrap an already configured provider.
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            prompt: DEFAULT_OCR_PROMPT.to_string(),
            temperature: 0.0,
            max_tokens: 4096,
            max_retries: 3,
            retry_backoff_ms: 500,
        }
    }

    /// Resolve a provider from explicit names or the environment.
    ///
    /// Resolution order, most specific first:
    ///
    /// 1. `provider_name` (+ `model`, default [`DEFAULT_VISION_MODEL`]).
    /// 2. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set.
    /// 3. `OPENAI_API_KEY` present → OpenAI with `model`.
    /// 4. [`ProviderFactory::from_env`] auto-detection.
    pub fn from_env(
        provider_name: Option<&str>,
        model: Option<&str>,
    ) -> Result<Self, Doc2TextError> {
        let provider = resolve_provider(provider_name, model)?;
        Ok(Self::new(provider))
    }

    /// Replace the transcription prompt.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens.max(1);
        self
    }

    /// Retries after the first failed call, and the base backoff between them.
    pub fn with_retries(mut self, max_retries: u32, retry_backoff_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff_ms = retry_backoff_ms;
        self
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

/// Wait before retry number `attempt` (1-based).
fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_millis(base_ms.saturating_mul(factor))
}

#[async_trait]
impl TextRecognizer for VisionRecognizer {
    fn name(&self) -> &str {
        "vision"
    }

    async fn recognize(&self, image: &DynamicImage) -> Result<String, Doc2TextError> {
        let image_data = to_image_data(image).map_err(|e| Doc2TextError::RecognitionFailed {
            recognizer: self.name().to_string(),
            detail: format!("PNG encoding failed: {e}"),
        })?;

        // The image carries the content; the user turn only needs to exist.
        let messages = vec![
            ChatMessage::system(self.prompt.as_str()),
            ChatMessage::user_with_images("", vec![image_data]),
        ];
        let options = self.options();
        let start = Instant::now();
        let mut last_err: Option<String> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = backoff_delay(self.retry_backoff_ms, attempt);
                warn!(
                    "Vision recognition: retry {}/{} after {:?}",
                    attempt, self.max_retries, backoff
                );
                sleep(backoff).await;
            }

            match self.provider.chat(&messages, Some(&options)).await {
                Ok(response) => {
                    debug!(
                        "Vision recognition: {} input tokens, {} output tokens, {:?}",
                        response.prompt_tokens,
                        response.completion_tokens,
                        start.elapsed()
                    );
                    return Ok(strip_markdown(&response.content));
                }
                Err(e) => {
                    warn!("Vision recognition: attempt {} failed: {}", attempt + 1, e);
                    last_err = Some(e.to_string());
                }
            }
        }

        Err(Doc2TextError::RecognitionFailed {
            recognizer: self.name().to_string(),
            detail: format!(
                "{} retries exhausted: {}",
                self.max_retries,
                last_err.unwrap_or_else(|| "unknown error".to_string())
            ),
        })
    }
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, Doc2TextError> {
    info!("Using vision provider {provider_name} / {model}");
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        Doc2TextError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: e.to_string(),
        }
    })
}

fn resolve_provider(
    provider_name: Option<&str>,
    model: Option<&str>,
) -> Result<Arc<dyn LLMProvider>, Doc2TextError> {
    if let Some(name) = provider_name {
        return create_vision_provider(name, model.unwrap_or(DEFAULT_VISION_MODEL));
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_vision_provider(&prov, &env_model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_vision_provider("openai", model.unwrap_or(DEFAULT_VISION_MODEL));
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| Doc2TextError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!("no provider could be auto-detected from the environment: {e}"),
        })?;
    Ok(llm_provider)
}
