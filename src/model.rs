//! # Generative Model Client
//!
//! A thin seam over the text-generation provider: every generator in the
//! pipeline only needs "send a prompt, get text back", so that is all the
//! [`TextModel`] trait asks for.
//!
//! ## Key Components
//!
//! - `TextModel`: invoke a model with a prompt and bounded sampling options
//! - `RigTextModel`: adapts any `rig` completion model (Gemini in production)
//! - `RateLimitedModel`: wraps a `TextModel` with a `governor` quota
//! - `ModelError`: transport/API failures classified so callers can
//!   pattern-match on throttling, access-denied, not-found and validation
//!
//! Every invocation through `RigTextModel` records estimated token usage in
//! the shared [`UsageLedger`].

use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{Quota, RateLimiter};
use rig::completion::{AssistantContent, CompletionError, CompletionModel};
use rig::providers::gemini;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::AppConfig;
use crate::error::ErrorKind;
use crate::usage::{estimate_tokens, UsageLedger};

#[cfg(test)]
pub mod mock_model;
pub mod ratelimited_completion;

pub use ratelimited_completion::RateLimitedModel;

/// Sampling bounds for a single invocation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvokeOptions {
    pub max_tokens: u64,
    pub temperature: f64,
}

impl Default for InvokeOptions {
    fn default() -> Self {
        Self {
            max_tokens: 2000,
            temperature: 0.7,
        }
    }
}

/// Classified model invocation failures
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("Model request throttled: {0}")]
    Throttled(String),

    #[error("Access denied to model: {0}")]
    AccessDenied(String),

    #[error("Model not found: {0}")]
    NotFound(String),

    #[error("Invalid model request: {0}")]
    Validation(String),

    #[error("Model transport error: {0}")]
    Transport(String),

    #[error("Model API error: {0}")]
    Other(String),
}

impl ModelError {
    /// Classify a provider message by the status codes and phrases it carries
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lowered = message.to_lowercase();
        if lowered.contains("429")
            || lowered.contains("throttl")
            || lowered.contains("quota")
            || lowered.contains("rate limit")
            || lowered.contains("resource_exhausted")
        {
            ModelError::Throttled(message)
        } else if lowered.contains("401")
            || lowered.contains("403")
            || lowered.contains("permission")
            || lowered.contains("access denied")
            || lowered.contains("api key")
        {
            ModelError::AccessDenied(message)
        } else if lowered.contains("404") || lowered.contains("not found") {
            ModelError::NotFound(message)
        } else if lowered.contains("400") || lowered.contains("invalid") {
            ModelError::Validation(message)
        } else {
            ModelError::Other(message)
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ModelError::Throttled(_) => ErrorKind::RateLimited,
            ModelError::AccessDenied(_) => ErrorKind::Configuration,
            ModelError::NotFound(_) => ErrorKind::Configuration,
            ModelError::Validation(_) => ErrorKind::Validation,
            ModelError::Transport(message) if message.to_lowercase().contains("timed out") => {
                ErrorKind::Timeout
            }
            ModelError::Transport(_) | ModelError::Other(_) => ErrorKind::Internal,
        }
    }
}

impl From<CompletionError> for ModelError {
    fn from(err: CompletionError) -> Self {
        match err {
            CompletionError::HttpError(e) => ModelError::Transport(e.to_string()),
            other => ModelError::classify(other.to_string()),
        }
    }
}

/// Invoke a generative model with a prompt and get text back
pub trait TextModel: Send + Sync {
    fn invoke(
        &self,
        prompt: &str,
        options: InvokeOptions,
    ) -> impl Future<Output = Result<String, ModelError>> + Send;
}

impl<T: TextModel> TextModel for Arc<T> {
    async fn invoke(&self, prompt: &str, options: InvokeOptions) -> Result<String, ModelError> {
        self.as_ref().invoke(prompt, options).await
    }
}

/// Adapts a `rig` completion model to [`TextModel`]
#[derive(Clone)]
pub struct RigTextModel<M: CompletionModel> {
    model: M,
    model_id: String,
    usage: Arc<UsageLedger>,
}

impl<M: CompletionModel> RigTextModel<M> {
    pub fn new(model: M, model_id: impl Into<String>, usage: Arc<UsageLedger>) -> Self {
        Self {
            model,
            model_id: model_id.into(),
            usage,
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }
}

impl<M> TextModel for RigTextModel<M>
where
    M: CompletionModel + Send + Sync,
{
    #[instrument(skip(self, prompt), fields(model = %self.model_id, prompt_len = prompt.len()))]
    async fn invoke(&self, prompt: &str, options: InvokeOptions) -> Result<String, ModelError> {
        let response = self
            .model
            .completion_request(prompt.to_string())
            .max_tokens(options.max_tokens)
            .temperature(options.temperature)
            .send()
            .await?;

        let text = response
            .choice
            .iter()
            .filter_map(|content| match content {
                AssistantContent::Text(text) => Some(text.text.clone()),
                _ => None,
            })
            .collect::<Vec<String>>()
            .join("");
        let text = text.trim().to_string();

        self.usage.record(
            estimate_tokens(prompt),
            estimate_tokens(&text),
            &self.model_id,
            None,
        );
        debug!(output_len = text.len(), "Model invocation completed");
        Ok(text)
    }
}

/// Production model: Gemini behind a per-minute quota
pub type GeminiModel = RateLimitedModel<RigTextModel<gemini::completion::CompletionModel>>;

/// Build the production model from configuration
pub fn gemini_from_config(
    config: &AppConfig,
    usage: Arc<UsageLedger>,
) -> Result<GeminiModel, crate::Error> {
    let api_key = config.require_gemini_api_key()?;
    let client = gemini::Client::new(api_key);
    let per_minute = NonZeroU32::new(config.model_requests_per_minute).ok_or_else(|| {
        crate::Error::Config("QTB_MODEL_RPM must be greater than zero".to_string())
    })?;
    let limiter = RateLimiter::direct(Quota::per_minute(per_minute));
    let model = RigTextModel::new(
        client.completion_model(&config.model_id),
        config.model_id.clone(),
        usage,
    );
    Ok(RateLimitedModel::new(model, limiter))
}
