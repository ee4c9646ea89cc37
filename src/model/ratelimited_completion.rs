use std::sync::Arc;

use governor::DefaultDirectRateLimiter;
use tracing::{debug_span, info_span, Instrument};

use super::{InvokeOptions, ModelError, TextModel};

/// A [`TextModel`] that waits on a shared quota before every invocation
#[derive(Clone)]
pub struct RateLimitedModel<M: TextModel> {
    model: M,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl<M> RateLimitedModel<M>
where
    M: TextModel,
{
    pub fn new(model: M, limiter: DefaultDirectRateLimiter) -> Self {
        Self {
            model,
            limiter: Arc::new(limiter),
        }
    }

    pub fn inner(&self) -> &M {
        &self.model
    }
}

impl<M: TextModel> TextModel for RateLimitedModel<M> {
    async fn invoke(&self, prompt: &str, options: InvokeOptions) -> Result<String, ModelError> {
        self.limiter.until_ready().instrument(debug_span!("limiter")).await;
        self.model
            .invoke(prompt, options)
            .instrument(info_span!("completion", max_tokens = options.max_tokens))
            .await
    }
}
