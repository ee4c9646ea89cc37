//! Agent runtimes and the invocation client.
//!
//! An [`AgentRuntime`] turns a prompt into a stream of [`AgentEvent`]s. The
//! [`AgentClient`] drives that stream: it enforces the wall-clock and
//! iteration limits on every event, assembles the completion, records
//! token usage and retries transient failures with capped exponential
//! backoff.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use futures::stream::{BoxStream, StreamExt};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::error::AgentError;
use super::{AgentInvocationOptions, AgentResponse};
use crate::model::{InvokeOptions, TextModel};
use crate::types::TokenUsage;
use crate::usage::{estimate_tokens, UsageLedger};

/// Model id recorded for agent usage
pub const AGENT_MODEL_ID: &str = "agent";

/// One event emitted by a running agent
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// A piece of the completion, as raw bytes
    Chunk(Vec<u8>),
    Trace {
        trace_id: String,
    },
    Metadata {
        input_tokens: Option<u64>,
        output_tokens: Option<u64>,
        stop_reason: Option<String>,
    },
}

/// A single agent run request
#[derive(Debug, Clone, PartialEq)]
pub struct AgentRequest {
    pub input: String,
    pub session_id: String,
    pub enable_trace: bool,
}

/// Event stream handed back by a runtime
pub type AgentEventStream = BoxStream<'static, Result<AgentEvent, AgentError>>;

/// Something that can run an agent
pub trait AgentRuntime: Send + Sync {
    fn invoke(
        &self,
        request: AgentRequest,
    ) -> impl Future<Output = Result<AgentEventStream, AgentError>> + Send;
}

impl<T: AgentRuntime> AgentRuntime for Arc<T> {
    async fn invoke(&self, request: AgentRequest) -> Result<AgentEventStream, AgentError> {
        self.as_ref().invoke(request).await
    }
}

/// Runs the agent on a local [`TextModel`], emitting the completion as
/// chunk events followed by a metadata event
pub struct ModelAgentRuntime<M> {
    model: M,
    options: InvokeOptions,
    chunk_size: usize,
}

impl<M: TextModel> ModelAgentRuntime<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            options: InvokeOptions {
                max_tokens: 4000,
                temperature: 0.7,
            },
            chunk_size: 4096,
        }
    }

    pub fn with_options(mut self, options: InvokeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

impl<M: TextModel> AgentRuntime for ModelAgentRuntime<M> {
    async fn invoke(&self, request: AgentRequest) -> Result<AgentEventStream, AgentError> {
        let completion = self.model.invoke(&request.input, self.options).await?;
        let chunk_size = self.chunk_size;
        let input_tokens = estimate_tokens(&request.input);
        let output_tokens = estimate_tokens(&completion);

        let events = stream! {
            if request.enable_trace {
                yield Ok(AgentEvent::Trace { trace_id: Uuid::new_v4().to_string() });
            }
            for chunk in completion.as_bytes().chunks(chunk_size) {
                yield Ok(AgentEvent::Chunk(chunk.to_vec()));
            }
            yield Ok(AgentEvent::Metadata {
                input_tokens: Some(input_tokens),
                output_tokens: Some(output_tokens),
                stop_reason: Some("end_turn".to_string()),
            });
        };
        Ok(events.boxed())
    }
}

/// Capped exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// A fresh session id, `quizthebest-<epoch ms>-<random suffix>`
pub fn new_session_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "quizthebest-{}-{}",
        chrono::Utc::now().timestamp_millis(),
        &suffix[..9]
    )
}

/// Drives an [`AgentRuntime`] under the configured limits
pub struct AgentClient<R> {
    runtime: R,
    defaults: AgentInvocationOptions,
    retry: RetryPolicy,
    usage: Arc<UsageLedger>,
}

impl<R: AgentRuntime> AgentClient<R> {
    pub fn new(runtime: R, defaults: AgentInvocationOptions, usage: Arc<UsageLedger>) -> Self {
        Self {
            runtime,
            defaults,
            retry: RetryPolicy::default(),
            usage,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn defaults(&self) -> &AgentInvocationOptions {
        &self.defaults
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Run the agent once.
    ///
    /// Fails with [`AgentError::Timeout`] as soon as the wall-clock limit
    /// passes, whether the stream is producing events or stalled, and with
    /// [`AgentError::MaxIterations`] once more events than allowed arrive.
    /// Dropping the stream aborts the run.
    #[instrument(skip(self, input, options), fields(input_len = input.len()))]
    pub async fn invoke_agent(
        &self,
        input: &str,
        options: &AgentInvocationOptions,
    ) -> Result<AgentResponse, AgentError> {
        let session_id = options
            .session_id
            .clone()
            .unwrap_or_else(new_session_id);
        let start = Instant::now();
        let request = AgentRequest {
            input: input.to_string(),
            session_id: session_id.clone(),
            enable_trace: options.enable_trace,
        };
        debug!(%session_id, "Invoking agent");

        let mut events = tokio::time::timeout(options.timeout, self.runtime.invoke(request))
            .await
            .map_err(|_| AgentError::Timeout)??;

        let mut completion = Vec::new();
        let mut trace_id = None;
        let mut input_tokens = 0u64;
        let mut output_tokens = 0u64;
        let mut stop_reason = None;
        let mut iterations = 0u32;

        loop {
            let remaining = options.timeout.saturating_sub(start.elapsed());
            let next = tokio::time::timeout(remaining, events.next())
                .await
                .map_err(|_| AgentError::Timeout)?;
            let Some(event) = next else { break };

            if start.elapsed() > options.timeout {
                return Err(AgentError::Timeout);
            }
            iterations += 1;
            if iterations > options.max_iterations {
                return Err(AgentError::MaxIterations);
            }

            match event? {
                AgentEvent::Chunk(bytes) => completion.extend_from_slice(&bytes),
                AgentEvent::Trace { trace_id: id } => trace_id = Some(id),
                AgentEvent::Metadata {
                    input_tokens: input,
                    output_tokens: output,
                    stop_reason: reason,
                } => {
                    input_tokens += input.unwrap_or(0);
                    output_tokens += output.unwrap_or(0);
                    if reason.is_some() {
                        stop_reason = reason;
                    }
                }
            }
        }

        let completion = String::from_utf8_lossy(&completion).trim().to_string();
        if input_tokens == 0 && output_tokens == 0 {
            input_tokens = estimate_tokens(input);
            output_tokens = estimate_tokens(&completion);
        }
        self.usage
            .record(input_tokens, output_tokens, AGENT_MODEL_ID, None);

        info!(
            %session_id,
            iterations,
            completion_len = completion.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Agent invocation completed"
        );

        Ok(AgentResponse {
            completion,
            session_id,
            trace_id,
            usage: TokenUsage {
                input_tokens,
                output_tokens,
                stop_reason,
            },
        })
    }

    /// Run the agent, retrying transient failures
    pub async fn invoke_with_retry(
        &self,
        input: &str,
        options: &AgentInvocationOptions,
    ) -> Result<AgentResponse, AgentError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.invoke_agent(input, options).await {
                Ok(response) => return Ok(response),
                Err(err) if !err.is_retryable() || attempt >= max_attempts => {
                    if err.is_retryable() {
                        warn!(attempt, error = %err, "Agent retries exhausted");
                    }
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Agent invocation failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
