//! # Delegated Agent Generation
//!
//! The alternative to the sequential pipeline: one instruction prompt is
//! handed to an agent that searches, summarizes and writes flashcards and a
//! quiz on its own, calling back into the crate through action groups.
//!
//! ## Key Components
//!
//! - `AgentClient`: drives an [`AgentRuntime`] event stream under timeout and
//!   iteration limits, with retry and usage accounting
//! - `ModelAgentRuntime`: a runtime backed by the local [`TextModel`](crate::model::TextModel)
//! - `AgentOrchestrator`: builds the instruction prompt and turns the
//!   completion into a validated [`GenerationResult`](crate::types::GenerationResult)
//! - `ActionGroupHandler`: answers the agent's tool callbacks

use std::time::Duration;

use crate::config::{AppConfig, DEFAULT_AGENT_MAX_ITERATIONS, DEFAULT_TIMEOUT_SECS};
use crate::types::TokenUsage;

pub mod action_groups;
pub mod error;
#[cfg(test)]
pub mod mock_runtime;
pub mod orchestrator;
pub mod runtime;

pub use action_groups::{ActionGroupHandler, ActionGroupRequest, ActionGroupResponse};
pub use error::AgentError;
pub use orchestrator::{
    build_prompt, into_materials, parse_response, validate_result, AgentGenerationOptions,
    AgentOrchestrator, ParsedMaterials,
};
pub use runtime::{
    new_session_id, AgentClient, AgentEvent, AgentEventStream, AgentRequest, AgentRuntime,
    ModelAgentRuntime, RetryPolicy,
};

/// Limits and identity for one agent invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentInvocationOptions {
    /// Reuse a session; a fresh id is generated when absent
    pub session_id: Option<String>,
    pub enable_trace: bool,
    pub max_iterations: u32,
    pub timeout: Duration,
}

impl Default for AgentInvocationOptions {
    fn default() -> Self {
        Self {
            session_id: None,
            enable_trace: false,
            max_iterations: DEFAULT_AGENT_MAX_ITERATIONS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl AgentInvocationOptions {
    pub fn builder() -> AgentInvocationOptionsBuilder {
        AgentInvocationOptionsBuilder::default()
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::builder()
            .enable_trace(config.agent_enable_trace)
            .max_iterations(config.agent_max_iterations)
            .timeout(config.agent_timeout)
            .build()
    }
}

/// Builder for AgentInvocationOptions
#[derive(Debug, Default)]
pub struct AgentInvocationOptionsBuilder {
    options: AgentInvocationOptions,
}

impl AgentInvocationOptionsBuilder {
    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.options.session_id = Some(session_id.into());
        self
    }

    pub fn enable_trace(mut self, enable: bool) -> Self {
        self.options.enable_trace = enable;
        self
    }

    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.options.max_iterations = max_iterations;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    pub fn build(self) -> AgentInvocationOptions {
        self.options
    }
}

/// Assembled output of one agent invocation
#[derive(Debug, Clone, PartialEq)]
pub struct AgentResponse {
    pub completion: String,
    pub session_id: String,
    pub trace_id: Option<String>,
    pub usage: TokenUsage,
}
