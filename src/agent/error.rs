//! Error types for delegated agent invocation

use thiserror::Error;

use crate::error::ErrorKind;
use crate::model::ModelError;

/// Failures of an agent invocation, classified for retry and reporting
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    /// The wall-clock limit for one invocation was exceeded
    #[error("Agent invocation timeout exceeded")]
    Timeout,

    /// The agent emitted more events than the iteration limit allows
    #[error("Agent max iterations exceeded")]
    MaxIterations,

    #[error("Invalid agent configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Access denied to agent. Check credentials and permissions.")]
    AccessDenied,

    #[error("Agent not found. Verify the agent ID.")]
    NotFound,

    #[error("Agent service is currently throttled. Please try again later.")]
    Throttled,

    #[error("Agent service quota exceeded.")]
    QuotaExceeded,

    /// Transport or stream failure
    #[error("Agent invocation failed: {0}")]
    Stream(String),

    /// Rejected input, such as a topic that fails validation
    #[error("{0}")]
    InvalidInput(String),

    /// The agent answered, but nothing usable could be read from it
    #[error("Invalid agent response: {0}")]
    InvalidResponse(String),
}

impl AgentError {
    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AgentError::Throttled | AgentError::QuotaExceeded | AgentError::Stream(_)
        )
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AgentError::Timeout => ErrorKind::Timeout,
            AgentError::Throttled | AgentError::QuotaExceeded => ErrorKind::RateLimited,
            AgentError::InvalidConfiguration(_) | AgentError::AccessDenied => {
                ErrorKind::Configuration
            }
            AgentError::NotFound => ErrorKind::Configuration,
            AgentError::InvalidInput(_) => ErrorKind::Validation,
            AgentError::MaxIterations
            | AgentError::Stream(_)
            | AgentError::InvalidResponse(_) => ErrorKind::Internal,
        }
    }
}

impl From<ModelError> for AgentError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Throttled(message) if message.to_lowercase().contains("quota") => {
                AgentError::QuotaExceeded
            }
            ModelError::Throttled(_) => AgentError::Throttled,
            ModelError::AccessDenied(_) => AgentError::AccessDenied,
            ModelError::NotFound(_) => AgentError::NotFound,
            ModelError::Validation(message) => AgentError::InvalidConfiguration(message),
            ModelError::Transport(message) | ModelError::Other(message) => {
                AgentError::Stream(message)
            }
        }
    }
}
