use serde::{Deserialize, Serialize};
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum AgentError {
    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("{0}")]
    Dependency(String),

    #[error("{0} is not configured")]
    NotConfigured(String),

    #[error("Stopped after {0} model calls without a final answer")]
    LoopBoundExceeded(usize),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AgentError {
    /// Wrap any transport level failure (timeouts, connection resets, bad bodies).
    pub fn dependency<E: std::fmt::Display>(service: &str, err: E) -> Self {
        AgentError::Dependency(format!("{} request failed: {}", service, err))
    }
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AgentError::Dependency("Request timed out".to_string())
        } else if err.is_decode() {
            AgentError::Dependency(format!("Malformed response body: {}", err))
        } else {
            AgentError::Dependency(err.to_string())
        }
    }
}

pub type AgentResult<T> = Result<T, AgentError>;
