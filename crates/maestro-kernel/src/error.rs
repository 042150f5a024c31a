//! Engine error types
//!
//! Unified error handling across the orchestration core.

use thiserror::Error;

/// Engine operation result type
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine error type
#[derive(Debug, Error)]
pub enum EngineError {
    /// Named agent is not present in the registry
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    /// Initial plan synthesis failed (fatal for the workflow)
    #[error("Planner failed: {0}")]
    PlannerFailed(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// The state store cannot serve reads or writes
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Pending steps exist but none can ever become eligible
    #[error("Dependency deadlock: {0}")]
    Deadlock(String),

    /// The replan loop guard was reached
    #[error("Replan limit of {limit} exceeded")]
    ReplanLimitExceeded { limit: u32 },

    /// A node exceeded its per-agent timeout
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// The workflow was cancelled by the client
    #[error("Workflow was cancelled")]
    Cancelled,

    #[error("Invalid state transition: from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Create a timeout error
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a state transition error
    pub fn invalid_state_transition(
        from: impl std::fmt::Debug,
        to: impl std::fmt::Debug,
    ) -> Self {
        Self::InvalidStateTransition {
            from: format!("{:?}", from),
            to: format!("{:?}", to),
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}
