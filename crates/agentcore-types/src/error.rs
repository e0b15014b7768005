use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification carried alongside every `AgentError`, used in the
/// public `run()` result's `error.kind` field so callers can branch on
/// failure class without string-matching the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    GuardrailBlocked,
    LlmUnavailable,
    LlmInvalidOutput,
    ToolNotFound,
    ToolInvalidArgs,
    ToolTimeout,
    ToolError,
    ContextOverflow,
    BudgetExceeded,
    StoreUnavailable,
    MigrationFailed,
    Cancelled,
    Internal,
}

/// Structured, serializable error type for the agentcore crate.
///
/// Every variant maps to exactly one [`ErrorKind`] via
/// [`AgentError::kind`]; this is the single source of truth callers use to
/// decide whether a failure is retriable.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[non_exhaustive]
pub enum AgentError {
    #[error("input blocked by guardrail (threat={threat:.2}): {reasons:?}")]
    GuardrailBlocked { threat: f64, reasons: Vec<String> },

    #[error("llm provider unavailable: {0}")]
    LlmUnavailable(String),

    #[error("llm produced invalid output: {0}")]
    LlmInvalidOutput(String),

    #[error("tool not found: {name}")]
    ToolNotFound { name: String },

    #[error("invalid arguments for tool {name}: {reason}")]
    ToolInvalidArgs { name: String, reason: String },

    #[error("tool {name} timed out after {elapsed_ms}ms")]
    ToolTimeout { name: String, elapsed_ms: u64 },

    #[error("tool {name} failed: {reason}")]
    ToolError { name: String, reason: String },

    #[error("context overflow: {tokens} tokens exceeds budget {budget}")]
    ContextOverflow { tokens: usize, budget: usize },

    #[error("budget exceeded: {reason}")]
    BudgetExceeded { reason: String },

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("backend migration failed, previous backend remains authoritative: {0}")]
    MigrationFailed(String),

    #[error("run cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl AgentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AgentError::GuardrailBlocked { .. } => ErrorKind::GuardrailBlocked,
            AgentError::LlmUnavailable(_) => ErrorKind::LlmUnavailable,
            AgentError::LlmInvalidOutput(_) => ErrorKind::LlmInvalidOutput,
            AgentError::ToolNotFound { .. } => ErrorKind::ToolNotFound,
            AgentError::ToolInvalidArgs { .. } => ErrorKind::ToolInvalidArgs,
            AgentError::ToolTimeout { .. } => ErrorKind::ToolTimeout,
            AgentError::ToolError { .. } => ErrorKind::ToolError,
            AgentError::ContextOverflow { .. } => ErrorKind::ContextOverflow,
            AgentError::BudgetExceeded { .. } => ErrorKind::BudgetExceeded,
            AgentError::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
            AgentError::MigrationFailed(_) => ErrorKind::MigrationFailed,
            AgentError::Cancelled => ErrorKind::Cancelled,
            AgentError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether a caller could reasonably retry the same request unmodified.
    pub fn retriable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::LlmUnavailable | ErrorKind::ToolTimeout | ErrorKind::StoreUnavailable
        )
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(e: serde_json::Error) -> Self {
        AgentError::Internal(format!("serialization error: {e}"))
    }
}
