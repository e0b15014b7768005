use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Structured event types fanned out through `EventRouter`.
///
/// Events are append-only and strictly ordered per session (see
/// [`AgentEvent::event_id`]); no event is ever rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum EventKind {
    UserMessage { content: String },
    AgentThought { content: String },
    ToolCallStarted { tool_name: String, arguments: serde_json::Value },
    ToolCallResult { tool_name: String, ok: bool, summary: String },
    FinalAnswer { content: String },
    SubAgentStarted { child_session_id: String, sub_agent_id: String },
    SubAgentResult { child_session_id: String, content: String },
    SubAgentError { child_session_id: String, message: String },
    GuardrailBlocked { threat: f64, reasons: Vec<String> },
    ContextTruncated { dropped: usize, strategy: String },
    SummaryCreated { summary_message_id: String, covered: usize },
    RoutingHandover { correlation_id: String, from_kind: String, to_kind: String },
    TaskFailed { task_id: String, reason: String },
    QueueOverflow { agent_id: String },
    Cancelled,
}

/// One entry in a session's append-only event stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentEvent {
    pub event_id: u64,
    pub session_id: String,
    pub agent_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub kind: EventKind,
}
