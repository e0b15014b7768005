use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Role of a message in a session's active view.
///
/// `Summary` messages are produced by `MemorySummarizer`/`ContextManager`
/// and supersede one or more earlier messages (see [`Message::supersedes_ids`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
    Summary,
}

/// A single tool call requested by the model within an assistant turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// An append-only conversation entry.
///
/// Ordering within a session is `(session_id, created_at, id)`, monotonic.
/// `active = false` marks an entry superseded by a `summary` message; it is
/// never deleted unless the summarizer's retention policy is `delete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub session_id: String,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub token_estimate: usize,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supersedes_ids: Option<Vec<String>>,
}

impl Message {
    /// Build a new active message with a fresh id and the current timestamp.
    ///
    /// `token_estimate` uses the same conservative `len/4` heuristic as
    /// `ArtifactStore` so budgets computed from messages and from artifact
    /// previews are directly comparable.
    pub fn new(session_id: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        let content = content.into();
        let token_estimate = content.len().saturating_div(4).max(1);
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
            created_at: OffsetDateTime::now_utc(),
            token_estimate,
            active: true,
            supersedes_ids: None,
        }
    }

    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    pub fn with_tool_call_id(mut self, id: impl Into<String>) -> Self {
        self.tool_call_id = Some(id.into());
        self
    }

    pub fn summary_of(
        session_id: impl Into<String>,
        content: impl Into<String>,
        supersedes_ids: Vec<String>,
    ) -> Self {
        let mut msg = Self::new(session_id, Role::Summary, content);
        msg.supersedes_ids = Some(supersedes_ids);
        msg
    }

    /// A tool-call message is always immediately followed by its tool-result
    /// messages. This returns true for assistant messages that carry calls.
    pub fn opens_tool_pair(&self) -> bool {
        self.role == Role::Assistant && !self.tool_calls.is_empty()
    }

    pub fn closes_tool_pair(&self) -> bool {
        self.role == Role::Tool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_message_is_active_with_estimated_tokens() {
        let msg = Message::new("s1", Role::User, "hello world");
        assert!(msg.active);
        assert_eq!(msg.token_estimate, "hello world".len() / 4);
        assert_eq!(msg.session_id, "s1");
    }

    #[test]
    fn summary_of_marks_supersession() {
        let msg = Message::summary_of("s1", "condensed", vec!["a".into(), "b".into()]);
        assert_eq!(msg.role, Role::Summary);
        assert_eq!(msg.supersedes_ids.unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn tool_pair_detection() {
        let call = ToolCall {
            id: "c1".into(),
            name: "add".into(),
            arguments: serde_json::json!({"a": 1, "b": 2}),
        };
        let opener = Message::new("s1", Role::Assistant, "").with_tool_calls(vec![call]);
        assert!(opener.opens_tool_pair());

        let closer = Message::new("s1", Role::Tool, "3").with_tool_call_id("c1");
        assert!(closer.closes_tool_pair());
    }
}
