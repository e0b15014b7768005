use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// One durable conversation thread between a user and an agent.
///
/// `summary_cursor` is the highest message id already covered by the
/// session's rolling summary; `total_tokens_estimate` tracks the active
/// view's token footprint so `ContextManager` can skip a budget pass when
/// clearly under threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub agent_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_activity: OffsetDateTime,
    pub summary_cursor: Option<String>,
    pub total_tokens_estimate: usize,
}

impl Session {
    pub fn new(agent_id: impl Into<String>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            session_id: Uuid::new_v4().to_string(),
            agent_id: agent_id.into(),
            created_at: now,
            last_activity: now,
            summary_cursor: None,
            total_tokens_estimate: 0,
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = OffsetDateTime::now_utc();
    }
}
