use serde::{Deserialize, Serialize};

/// A background task fires on exactly one of these triggers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Schedule {
    Interval { seconds: u64 },
    Cron { expression: String },
}

/// Configuration for a recurring background agent task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    pub agent_id: String,
    pub query: String,
    pub schedule: Schedule,
    pub timeout_s: u64,
    pub max_retries: u32,
    pub retry_delay_s: u64,
    pub queue_size: usize,
    pub session_id: Option<String>,
}

impl TaskConfig {
    pub fn interval(agent_id: impl Into<String>, query: impl Into<String>, seconds: u64) -> Self {
        Self {
            agent_id: agent_id.into(),
            query: query.into(),
            schedule: Schedule::Interval { seconds },
            timeout_s: 30,
            max_retries: 0,
            retry_delay_s: 0,
            queue_size: 16,
            session_id: None,
        }
    }
}
