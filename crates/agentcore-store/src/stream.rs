use crate::error::StoreError;
use agentcore_types::AgentEvent;
use async_trait::async_trait;

/// Append-only event log capability backing `EventRouter`.
#[async_trait]
pub trait StreamStore: Send + Sync {
    async fn append(&self, stream: &str, event: AgentEvent) -> Result<(), StoreError>;

    /// Events in `stream` with `event_id > after_id`, oldest first, capped
    /// at `limit`.
    async fn read(
        &self,
        stream: &str,
        after_id: u64,
        limit: usize,
    ) -> Result<Vec<AgentEvent>, StoreError>;

    /// All events currently in `stream`, oldest first.
    async fn tail(&self, stream: &str) -> Result<Vec<AgentEvent>, StoreError>;
}
