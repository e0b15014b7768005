use crate::error::StoreError;
use crate::stream::StreamStore;
use agentcore_types::AgentEvent;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// In-memory append-only event log, one `Vec<AgentEvent>` per stream name.
#[derive(Default)]
pub struct InMemoryStreamStore {
    streams: RwLock<HashMap<String, Vec<AgentEvent>>>,
}

impl InMemoryStreamStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StreamStore for InMemoryStreamStore {
    async fn append(&self, stream: &str, event: AgentEvent) -> Result<(), StoreError> {
        self.streams
            .write()
            .entry(stream.to_string())
            .or_default()
            .push(event);
        Ok(())
    }

    async fn read(
        &self,
        stream: &str,
        after_id: u64,
        limit: usize,
    ) -> Result<Vec<AgentEvent>, StoreError> {
        let streams = self.streams.read();
        Ok(streams
            .get(stream)
            .map(|events| {
                events
                    .iter()
                    .filter(|e| e.event_id > after_id)
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn tail(&self, stream: &str) -> Result<Vec<AgentEvent>, StoreError> {
        Ok(self.streams.read().get(stream).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentcore_types::EventKind;
    use time::OffsetDateTime;

    fn ev(id: u64) -> AgentEvent {
        AgentEvent {
            event_id: id,
            session_id: "s1".into(),
            agent_id: "a1".into(),
            timestamp: OffsetDateTime::now_utc(),
            kind: EventKind::Cancelled,
        }
    }

    #[tokio::test]
    async fn append_then_tail_preserves_order() {
        let store = InMemoryStreamStore::new();
        for id in 1..=3 {
            store.append("evt:s1", ev(id)).await.unwrap();
        }
        let tail = store.tail("evt:s1").await.unwrap();
        let ids: Vec<u64> = tail.iter().map(|e| e.event_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn read_after_id_is_exclusive() {
        let store = InMemoryStreamStore::new();
        for id in 1..=5 {
            store.append("evt:s1", ev(id)).await.unwrap();
        }
        let page = store.read("evt:s1", 2, 10).await.unwrap();
        let ids: Vec<u64> = page.iter().map(|e| e.event_id).collect();
        assert_eq!(ids, vec![3, 4, 5]);
    }
}
