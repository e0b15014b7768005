use crate::error::StoreError;
use crate::stream::StreamStore;
use agentcore_types::AgentEvent;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// SQLite-backed `StreamStore`: events are appended as JSON blobs keyed by
/// `(stream, event_id)`.
#[derive(Clone)]
pub struct SqliteStreamStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStreamStore {
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection, rusqlite::Error> {
            let conn = Connection::open(path)?;
            conn.execute(
                "CREATE TABLE IF NOT EXISTS stream_events (
                    stream TEXT NOT NULL,
                    event_id INTEGER NOT NULL,
                    payload TEXT NOT NULL,
                    PRIMARY KEY (stream, event_id)
                )",
                [],
            )?;
            Ok(conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))??;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub async fn connect_in_memory() -> Result<Self, StoreError> {
        Self::connect(":memory:").await
    }
}

#[async_trait]
impl StreamStore for SqliteStreamStore {
    async fn append(&self, stream: &str, event: AgentEvent) -> Result<(), StoreError> {
        let conn = self.conn.clone();
        let stream = stream.to_string();
        let event_id = event.event_id as i64;
        let payload = serde_json::to_string(&event)?;
        tokio::task::spawn_blocking(move || -> Result<(), rusqlite::Error> {
            let conn = conn.lock().unwrap();
            conn.execute(
                "INSERT INTO stream_events (stream, event_id, payload) VALUES (?1, ?2, ?3)",
                params![stream, event_id, payload],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))??;
        Ok(())
    }

    async fn read(
        &self,
        stream: &str,
        after_id: u64,
        limit: usize,
    ) -> Result<Vec<AgentEvent>, StoreError> {
        let conn = self.conn.clone();
        let stream = stream.to_string();
        let rows = tokio::task::spawn_blocking(move || -> Result<Vec<String>, rusqlite::Error> {
            let conn = conn.lock().unwrap();
            let mut stmt = conn.prepare(
                "SELECT payload FROM stream_events WHERE stream = ?1 AND event_id > ?2
                 ORDER BY event_id ASC LIMIT ?3",
            )?;
            let rows = stmt
                .query_map(
                    params![stream, after_id as i64, limit as i64],
                    |row| row.get::<_, String>(0),
                )?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))??;
        rows.into_iter()
            .map(|payload| serde_json::from_str(&payload).map_err(StoreError::from))
            .collect()
    }

    async fn tail(&self, stream: &str) -> Result<Vec<AgentEvent>, StoreError> {
        self.read(stream, 0, usize::MAX).await
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
        let store = SqliteStreamStore::connect_in_memory().await.unwrap();
        for id in 1..=3 {
            store.append("evt:s1", ev(id)).await.unwrap();
        }
        let tail = store.tail("evt:s1").await.unwrap();
        let ids: Vec<u64> = tail.iter().map(|e| e.event_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
