use crate::error::StoreError;
use crate::kv::KVStore;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// SQLite-backed `KVStore`. A single connection guarded by a blocking
/// mutex, with every operation dispatched through `spawn_blocking` so it
/// never stalls the async runtime: simple, serialized-per-connection, but
/// cheap enough per call that concurrent sessions still interleave well.
#[derive(Clone)]
pub struct SqliteKvStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteKvStore {
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection, rusqlite::Error> {
            let conn = Connection::open(path)?;
            conn.execute(
                "CREATE TABLE IF NOT EXISTS kv (key TEXT PRIMARY KEY, value BLOB NOT NULL)",
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
impl KVStore for SqliteKvStore {
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let conn = self.conn.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), rusqlite::Error> {
            let conn = conn.lock().unwrap();
            conn.execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))??;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let conn = self.conn.clone();
        let key = key.to_string();
        let value = tokio::task::spawn_blocking(move || -> Result<Option<Vec<u8>>, rusqlite::Error> {
            let conn = conn.lock().unwrap();
            conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
        })
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))??;
        Ok(value)
    }

    async fn range(
        &self,
        prefix: &str,
        from: &str,
        limit: usize,
    ) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        let conn = self.conn.clone();
        let like = format!("{prefix}%");
        let cursor = if from.is_empty() {
            String::new()
        } else {
            format!("{prefix}{from}")
        };
        let rows = tokio::task::spawn_blocking(
            move || -> Result<Vec<(String, Vec<u8>)>, rusqlite::Error> {
                let conn = conn.lock().unwrap();
                let mut stmt = conn.prepare(
                    "SELECT key, value FROM kv WHERE key LIKE ?1 AND key > ?2
                     ORDER BY key ASC LIMIT ?3",
                )?;
                let rows = stmt
                    .query_map(params![like, cursor, limit as i64], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            },
        )
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))??;
        Ok(rows)
    }

    async fn delete(&self, prefix: &str) -> Result<(), StoreError> {
        let conn = self.conn.clone();
        let like = format!("{prefix}%");
        tokio::task::spawn_blocking(move || -> Result<(), rusqlite::Error> {
            let conn = conn.lock().unwrap();
            conn.execute("DELETE FROM kv WHERE key LIKE ?1", params![like])?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))??;
        Ok(())
    }

    async fn scan_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.clone();
        let like = format!("{prefix}%");
        let keys = tokio::task::spawn_blocking(move || -> Result<Vec<String>, rusqlite::Error> {
            let conn = conn.lock().unwrap();
            let mut stmt = conn.prepare("SELECT key FROM kv WHERE key LIKE ?1 ORDER BY key ASC")?;
            let keys = stmt
                .query_map(params![like], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(keys)
        })
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))??;
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = SqliteKvStore::connect_in_memory().await.unwrap();
        store.put("s/1/msg/a", b"hello".to_vec()).await.unwrap();
        assert_eq!(store.get("s/1/msg/a").await.unwrap().unwrap(), b"hello");
    }

    #[tokio::test]
    async fn put_overwrites_existing_key() {
        let store = SqliteKvStore::connect_in_memory().await.unwrap();
        store.put("k", b"v1".to_vec()).await.unwrap();
        store.put("k", b"v2".to_vec()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().unwrap(), b"v2");
    }

    #[tokio::test]
    async fn range_orders_and_paginates() {
        let store = SqliteKvStore::connect_in_memory().await.unwrap();
        for id in ["a", "b", "c"] {
            store
                .put(&format!("s/1/msg/{id}"), id.as_bytes().to_vec())
                .await
                .unwrap();
        }
        let page = store.range("s/1/msg/", "", 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].0, "s/1/msg/a");
    }
}
