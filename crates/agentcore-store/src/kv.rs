use crate::error::StoreError;
use async_trait::async_trait;

/// Generic ordered key-value capability. Keys are opaque UTF-8 strings;
/// `MemoryRouter` layers session/message semantics on top by encoding keys
/// as `s/<session_id>/msg/<id>`.
#[async_trait]
pub trait KVStore: Send + Sync {
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Keys with the given `prefix`, lexicographically greater than `from`
    /// (exclusive), up to `limit` entries, in ascending key order.
    async fn range(
        &self,
        prefix: &str,
        from: &str,
        limit: usize,
    ) -> Result<Vec<(String, Vec<u8>)>, StoreError>;

    /// Delete every key under `prefix`.
    async fn delete(&self, prefix: &str) -> Result<(), StoreError>;

    /// All keys under `prefix`, ascending.
    async fn scan_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}
