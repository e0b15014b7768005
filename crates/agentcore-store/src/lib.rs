//! Pluggable storage capabilities: `KVStore` for session/message persistence,
//! `StreamStore` for append-only event logs. Each capability ships an
//! in-memory implementation (tests, ephemeral agents) and a SQLite-backed
//! one (durable single-process agents), behind the same storage-agnostic
//! trait.

pub mod error;
pub mod kv;
pub mod memory_kv;
pub mod memory_stream;
pub mod sqlite_kv;
pub mod sqlite_stream;
pub mod stream;

pub use error::StoreError;
pub use kv::KVStore;
pub use memory_kv::InMemoryKvStore;
pub use memory_stream::InMemoryStreamStore;
pub use sqlite_kv::SqliteKvStore;
pub use sqlite_stream::SqliteStreamStore;
pub use stream::StreamStore;

/// Tag identifying a concrete backend kind, used by the routers to report
/// `current_kind()` and to validate `switch_to` requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    InMemory,
    Sqlite,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::InMemory => write!(f, "in_memory"),
            BackendKind::Sqlite => write!(f, "sqlite"),
        }
    }
}
