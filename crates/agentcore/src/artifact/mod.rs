//! Content-addressed store for offloaded tool outputs, plus the four
//! builtin tools (`read_artifact`, `tail_artifact`, `search_artifact`,
//! `list_artifacts`) that let the model retrieve full content on demand.

use agentcore_types::ArtifactRef;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use time::OffsetDateTime;

mod builtins;
pub use builtins::register_artifact_tools;

struct StoredArtifact {
    refs: ArtifactRef,
    bytes: Vec<u8>,
}

/// Content-addressed artifact store. `put` is idempotent under content
/// hash: offloading the same bytes twice yields the same `artifact_id`.
pub struct ArtifactStore {
    max_preview_tokens: usize,
    artifacts: RwLock<HashMap<String, StoredArtifact>>,
    /// session_id -> artifact_ids, insertion order, for `list`.
    by_session: RwLock<HashMap<String, Vec<String>>>,
}

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("artifact not found: {0}")]
    NotFound(String),
}

impl ArtifactStore {
    pub fn new(max_preview_tokens: usize) -> Self {
        Self {
            max_preview_tokens,
            artifacts: RwLock::new(HashMap::new()),
            by_session: RwLock::new(HashMap::new()),
        }
    }

    fn content_id(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        format!("{:x}", hasher.finalize())
    }

    /// Store `bytes`, returning an `ArtifactRef` whose `token_estimate`
    /// is pinned to `max_preview_tokens` regardless of the payload's real
    /// size. Newline-aware truncation with an ellipsis marker builds the
    /// preview.
    pub fn put(&self, session_id: &str, bytes: Vec<u8>, mime_hint: Option<String>) -> ArtifactRef {
        let artifact_id = Self::content_id(&bytes);

        if let Some(existing) = self.artifacts.read().get(&artifact_id) {
            return existing.refs.clone();
        }

        let text = String::from_utf8_lossy(&bytes);
        let preview = truncate_preview(&text, self.max_preview_tokens);

        let refs = ArtifactRef {
            artifact_id: artifact_id.clone(),
            session_id: session_id.to_string(),
            created_at: OffsetDateTime::now_utc(),
            size_bytes: bytes.len(),
            token_estimate: self.max_preview_tokens,
            preview,
            mime_hint,
        };

        self.artifacts.write().insert(
            artifact_id.clone(),
            StoredArtifact {
                refs: refs.clone(),
                bytes,
            },
        );
        self.by_session
            .write()
            .entry(session_id.to_string())
            .or_default()
            .push(artifact_id);

        refs
    }

    pub fn read(&self, artifact_id: &str) -> Result<Vec<u8>, ArtifactError> {
        self.artifacts
            .read()
            .get(artifact_id)
            .map(|a| a.bytes.clone())
            .ok_or_else(|| ArtifactError::NotFound(artifact_id.to_string()))
    }

    pub fn tail(&self, artifact_id: &str, n_lines: usize) -> Result<String, ArtifactError> {
        let bytes = self.read(artifact_id)?;
        let text = String::from_utf8_lossy(&bytes);
        let lines: Vec<&str> = text.lines().collect();
        let start = lines.len().saturating_sub(n_lines);
        Ok(lines[start..].join("\n"))
    }

    /// Case-insensitive substring search, capped at 100 hits, returning
    /// `(offset, line)` pairs.
    pub fn search(&self, artifact_id: &str, query: &str) -> Result<Vec<(usize, String)>, ArtifactError> {
        let bytes = self.read(artifact_id)?;
        let text = String::from_utf8_lossy(&bytes);
        let query_lower = query.to_lowercase();
        let mut hits = Vec::new();
        for (offset, line) in text.lines().enumerate() {
            if line.to_lowercase().contains(&query_lower) {
                hits.push((offset, line.to_string()));
                if hits.len() >= 100 {
                    break;
                }
            }
        }
        Ok(hits)
    }

    pub fn list(&self, session_id: &str) -> Vec<ArtifactRef> {
        let by_session = self.by_session.read();
        let artifacts = self.artifacts.read();
        by_session
            .get(session_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| artifacts.get(id).map(|a| a.refs.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn truncate_preview(text: &str, max_tokens: usize) -> String {
    let max_chars = max_tokens.saturating_mul(4);
    if text.len() <= max_chars {
        return text.to_string();
    }
    // Newline-aware: cut at the last newline before the char budget so the
    // preview doesn't end mid-line.
    let cut = &text[..max_chars];
    let cut = match cut.rfind('\n') {
        Some(idx) if idx > 0 => &cut[..idx],
        _ => cut,
    };
    format!("{cut}\n... [truncated]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_is_idempotent_under_content_hash() {
        let store = ArtifactStore::new(50);
        let r1 = store.put("s1", b"hello world".to_vec(), None);
        let r2 = store.put("s1", b"hello world".to_vec(), None);
        assert_eq!(r1.artifact_id, r2.artifact_id);
    }

    #[test]
    fn put_then_read_round_trips_original_bytes() {
        let store = ArtifactStore::new(50);
        let original = b"the quick brown fox".to_vec();
        let refs = store.put("s1", original.clone(), None);
        assert_eq!(store.read(&refs.artifact_id).unwrap(), original);
    }

    #[test]
    fn token_estimate_is_pinned_to_max_preview_tokens() {
        let store = ArtifactStore::new(50);
        let refs = store.put("s1", vec![b'a'; 100_000], None);
        assert_eq!(refs.token_estimate, 50);
    }

    #[test]
    fn tail_returns_last_n_lines() {
        let store = ArtifactStore::new(50);
        let refs = store.put("s1", b"l1\nl2\nl3\nl4".to_vec(), None);
        assert_eq!(store.tail(&refs.artifact_id, 2).unwrap(), "l3\nl4");
    }

    #[test]
    fn search_is_case_insensitive_and_returns_offsets() {
        let store = ArtifactStore::new(50);
        let refs = store.put("s1", b"Alpha\nBeta\nALPHA again".to_vec(), None);
        let hits = store.search(&refs.artifact_id, "alpha").unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, 0);
        assert_eq!(hits[1].0, 2);
    }

    #[test]
    fn list_returns_artifacts_for_session_only() {
        let store = ArtifactStore::new(50);
        store.put("s1", b"a".to_vec(), None);
        store.put("s2", b"b".to_vec(), None);
        assert_eq!(store.list("s1").len(), 1);
        assert_eq!(store.list("s2").len(), 1);
    }

    #[test]
    fn read_missing_artifact_errors() {
        let store = ArtifactStore::new(50);
        assert!(matches!(store.read("missing"), Err(ArtifactError::NotFound(_))));
    }
}
