use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Handle to a large tool output offloaded to `ArtifactStore`.
///
/// `token_estimate` here is pinned to `max_preview_tokens` by contract,
/// independent of the artifact's real size, so a prompt's token budget
/// accounting never has to special-case offloaded content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub artifact_id: String,
    pub session_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub size_bytes: usize,
    pub token_estimate: usize,
    pub preview: String,
    pub mime_hint: Option<String>,
}
