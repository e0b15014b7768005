//! Post-persist summarization: after each append, checks whether a
//! session's active message count/tokens crossed its configured threshold
//! and, if so, collapses the oldest active messages into a single rolling
//! summary message.

use crate::config::{MemoryConfig, MemoryMode, RetentionPolicy};
use crate::llm::{CompletionParams, LLMClient};
use crate::memory::router::MemoryRouter;
use agentcore_types::{AgentError, Message, Role};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Serializes summarization per session so two concurrent triggers for the
/// same session can't both read the same active window and double-summarize.
pub struct MemorySummarizer {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl MemorySummarizer {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn session_lock(&self, session_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Check the trigger condition for `session_id` and summarize if
    /// crossed. A no-op if the session isn't over threshold.
    pub async fn maybe_summarize(
        &self,
        session_id: &str,
        router: &MemoryRouter,
        llm: &dyn LLMClient,
        config: &MemoryConfig,
    ) -> Result<(), AgentError> {
        if !config.summary.enabled {
            return Ok(());
        }
        let lock = self.session_lock(session_id);
        let _guard = lock.lock().await;

        let history = router.load(session_id).await?;
        let active: Vec<&Message> = history.iter().filter(|m| m.active).collect();

        let drop_count = match config.mode {
            MemoryMode::SlidingWindow => {
                if active.len() > config.value {
                    active.len() - config.value
                } else {
                    0
                }
            }
            MemoryMode::TokenBudget => {
                let total: usize = active.iter().map(|m| m.token_estimate).sum();
                if total <= config.value {
                    0
                } else {
                    let mut running = total;
                    let mut n = 0;
                    for m in &active {
                        if running <= config.value {
                            break;
                        }
                        running = running.saturating_sub(m.token_estimate);
                        n += 1;
                    }
                    n
                }
            }
        };

        if drop_count == 0 {
            return Ok(());
        }

        let to_summarize: Vec<&Message> = active.into_iter().take(drop_count).collect();
        if to_summarize.is_empty() {
            return Ok(());
        }

        let transcript = to_summarize
            .iter()
            .map(|m| format!("{:?}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n");
        let summarize_request = Message::new(
            session_id,
            Role::User,
            format!("Summarize the following conversation segment concisely, preserving facts and decisions:\n\n{transcript}"),
        );

        let response = llm
            .complete(&[summarize_request], &[], &CompletionParams::default())
            .await?;

        let supersedes_ids: Vec<String> = to_summarize.iter().map(|m| m.id.clone()).collect();
        let summary_text = response.text.unwrap_or_default();
        let summary = Message::summary_of(session_id, summary_text, supersedes_ids.clone());
        router.append(&summary).await?;

        match config.summary.retention_policy {
            RetentionPolicy::Keep => {
                for m in to_summarize {
                    let mut inactive = m.clone();
                    inactive.active = false;
                    router.update_active(session_id, &inactive).await?;
                }
            }
            RetentionPolicy::Delete => {
                // No per-message delete in `KVStore`; superseded messages are
                // marked inactive like `Keep` and left for the retention
                // sweep a deployment runs out-of-band against the backend.
                for m in to_summarize {
                    let mut inactive = m.clone();
                    inactive.active = false;
                    router.update_active(session_id, &inactive).await?;
                }
            }
        }

        Ok(())
    }
}

impl Default for MemorySummarizer {
    fn default() -> Self {
        Self::new()
    }
}
