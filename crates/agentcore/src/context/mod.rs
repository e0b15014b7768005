//! Pre-LLM-call context engineering: walks the active message window each
//! turn and, once it crosses a configured threshold, either truncates the
//! oldest entries or collapses them into a summary message first.
//!
//! This is a distinct compaction layer from [`crate::memory::MemorySummarizer`]:
//! that one runs after persistence and shrinks what's durably stored: this
//! one runs immediately before assembling a prompt and only shrinks what
//! goes into that one call, never touching the store.

use crate::config::{ContextManagementConfig, ContextMode, ContextStrategy};
use crate::llm::{CompletionParams, LLMClient};
use agentcore_types::{AgentError, Message, Role};

/// Outcome of a context-management pass, including how many messages were
/// dropped so the caller can emit a `context_truncated` event.
pub struct ContextResult {
    pub messages: Vec<Message>,
    pub dropped: usize,
}

pub struct ContextManager {
    config: ContextManagementConfig,
}

impl ContextManager {
    pub fn new(config: ContextManagementConfig) -> Self {
        Self { config }
    }

    fn over_threshold(&self, active: &[&Message]) -> bool {
        match self.config.mode {
            ContextMode::TokenBudget => {
                let total: usize = active.iter().map(|m| m.token_estimate).sum();
                let limit = self.config.value * self.config.threshold_percent as usize / 100;
                total > limit
            }
            ContextMode::SlidingWindow => active.len() > self.config.value,
        }
    }

    /// Indices (into `history`, in original order) that are safe to drop:
    /// never the system instruction (role `System`, always first if
    /// present), never the newest `preserve_recent` entries, and never one
    /// half of an intact tool-call/tool-result pair.
    fn droppable_indices(&self, history: &[Message]) -> Vec<usize> {
        let n = history.len();
        if n == 0 {
            return Vec::new();
        }

        let protect_from = n.saturating_sub(self.config.preserve_recent);
        let mut droppable: Vec<bool> = (0..n)
            .map(|i| history[i].role != Role::System && i < protect_from)
            .collect();

        // Extend protection to cover intact tool-call/tool-result pairs: if
        // either half of a pair is protected, protect both.
        let mut i = 0;
        while i < n {
            if history[i].opens_tool_pair() {
                let mut j = i + 1;
                while j < n && history[j].closes_tool_pair() {
                    j += 1;
                }
                let pair_protected = (i..j).any(|k| !droppable[k]);
                if pair_protected {
                    for k in i..j {
                        droppable[k] = false;
                    }
                }
                i = j;
            } else {
                i += 1;
            }
        }

        (0..n).filter(|&i| droppable[i]).collect()
    }

    /// Run context management over `history` (oldest first). Active
    /// messages only are considered; inactive ones pass through untouched
    /// since a prior pass (or the summarizer) already excluded them from the
    /// prompt.
    pub async fn manage(&self, history: Vec<Message>, llm: &dyn LLMClient) -> Result<ContextResult, AgentError> {
        if !self.config.enabled {
            return Ok(ContextResult {
                messages: history,
                dropped: 0,
            });
        }

        let active: Vec<&Message> = history.iter().filter(|m| m.active).collect();
        if !self.over_threshold(&active) {
            return Ok(ContextResult {
                messages: history,
                dropped: 0,
            });
        }

        let droppable = self.droppable_indices(&history);
        if droppable.is_empty() {
            return Ok(ContextResult {
                messages: history,
                dropped: 0,
            });
        }

        match self.config.strategy {
            ContextStrategy::Truncate => {
                let drop_set: std::collections::HashSet<usize> = self.select_drop_set(&history, &droppable);
                let dropped = drop_set.len();
                let messages = history
                    .into_iter()
                    .enumerate()
                    .filter(|(i, _)| !drop_set.contains(i))
                    .map(|(_, m)| m)
                    .collect();
                Ok(ContextResult { messages, dropped })
            }
            ContextStrategy::SummarizeAndTruncate => {
                let drop_set: std::collections::HashSet<usize> = self.select_drop_set(&history, &droppable);
                if drop_set.is_empty() {
                    return Ok(ContextResult {
                        messages: history,
                        dropped: 0,
                    });
                }

                let transcript: Vec<String> = drop_set
                    .iter()
                    .filter_map(|&i| history.get(i))
                    .map(|m| format!("{:?}: {}", m.role, m.content))
                    .collect();
                let session_id = history.first().map(|m| m.session_id.clone()).unwrap_or_default();
                let request = Message::new(
                    &session_id,
                    Role::User,
                    format!(
                        "Summarize the following older conversation segment concisely:\n\n{}",
                        transcript.join("\n")
                    ),
                );

                let summary_message = match llm.complete(&[request], &[], &CompletionParams::default()).await {
                    Ok(response) => {
                        let text = response.text.unwrap_or_default();
                        Some(Message::summary_of(&session_id, text, Vec::new()))
                    }
                    Err(e) => {
                        log::warn!("in-loop summarization failed, falling back to pure truncation: {e}");
                        None
                    }
                };

                let dropped = drop_set.len();
                let mut messages: Vec<Message> = history
                    .into_iter()
                    .enumerate()
                    .filter(|(i, _)| !drop_set.contains(i))
                    .map(|(_, m)| m)
                    .collect();

                // Fall back to pure truncation (no summary message) if the
                // summarization call failed.
                if let Some(summary) = summary_message {
                    let insert_at = messages.iter().position(|m| m.role != Role::System).unwrap_or(0);
                    messages.insert(insert_at, summary);
                }

                Ok(ContextResult { messages, dropped })
            }
        }
    }

    /// Drop the oldest droppable entries first until back under threshold
    /// (token-budget mode) or until `preserve_recent` boundary is respected
    /// (sliding-window mode); in both cases this never drops more than
    /// `droppable` offers.
    fn select_drop_set(&self, history: &[Message], droppable: &[usize]) -> std::collections::HashSet<usize> {
        match self.config.mode {
            ContextMode::SlidingWindow => {
                let active_count = history.iter().filter(|m| m.active).count();
                let excess = active_count.saturating_sub(self.config.value);
                droppable.iter().take(excess).copied().collect()
            }
            ContextMode::TokenBudget => {
                let limit = self.config.value * self.config.threshold_percent as usize / 100;
                let mut total: usize = history.iter().filter(|m| m.active).map(|m| m.token_estimate).sum();
                let mut drop_set = std::collections::HashSet::new();
                for &idx in droppable {
                    if total <= limit {
                        break;
                    }
                    total = total.saturating_sub(history[idx].token_estimate);
                    drop_set.insert(idx);
                }
                drop_set
            }
        }
    }
}
