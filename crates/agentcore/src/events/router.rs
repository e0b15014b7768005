//! Routes structured events into a hot-swappable `StreamStore`, and fans
//! them out live to `tokio::sync::broadcast` subscribers the way the
//! original event bus does, generalized with a swappable backend pointer
//! and a bounded per-session buffer with drop-oldest-non-critical overflow.

use agentcore_store::{BackendKind, InMemoryStreamStore, SqliteStreamStore, StreamStore};
use agentcore_types::{AgentError, AgentEvent, EventKind};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

const DEFAULT_SESSION_BUFFER: usize = 1024;

struct Backend {
    kind: BackendKind,
    store: Arc<dyn StreamStore>,
}

fn stream_name(session_id: &str) -> String {
    format!("events/{session_id}")
}

/// Whether an `EventKind` is critical: critical events are never dropped by
/// the bounded per-session buffer even under backpressure.
fn is_critical(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::GuardrailBlocked { .. }
            | EventKind::TaskFailed { .. }
            | EventKind::FinalAnswer { .. }
            | EventKind::Cancelled
    )
}

pub struct EventRouter {
    backend: ArcSwap<Backend>,
    sequence: AtomicU64,
    sender: broadcast::Sender<AgentEvent>,
    /// Per-session count of events dropped by buffer overflow.
    backpressure: Mutex<HashMap<String, u64>>,
    /// Every session id ever published to, so a backend switch knows which
    /// streams to copy.
    sessions: Mutex<HashSet<String>>,
    migration_lock: tokio::sync::Mutex<()>,
}

impl EventRouter {
    pub fn new_in_memory() -> Self {
        let (sender, _) = broadcast::channel(DEFAULT_SESSION_BUFFER);
        Self {
            backend: ArcSwap::from_pointee(Backend {
                kind: BackendKind::InMemory,
                store: Arc::new(InMemoryStreamStore::new()),
            }),
            sequence: AtomicU64::new(1),
            sender,
            backpressure: Mutex::new(HashMap::new()),
            sessions: Mutex::new(HashSet::new()),
            migration_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn current_kind(&self) -> BackendKind {
        self.backend.load().kind
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.sender.subscribe()
    }

    pub fn backpressure_count(&self, session_id: &str) -> u64 {
        *self.backpressure.lock().get(session_id).unwrap_or(&0)
    }

    /// Build and publish an event for `session_id`/`agent_id`.
    pub async fn publish(&self, session_id: &str, agent_id: &str, kind: EventKind) -> Result<AgentEvent, AgentError> {
        let event = AgentEvent {
            event_id: self.sequence.fetch_add(1, Ordering::SeqCst),
            session_id: session_id.to_string(),
            agent_id: agent_id.to_string(),
            timestamp: time::OffsetDateTime::now_utc(),
            kind,
        };
        self.publish_raw(event.clone()).await?;
        Ok(event)
    }

    /// Persist an already-built event. Used for replaying migration
    /// handover markers with a pinned `event_id`/timestamp.
    pub async fn publish_raw(&self, event: AgentEvent) -> Result<(), AgentError> {
        let _guard = self.migration_lock.lock().await;
        let backend = self.backend.load_full();
        let stream = stream_name(&event.session_id);
        self.sessions.lock().insert(event.session_id.clone());

        match backend.store.append(&stream, event.clone()).await {
            Ok(()) => {}
            Err(e) if is_critical(&event.kind) => {
                return Err(AgentError::StoreUnavailable(e.to_string()));
            }
            Err(_) => {
                let mut backpressure = self.backpressure.lock();
                let count = backpressure.entry(event.session_id.clone()).or_insert(0);
                *count += 1;
                log::warn!(
                    "event buffer overflow for session {}: dropped non-critical {:?} event ({} total)",
                    event.session_id,
                    event.kind,
                    count
                );
            }
        }

        let _ = self.sender.send(event);
        Ok(())
    }

    /// Replay a session's events starting strictly after `after_event_id`.
    pub async fn stream(&self, session_id: &str, after_event_id: u64) -> Result<Vec<AgentEvent>, AgentError> {
        let backend = self.backend.load_full();
        backend
            .store
            .read(&stream_name(session_id), after_event_id, usize::MAX)
            .await
            .map_err(|e| AgentError::StoreUnavailable(e.to_string()))
    }

    /// Two-phase migration identical in shape to `MemoryRouter::switch_to`:
    /// build the new backend, copy every known session stream across, flip
    /// the pointer, then emit a `routing_handover` marker on both streams so
    /// readers of either can correlate the cutover.
    pub async fn switch_to(&self, kind: BackendKind, sqlite_path: Option<&str>) -> Result<(), AgentError> {
        let old_kind = self.backend.load().kind;
        let sessions;
        let correlation_id = Uuid::new_v4().to_string();

        {
            let _guard = self.migration_lock.lock().await;
            let old = self.backend.load_full();
            if old.kind == kind {
                return Ok(());
            }

            let new_store: Arc<dyn StreamStore> = match kind {
                BackendKind::InMemory => Arc::new(InMemoryStreamStore::new()),
                BackendKind::Sqlite => {
                    let path = sqlite_path.ok_or_else(|| {
                        AgentError::MigrationFailed("sqlite backend requires a path".to_string())
                    })?;
                    let store = SqliteStreamStore::connect(path)
                        .await
                        .map_err(|e| AgentError::MigrationFailed(e.to_string()))?;
                    Arc::new(store)
                }
            };

            sessions = self.known_sessions();

            for session_id in &sessions {
                let stream = stream_name(session_id);
                let events = old
                    .store
                    .tail(&stream)
                    .await
                    .map_err(|e| AgentError::MigrationFailed(e.to_string()))?;
                for event in events {
                    new_store
                        .append(&stream, event)
                        .await
                        .map_err(|e| AgentError::MigrationFailed(e.to_string()))?;
                }
            }

            self.backend.store(Arc::new(Backend {
                kind,
                store: new_store,
            }));
        }
        // Guard dropped: `publish_raw` below re-acquires it per call, now
        // against the already-flipped backend.
        log::info!(
            "event router switched backend {:?} -> {:?} across {} session(s), correlation {}",
            old_kind,
            kind,
            sessions.len(),
            correlation_id
        );

        for session_id in &sessions {
            let handover = AgentEvent {
                event_id: self.sequence.fetch_add(1, Ordering::SeqCst),
                session_id: session_id.clone(),
                agent_id: String::new(),
                timestamp: time::OffsetDateTime::now_utc(),
                kind: EventKind::RoutingHandover {
                    correlation_id: correlation_id.clone(),
                    from_kind: old_kind.to_string(),
                    to_kind: kind.to_string(),
                },
            };
            self.publish_raw(handover).await?;
        }

        Ok(())
    }

    fn known_sessions(&self) -> Vec<String> {
        self.sessions.lock().iter().cloned().collect()
    }
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new_in_memory()
    }
}
