//! Public facade: one `AgentCore` owns a memory router, event router, tool
//! registry, artifact store, guardrail, and context manager, and serializes
//! concurrent calls against the same session behind a per-session mutex.

use crate::artifact::{register_artifact_tools, ArtifactStore};
use crate::config::AgentConfig;
use crate::context::ContextManager;
use crate::events::EventRouter;
use crate::guardrail::Guardrail;
use crate::llm::LLMClient;
use crate::config::MemoryToolBackend;
use crate::memory::{register_memory_tools, MemoryRouter, MemoryScratchpad, MemorySummarizer};
use crate::reasoning::{ReasoningEngine, RunContext};
use crate::tools::ToolRegistry;
use agentcore_store::BackendKind;
use agentcore_types::{AgentError, AgentEvent, AgentMetrics, EventKind, Message, Role};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

pub struct RunResult {
    pub session_id: String,
    pub answer: String,
    /// Set when the final answer's store append kept failing after the
    /// spec's retry/backoff sequence: the answer is still returned, but the
    /// session is dirty until a later append succeeds.
    pub persist_error: bool,
}

/// Agent execution core. Cheap to clone (everything inside is `Arc`-backed),
/// so multiple callers can hold their own handle to the same running agent.
#[derive(Clone)]
pub struct AgentCore {
    agent_id: String,
    config: Arc<AgentConfig>,
    llm: Arc<dyn LLMClient>,
    memory: Arc<MemoryRouter>,
    events: Arc<EventRouter>,
    tools: Arc<ToolRegistry>,
    artifacts: Arc<ArtifactStore>,
    guardrail: Arc<Guardrail>,
    context_manager: Arc<ContextManager>,
    summarizer: Arc<MemorySummarizer>,
    metrics: Arc<Mutex<AgentMetrics>>,
    /// One mutex per session, so concurrent `run` calls against different
    /// sessions proceed in parallel while same-session calls serialize.
    session_locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl AgentCore {
    pub fn new(agent_id: impl Into<String>, config: AgentConfig, llm: Arc<dyn LLMClient>) -> Self {
        let artifacts = Arc::new(ArtifactStore::new(config.tool_offload.max_preview_tokens));
        let tools = Arc::new(ToolRegistry::new());
        if config.tool_offload.enabled {
            // Registration failure here would only happen on a duplicate
            // name, which cannot occur against a brand new registry.
            let _ = register_artifact_tools(&tools, artifacts.clone());
        }
        if config.memory_tool_backend == MemoryToolBackend::Local {
            let _ = register_memory_tools(&tools, Arc::new(MemoryScratchpad::new()));
        }

        Self {
            agent_id: agent_id.into(),
            guardrail: Arc::new(Guardrail::new(config.guardrail_config.clone())),
            context_manager: Arc::new(ContextManager::new(config.context_management.clone())),
            config: Arc::new(config),
            llm,
            memory: Arc::new(MemoryRouter::new_in_memory()),
            events: Arc::new(EventRouter::new_in_memory()),
            tools,
            artifacts,
            summarizer: Arc::new(MemorySummarizer::new()),
            metrics: Arc::new(Mutex::new(AgentMetrics::default())),
            session_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn list_tools(&self) -> Vec<agentcore_types::ToolDescriptor> {
        self.tools.descriptors()
    }

    fn session_lock(&self, session_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.session_locks
            .lock()
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Run one turn of the reasoning loop against `session_id` (a fresh one
    /// is created if `None`). Calls against the same session serialize;
    /// calls against different sessions run concurrently.
    pub async fn run(&self, query: impl Into<String>, session_id: Option<String>) -> Result<RunResult, AgentError> {
        self.run_delegated(query, session_id, 0, None).await
    }

    /// Entry point shared by the public `run` (depth 0, no inherited
    /// deadline) and a `sub_agent` tool dispatching into this agent as a
    /// child (depth = parent + 1, deadline = parent turn's remaining
    /// budget). Exposed crate-wide so [`crate::delegation`] can reach it.
    pub(crate) async fn run_delegated(
        &self,
        query: impl Into<String>,
        session_id: Option<String>,
        delegation_depth: usize,
        deadline: Option<std::time::Instant>,
    ) -> Result<RunResult, AgentError> {
        let query = query.into();
        let session_id = session_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let lock = self.session_lock(&session_id);
        let _guard = lock.lock().await;

        let started = std::time::Instant::now();
        let result = self.run_locked(&query, &session_id, delegation_depth, deadline).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let mut metrics = self.metrics.lock();
        metrics.record_request(elapsed_ms, result.is_err());
        drop(metrics);

        result
    }

    pub(crate) fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub(crate) fn events_handle(&self) -> Arc<EventRouter> {
        self.events.clone()
    }

    pub(crate) fn metrics_handle(&self) -> Arc<Mutex<AgentMetrics>> {
        self.metrics.clone()
    }

    pub(crate) fn max_delegation_depth(&self) -> usize {
        self.config.max_delegation_depth
    }

    async fn run_locked(
        &self,
        query: &str,
        session_id: &str,
        delegation_depth: usize,
        deadline: Option<std::time::Instant>,
    ) -> Result<RunResult, AgentError> {
        if self.config.request_limit > 0 && self.metrics.lock().requests >= self.config.request_limit {
            return Err(AgentError::BudgetExceeded {
                reason: format!("request_limit ({}) reached", self.config.request_limit),
            });
        }

        if let Err(err) = self.guardrail.check(query) {
            if let AgentError::GuardrailBlocked { threat, ref reasons } = err {
                self.events
                    .publish(
                        session_id,
                        &self.agent_id,
                        EventKind::GuardrailBlocked {
                            threat,
                            reasons: reasons.clone(),
                        },
                    )
                    .await
                    .ok();
            }
            return Err(err);
        }

        self.events
            .publish(session_id, &self.agent_id, EventKind::UserMessage { content: query.to_string() })
            .await?;
        let user_msg = Message::new(session_id, Role::User, query.to_string());
        self.memory.append(&user_msg).await?;

        let engine = ReasoningEngine::new((*self.config).clone());
        let outcome = engine
            .run(
                RunContext {
                    session_id: session_id.to_string(),
                    agent_id: self.agent_id.clone(),
                    memory: &self.memory,
                    events: &self.events,
                    tools: &self.tools,
                    llm: self.llm.as_ref(),
                    artifacts: &self.artifacts,
                    guardrail: &self.guardrail,
                    context_manager: &self.context_manager,
                    delegation_depth,
                    deadline,
                },
                query,
            )
            .await?;

        {
            let mut metrics = self.metrics.lock();
            metrics.record_tokens(outcome.input_tokens, outcome.output_tokens);
            for _ in 0..outcome.tool_calls_made {
                metrics.record_tool_call();
            }
        }

        self.summarizer
            .maybe_summarize(session_id, &self.memory, self.llm.as_ref(), &self.config.memory_config)
            .await?;

        Ok(RunResult {
            session_id: session_id.to_string(),
            answer: outcome.final_answer,
            persist_error: outcome.persist_error,
        })
    }

    /// Replay the live event stream for `session_id` from `after_event_id`.
    pub async fn stream_events(&self, session_id: &str, after_event_id: u64) -> Result<Vec<AgentEvent>, AgentError> {
        self.events.stream(session_id, after_event_id).await
    }

    pub async fn get_session_history(&self, session_id: &str) -> Result<Vec<Message>, AgentError> {
        self.memory.load(session_id).await
    }

    pub async fn clear_session(&self, session_id: &str) -> Result<(), AgentError> {
        self.memory.clear(session_id).await
    }

    pub async fn switch_memory(&self, kind: BackendKind, sqlite_path: Option<&str>) -> Result<(), AgentError> {
        self.memory.switch_to(kind, sqlite_path).await
    }

    pub async fn switch_events(&self, kind: BackendKind, sqlite_path: Option<&str>) -> Result<(), AgentError> {
        self.events.switch_to(kind, sqlite_path).await
    }

    pub fn get_metrics(&self) -> AgentMetrics {
        *self.metrics.lock()
    }

    /// Expose `child` to this agent's reasoning loop as a `sub_agent` tool
    /// named `delegate_<child.agent_id>`. Invocations refuse to recurse past
    /// `max_delegation_depth`, inherit the parent turn's remaining deadline,
    /// and fold the child's metrics into this agent's on return.
    pub fn register_sub_agent(&self, child: Arc<AgentCore>) -> Result<(), AgentError> {
        crate::delegation::register_sub_agent_tool(self, child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LLMResponse, Usage};
    use crate::test_support::ScriptedLLMClient;

    #[tokio::test]
    async fn run_persists_turn_and_returns_answer() {
        let llm = Arc::new(ScriptedLLMClient::new(vec![LLMResponse {
            text: Some("42".into()),
            tool_calls: vec![],
            usage: Usage::default(),
        }]));
        let agent = AgentCore::new("a1", AgentConfig::default(), llm);

        let result = agent.run("what is the answer", None).await.unwrap();
        assert_eq!(result.answer, "42");

        let history = agent.get_session_history(&result.session_id).await.unwrap();
        assert_eq!(history.len(), 2); // user turn + assistant answer
    }

    #[tokio::test]
    async fn clear_session_empties_history() {
        let llm = Arc::new(ScriptedLLMClient::new(vec![LLMResponse {
            text: Some("ok".into()),
            tool_calls: vec![],
            usage: Usage::default(),
        }]));
        let agent = AgentCore::new("a1", AgentConfig::default(), llm);
        let result = agent.run("hello", None).await.unwrap();

        agent.clear_session(&result.session_id).await.unwrap();
        let history = agent.get_session_history(&result.session_id).await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn switch_memory_preserves_history_across_backends() {
        let llm = Arc::new(ScriptedLLMClient::new(vec![LLMResponse {
            text: Some("ok".into()),
            tool_calls: vec![],
            usage: Usage::default(),
        }]));
        let agent = AgentCore::new("a1", AgentConfig::default(), llm);
        let result = agent.run("hello", None).await.unwrap();

        agent.switch_memory(BackendKind::Sqlite, Some(":memory:")).await.unwrap();

        let history = agent.get_session_history(&result.session_id).await.unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn metrics_track_request_count() {
        let llm = Arc::new(ScriptedLLMClient::new(vec![LLMResponse {
            text: Some("ok".into()),
            tool_calls: vec![],
            usage: Usage::default(),
        }]));
        let agent = AgentCore::new("a1", AgentConfig::default(), llm);
        agent.run("hello", None).await.unwrap();
        assert_eq!(agent.get_metrics().requests, 1);
    }

    #[tokio::test]
    async fn request_limit_aborts_once_reached() {
        let llm = Arc::new(ScriptedLLMClient::new(vec![
            LLMResponse {
                text: Some("one".into()),
                tool_calls: vec![],
                usage: Usage::default(),
            },
            LLMResponse {
                text: Some("two".into()),
                tool_calls: vec![],
                usage: Usage::default(),
            },
        ]));
        let mut config = AgentConfig::default();
        config.request_limit = 1;
        let agent = AgentCore::new("a1", config, llm);

        agent.run("first", None).await.unwrap();
        let err = agent.run("second", None).await.unwrap_err();
        assert!(matches!(err, AgentError::BudgetExceeded { .. }));
    }

    #[tokio::test]
    async fn local_memory_tool_backend_registers_remember_and_recall() {
        let llm = Arc::new(ScriptedLLMClient::new(vec![LLMResponse {
            text: Some("ok".into()),
            tool_calls: vec![],
            usage: Usage::default(),
        }]));
        let mut config = AgentConfig::default();
        config.memory_tool_backend = crate::config::MemoryToolBackend::Local;
        let agent = AgentCore::new("a1", config, llm);

        let names: Vec<String> = agent.list_tools().into_iter().map(|d| d.name).collect();
        assert!(names.contains(&"remember".to_string()));
        assert!(names.contains(&"recall".to_string()));
        assert!(names.contains(&"list_memory".to_string()));
    }
}
