//! The observe-think-act reasoning loop: assemble a prompt from the active
//! history, call the model, dispatch any requested tool calls concurrently,
//! persist the turn, and repeat until a final answer or a termination
//! condition fires.

use crate::artifact::ArtifactStore;
use crate::config::AgentConfig;
use crate::context::ContextManager;
use crate::events::EventRouter;
use crate::guardrail::Guardrail;
use crate::llm::{CompletionParams, LLMClient};
use crate::memory::MemoryRouter;
use crate::tools::context::ToolContext;
use crate::tools::ToolRegistry;
use agentcore_types::{AgentError, EventKind, Message, Role, ToolCall};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Tool-dispatch context for one reasoning-loop turn.
struct SessionToolContext {
    session_id: String,
    delegation_depth: usize,
    deadline: Option<Instant>,
}

impl ToolContext for SessionToolContext {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn delegation_depth(&self) -> usize {
        self.delegation_depth
    }

    fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

/// Everything the loop needs for one `run`, borrowed from `AgentCore`.
pub struct RunContext<'a> {
    pub session_id: String,
    pub agent_id: String,
    pub memory: &'a MemoryRouter,
    pub events: &'a EventRouter,
    pub tools: &'a ToolRegistry,
    pub llm: &'a dyn LLMClient,
    pub artifacts: &'a ArtifactStore,
    pub guardrail: &'a Guardrail,
    pub context_manager: &'a ContextManager,
    pub delegation_depth: usize,
    /// Deadline inherited from a parent turn, for sub-agent dispatch. `None`
    /// for a top-level run bounded only by `max_execution_time_s`.
    pub deadline: Option<Instant>,
}

pub struct RunOutcome {
    pub final_answer: String,
    pub steps_taken: usize,
    pub tool_calls_made: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Set when persisting the final answer kept failing after retries;
    /// the run still returns success with the answer intact, but the
    /// session is effectively dirty until a future append succeeds.
    pub persist_error: bool,
}

/// Retry an `append` up to 3 times with the fixed 50/200/800ms backoff
/// spec.md §7 prescribes for store failures after a successful LLM turn.
/// Returns `true` if every attempt failed (a `persist_error`).
async fn append_with_retry(memory: &MemoryRouter, msg: &Message) -> bool {
    if memory.append(msg).await.is_ok() {
        return false;
    }
    for delay_ms in [50u64, 200, 800] {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        if memory.append(msg).await.is_ok() {
            return false;
        }
    }
    log::error!(
        "failed to persist message for session {} after retries; marking persist_error",
        msg.session_id
    );
    true
}

pub struct ReasoningEngine {
    config: AgentConfig,
}

impl ReasoningEngine {
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }

    /// Run the loop for one already-appended user turn. The caller is
    /// responsible for guardrail-checking and persisting the user's message
    /// before calling this.
    pub async fn run(&self, ctx: RunContext<'_>, query_hint: &str) -> Result<RunOutcome, AgentError> {
        let start = Instant::now();
        let mut tool_calls_made = 0u64;
        let mut input_tokens = 0u64;
        let mut output_tokens = 0u64;

        // Earliest of the parent-inherited deadline and this turn's own
        // `max_execution_time_s`, computed once so every tool dispatch
        // shares the same bound a sub-agent call must not outlive.
        let own_deadline = if self.config.max_execution_time_s > 0 {
            Some(start + Duration::from_secs(self.config.max_execution_time_s))
        } else {
            None
        };
        let effective_deadline = match (ctx.deadline, own_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        };

        for step in 0..self.config.max_steps {
            if let Some(deadline) = ctx.deadline {
                if Instant::now() >= deadline {
                    return Err(AgentError::BudgetExceeded {
                        reason: "parent turn deadline reached".to_string(),
                    });
                }
            }
            if self.config.max_execution_time_s > 0
                && start.elapsed() >= Duration::from_secs(self.config.max_execution_time_s)
            {
                return Err(AgentError::BudgetExceeded {
                    reason: "max_execution_time_s reached".to_string(),
                });
            }
            if self.config.total_tokens_limit > 0 && input_tokens + output_tokens > self.config.total_tokens_limit {
                return Err(AgentError::BudgetExceeded {
                    reason: format!(
                        "total_tokens_limit ({}) exceeded: {} tokens used",
                        self.config.total_tokens_limit,
                        input_tokens + output_tokens
                    ),
                });
            }

            let history = ctx.memory.load(&ctx.session_id).await?;
            let managed = ctx.context_manager.manage(history, ctx.llm).await?;
            if managed.dropped > 0 {
                ctx.events
                    .publish(
                        &ctx.session_id,
                        &ctx.agent_id,
                        EventKind::ContextTruncated {
                            dropped: managed.dropped,
                            strategy: format!("{:?}", self.config.context_management.strategy),
                        },
                    )
                    .await?;
            }

            let active: Vec<Message> = managed.messages.into_iter().filter(|m| m.active).collect();
            let tool_descriptors =
                ctx.tools
                    .descriptors_for_prompt(self.config.enable_advanced_tool_use, query_hint, 10);

            let response = ctx
                .llm
                .complete(&active, &tool_descriptors, &CompletionParams::default())
                .await?;
            input_tokens += response.usage.input_tokens;
            output_tokens += response.usage.output_tokens;

            // One `agent_thought` per model call, win or lose on whether it
            // carries prose: a tool-only turn still "thought", it just
            // didn't say anything out loud before acting.
            ctx.events
                .publish(
                    &ctx.session_id,
                    &ctx.agent_id,
                    EventKind::AgentThought {
                        content: response.text.clone().unwrap_or_default(),
                    },
                )
                .await?;

            if response.is_final() {
                let text = response.text.unwrap_or_default();
                let assistant_msg = Message::new(&ctx.session_id, Role::Assistant, text.clone());
                let persist_error = append_with_retry(ctx.memory, &assistant_msg).await;
                ctx.events
                    .publish(&ctx.session_id, &ctx.agent_id, EventKind::FinalAnswer { content: text.clone() })
                    .await?;
                return Ok(RunOutcome {
                    final_answer: text,
                    steps_taken: step + 1,
                    tool_calls_made,
                    input_tokens,
                    output_tokens,
                    persist_error,
                });
            }

            let assistant_msg = Message::new(&ctx.session_id, Role::Assistant, response.text.clone().unwrap_or_default())
                .with_tool_calls(response.tool_calls.clone());
            ctx.memory.append(&assistant_msg).await?;

            let results = self.dispatch_tool_calls(&ctx, &response.tool_calls, effective_deadline).await;
            tool_calls_made += response.tool_calls.len() as u64;

            for (call, result) in response.tool_calls.iter().zip(results.into_iter()) {
                match result {
                    Ok(content) => {
                        let final_content = self.maybe_offload(&ctx, &content).await?;
                        let tool_msg = Message::new(&ctx.session_id, Role::Tool, final_content.clone())
                            .with_tool_call_id(call.id.clone());
                        ctx.memory.append(&tool_msg).await?;
                        ctx.events
                            .publish(
                                &ctx.session_id,
                                &ctx.agent_id,
                                EventKind::ToolCallResult {
                                    tool_name: call.name.clone(),
                                    ok: true,
                                    summary: final_content.chars().take(200).collect(),
                                },
                            )
                            .await?;
                    }
                    Err(err) => {
                        log::warn!("tool call {} failed for session {}: {}", call.name, ctx.session_id, err);
                        let tool_msg = Message::new(&ctx.session_id, Role::Tool, format!("error: {err}"))
                            .with_tool_call_id(call.id.clone());
                        ctx.memory.append(&tool_msg).await?;
                        ctx.events
                            .publish(
                                &ctx.session_id,
                                &ctx.agent_id,
                                EventKind::ToolCallResult {
                                    tool_name: call.name.clone(),
                                    ok: false,
                                    summary: err.to_string(),
                                },
                            )
                            .await?;
                        if self.config.fail_fast {
                            return Err(err);
                        }
                    }
                }
            }
        }

        Err(AgentError::BudgetExceeded {
            reason: format!("max_steps ({}) reached without a final answer", self.config.max_steps),
        })
    }

    /// Dispatch every tool call concurrently, each bounded by
    /// `tool_call_timeout_s`, preserving the caller's request order in the
    /// returned results.
    async fn dispatch_tool_calls(
        &self,
        ctx: &RunContext<'_>,
        calls: &[ToolCall],
        deadline: Option<Instant>,
    ) -> Vec<Result<String, AgentError>> {
        // `0` means unbounded/synchronous: no timer is armed and the call
        // runs to completion or failure directly.
        let timeout = (self.config.tool_call_timeout_s > 0)
            .then(|| Duration::from_secs(self.config.tool_call_timeout_s));
        let tool_context = Arc::new(SessionToolContext {
            session_id: ctx.session_id.clone(),
            delegation_depth: ctx.delegation_depth,
            deadline,
        });

        let futures = calls.iter().map(|call| {
            let tool = ctx.tools.find(&call.name);
            let context = tool_context.clone();
            let call = call.clone();
            async move {
                ctx.events
                    .publish(
                        &ctx.session_id,
                        &ctx.agent_id,
                        EventKind::ToolCallStarted {
                            tool_name: call.name.clone(),
                            arguments: call.arguments.clone(),
                        },
                    )
                    .await
                    .ok();

                let Some(tool) = tool else {
                    return Err(AgentError::ToolNotFound { name: call.name.clone() });
                };

                match timeout {
                    None => tool.call(call.arguments.clone(), context.as_ref()).await.map_err(|e| AgentError::ToolError {
                        name: call.name.clone(),
                        reason: e.to_string(),
                    }),
                    Some(d) => match tokio::time::timeout(d, tool.call(call.arguments.clone(), context.as_ref())).await {
                        Ok(Ok(content)) => Ok(content),
                        Ok(Err(e)) => Err(AgentError::ToolError {
                            name: call.name.clone(),
                            reason: e.to_string(),
                        }),
                        Err(_) => Err(AgentError::ToolTimeout {
                            name: call.name.clone(),
                            elapsed_ms: d.as_millis() as u64,
                        }),
                    },
                }
            }
        });

        futures::future::join_all(futures).await
    }

    async fn maybe_offload(&self, ctx: &RunContext<'_>, content: &str) -> Result<String, AgentError> {
        if !self.config.tool_offload.enabled {
            return Ok(content.to_string());
        }
        let token_estimate = content.len().saturating_div(4).max(1);
        if token_estimate <= self.config.tool_offload.threshold_tokens {
            return Ok(content.to_string());
        }

        let artifact = ctx.artifacts.put(&ctx.session_id, content.as_bytes().to_vec(), None);
        Ok(format!(
            "[offloaded to artifact {}; preview below]\n{}",
            artifact.artifact_id, artifact.preview
        ))
    }
}
