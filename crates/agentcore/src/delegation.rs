//! Sub-agents as tool entries. Represents the cyclic-agent-graph design
//! note: a `sub_agent` tool carries the caller's delegation depth and
//! refuses to recurse once the configured limit is reached, breaking
//! cycles rather than detecting them after the fact.

use crate::agent::AgentCore;
use crate::events::EventRouter;
use crate::tools::context::{required_str, string_param, Tool, ToolCallError, ToolContext};
use agentcore_types::{AgentError, AgentMetrics, EventKind, ParamSchema, ToolKind};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

struct SubAgentTool {
    tool_name: String,
    description: String,
    child: Arc<AgentCore>,
    max_depth: usize,
    parent_metrics: Arc<Mutex<AgentMetrics>>,
    parent_events: Arc<EventRouter>,
    parent_agent_id: String,
}

#[async_trait]
impl Tool for SubAgentTool {
    fn name(&self) -> &str {
        &self.tool_name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn kind(&self) -> ToolKind {
        ToolKind::SubAgent
    }

    fn parameters(&self) -> Vec<ParamSchema> {
        vec![string_param("query", "task to hand off to the sub-agent", true)]
    }

    async fn call(&self, args: serde_json::Value, ctx: &dyn ToolContext) -> Result<String, ToolCallError> {
        let next_depth = ctx.delegation_depth() + 1;
        if next_depth > self.max_depth {
            return Err(ToolCallError::Failed(format!(
                "sub-agent delegation depth {next_depth} exceeds max_delegation_depth ({})",
                self.max_depth
            )));
        }
        let query = required_str(&args, "query")?.to_string();
        let child_session_id = uuid::Uuid::new_v4().to_string();

        self.parent_events
            .publish(
                ctx.session_id(),
                &self.parent_agent_id,
                EventKind::SubAgentStarted {
                    child_session_id: child_session_id.clone(),
                    sub_agent_id: self.child.agent_id().to_string(),
                },
            )
            .await
            .ok();

        // Deadline inherited from the parent turn, per spec: a sub-agent's
        // lifetime never outlives the parent turn's remaining budget.
        let result = self
            .child
            .run_delegated(query, Some(child_session_id.clone()), next_depth, ctx.deadline())
            .await;

        match result {
            Ok(run_result) => {
                self.parent_metrics.lock().merge_child(&self.child.get_metrics());
                self.parent_events
                    .publish(
                        ctx.session_id(),
                        &self.parent_agent_id,
                        EventKind::SubAgentResult {
                            child_session_id,
                            content: run_result.answer.clone(),
                        },
                    )
                    .await
                    .ok();
                Ok(run_result.answer)
            }
            Err(err) => {
                self.parent_metrics.lock().merge_child(&self.child.get_metrics());
                self.parent_events
                    .publish(
                        ctx.session_id(),
                        &self.parent_agent_id,
                        EventKind::SubAgentError {
                            child_session_id,
                            message: err.to_string(),
                        },
                    )
                    .await
                    .ok();
                Err(ToolCallError::Failed(err.to_string()))
            }
        }
    }
}

pub(crate) fn register_sub_agent_tool(parent: &AgentCore, child: Arc<AgentCore>) -> Result<(), AgentError> {
    let tool_name = format!("delegate_{}", child.agent_id());
    let description = format!("Delegate a task to the '{}' sub-agent.", child.agent_id());
    let tool = Arc::new(SubAgentTool {
        tool_name,
        description,
        max_depth: parent.max_delegation_depth(),
        parent_metrics: parent.metrics_handle(),
        parent_events: parent.events_handle(),
        parent_agent_id: parent.agent_id().to_string(),
        child,
    });
    parent.tools().register(tool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;
    use crate::llm::{LLMResponse, Usage};
    use crate::test_support::ScriptedLLMClient;

    #[tokio::test]
    async fn sub_agent_tool_runs_child_and_merges_metrics() {
        let child_llm = Arc::new(ScriptedLLMClient::new(vec![LLMResponse {
            text: Some("child answer".into()),
            tool_calls: vec![],
            usage: Usage { input_tokens: 3, output_tokens: 2 },
        }]));
        let child = Arc::new(AgentCore::new("helper", AgentConfig::default(), child_llm));

        let parent_llm = Arc::new(ScriptedLLMClient::new(vec![]));
        let parent = AgentCore::new("main", AgentConfig::default(), parent_llm);
        parent.register_sub_agent(child).unwrap();

        let tool = parent.tools().find("delegate_helper").unwrap();
        struct Ctx;
        impl ToolContext for Ctx {
            fn session_id(&self) -> &str {
                "parent-session"
            }
            fn delegation_depth(&self) -> usize {
                0
            }
        }
        let result = tool
            .call(serde_json::json!({"query": "do the thing"}), &Ctx)
            .await
            .unwrap();
        assert_eq!(result, "child answer");
        assert_eq!(parent.get_metrics().input_tokens, 3);
    }

    #[tokio::test]
    async fn sub_agent_tool_refuses_past_max_depth() {
        let child_llm = Arc::new(ScriptedLLMClient::new(vec![]));
        let child = Arc::new(AgentCore::new("helper", AgentConfig::default(), child_llm));

        let mut config = AgentConfig::default();
        config.max_delegation_depth = 1;
        let parent_llm = Arc::new(ScriptedLLMClient::new(vec![]));
        let parent = AgentCore::new("main", config, parent_llm);
        parent.register_sub_agent(child).unwrap();

        let tool = parent.tools().find("delegate_helper").unwrap();
        struct DeepCtx;
        impl ToolContext for DeepCtx {
            fn session_id(&self) -> &str {
                "s"
            }
            fn delegation_depth(&self) -> usize {
                1
            }
        }
        let err = tool
            .call(serde_json::json!({"query": "recurse"}), &DeepCtx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolCallError::Failed(_)));
    }
}
