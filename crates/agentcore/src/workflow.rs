//! Composition over `AgentCore` instances: sequential chains, parallel
//! fan-out/fan-in, and LLM-routed dispatch to exactly one child. Grounded
//! on the teacher's `quorum`/`delegation` fan-out-fan-in style
//! (`futures::future::join_all` over boxed futures), generalized from
//! delegation between ACP-protocol agents to the three named compositions.

use crate::agent::AgentCore;
use crate::llm::{CompletionParams, LLMClient};
use agentcore_types::{AgentError, Message, ParamSchema, Role, ToolDescriptor, ToolKind};
use std::collections::HashMap;
use std::sync::Arc;

/// One named child in a workflow composition.
#[derive(Clone)]
pub struct NamedAgent {
    pub name: String,
    pub description: String,
    pub agent: Arc<AgentCore>,
}

impl NamedAgent {
    pub fn new(name: impl Into<String>, description: impl Into<String>, agent: Arc<AgentCore>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            agent,
        }
    }
}

pub struct WorkflowOrchestrator;

impl WorkflowOrchestrator {
    /// Thread the output of step *i* as the user input of step *i+1*.
    /// A terminal error aborts the chain immediately.
    pub async fn sequential(steps: &[NamedAgent], input: &str) -> Result<String, AgentError> {
        let mut current = input.to_string();
        for step in steps {
            let result = step.agent.run(current, None).await?;
            current = result.answer;
        }
        Ok(current)
    }

    /// Launch every child concurrently against the same input; `join-all`
    /// semantics mean the call returns once every child has completed
    /// (successfully or not), never short-circuiting on the first error.
    pub async fn parallel(children: &[NamedAgent], input: &str) -> HashMap<String, Result<String, AgentError>> {
        let futures = children.iter().map(|child| {
            let agent = child.agent.clone();
            let input = input.to_string();
            let name = child.name.clone();
            async move { (name, agent.run(input, None).await.map(|r| r.answer)) }
        });
        futures::future::join_all(futures).await.into_iter().collect()
    }

    /// A dedicated LLM call picks exactly one child by name from the
    /// closed set of `children`; the selected child then runs `task`. If
    /// the model refuses (no tool call, or names an unknown child),
    /// re-routes up to `router_retry_limit` additional times before
    /// failing.
    pub async fn router(
        llm: &dyn LLMClient,
        children: &[NamedAgent],
        task: &str,
        router_retry_limit: usize,
    ) -> Result<RouterOutcome, AgentError> {
        let descriptors: Vec<ToolDescriptor> = children
            .iter()
            .map(|c| ToolDescriptor {
                name: c.name.clone(),
                description: c.description.clone(),
                parameters_schema: Vec::<ParamSchema>::new(),
                handler_ref: c.name.clone(),
                kind: ToolKind::SubAgent,
            })
            .collect();

        let prompt = Message::new(
            "router",
            Role::User,
            format!("Select exactly one agent to handle this task:\n\n{task}"),
        );

        let mut attempts = 0;
        loop {
            let response = llm.complete(&[prompt.clone()], &descriptors, &CompletionParams::default()).await?;
            if let Some(call) = response.tool_calls.first() {
                if let Some(child) = children.iter().find(|c| c.name == call.name) {
                    let result = child.agent.run(task, None).await?;
                    return Ok(RouterOutcome {
                        selected: child.name.clone(),
                        answer: result.answer,
                    });
                }
            }
            if attempts >= router_retry_limit {
                return Err(AgentError::Internal(format!(
                    "router failed to select a known agent after {} attempt(s)",
                    attempts + 1
                )));
            }
            attempts += 1;
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouterOutcome {
    pub selected: String,
    pub answer: String,
}
