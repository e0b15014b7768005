//! Test doubles shared across this crate's unit and integration tests, and
//! exported behind `test-support` for downstream crates that embed
//! `AgentCore` and want to script its model responses.

use crate::llm::{CompletionParams, LLMClient, LLMResponse};
use agentcore_types::{AgentError, Message, ToolDescriptor};
use async_trait::async_trait;
use parking_lot::Mutex;

/// Replays a fixed sequence of responses, one per call, in order. Panics if
/// called more times than it has scripted responses -- a test that exhausts
/// the script has a wrong turn count, not a backend that ran dry.
pub struct ScriptedLLMClient {
    responses: Mutex<std::collections::VecDeque<LLMResponse>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLLMClient {
    pub fn new(responses: Vec<LLMResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl LLMClient for ScriptedLLMClient {
    async fn complete(
        &self,
        messages: &[Message],
        _tools_schema: &[ToolDescriptor],
        _params: &CompletionParams,
    ) -> Result<LLMResponse, AgentError> {
        self.calls.lock().push(messages.to_vec());
        self.responses
            .lock()
            .pop_front()
            .ok_or_else(|| AgentError::Internal("ScriptedLLMClient script exhausted".to_string()))
    }
}

/// Always returns `LlmUnavailable`, for exercising retry/backoff paths.
pub struct FailingLLMClient;

#[async_trait]
impl LLMClient for FailingLLMClient {
    async fn complete(
        &self,
        _messages: &[Message],
        _tools_schema: &[ToolDescriptor],
        _params: &CompletionParams,
    ) -> Result<LLMResponse, AgentError> {
        Err(AgentError::LlmUnavailable("scripted failure".to_string()))
    }
}
