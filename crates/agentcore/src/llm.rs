//! The `LLMClient` contract. Provider-specific wire formats are out of
//! scope for this crate; every provider adapter implements this single
//! trait.

use agentcore_types::{AgentError, Message, ToolCall, ToolDescriptor};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionParams {
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LLMResponse {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Usage,
}

impl LLMResponse {
    pub fn is_final(&self) -> bool {
        self.tool_calls.is_empty()
    }
}

/// A single LLM backend. `complete` must support structured tool-call
/// output (name + JSON arguments) alongside free text.
#[async_trait]
pub trait LLMClient: Send + Sync {
    async fn complete(
        &self,
        messages: &[Message],
        tools_schema: &[ToolDescriptor],
        params: &CompletionParams,
    ) -> Result<LLMResponse, AgentError>;
}
