//! Agent execution core: the observe-think-act reasoning loop, pluggable
//! memory/event routers with runtime backend switching, tool orchestration,
//! context engineering, a background task scheduler, and workflow
//! composition over `AgentCore` instances.

pub mod agent;
pub mod artifact;
pub mod config;
pub mod context;
mod delegation;
pub mod events;
pub mod guardrail;
pub mod llm;
pub mod mcp;
pub mod memory;
pub mod reasoning;
pub mod scheduler;
pub mod tools;
pub mod workflow;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use agent::AgentCore;
pub use agentcore_types::{AgentError, AgentMetrics};
pub use config::AgentConfig;
