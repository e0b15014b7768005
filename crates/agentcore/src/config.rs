//! Agent configuration record. Plain structs with `#[serde(default)]` and a
//! builder; parsing a config file from disk is a host application's job,
//! not this crate's.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryMode {
    SlidingWindow,
    TokenBudget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    Keep,
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    pub enabled: bool,
    pub retention_policy: RetentionPolicy,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            retention_policy: RetentionPolicy::Keep,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    pub mode: MemoryMode,
    pub value: usize,
    pub summary: SummaryConfig,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            mode: MemoryMode::SlidingWindow,
            value: 200,
            summary: SummaryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextMode {
    TokenBudget,
    SlidingWindow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextStrategy {
    Truncate,
    SummarizeAndTruncate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextManagementConfig {
    pub enabled: bool,
    pub mode: ContextMode,
    pub value: usize,
    pub threshold_percent: u8,
    pub strategy: ContextStrategy,
    pub preserve_recent: usize,
}

impl Default for ContextManagementConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: ContextMode::TokenBudget,
            value: 8_000,
            threshold_percent: 75,
            strategy: ContextStrategy::Truncate,
            preserve_recent: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOffloadConfig {
    pub enabled: bool,
    pub threshold_tokens: usize,
    pub max_preview_tokens: usize,
    pub storage_dir: Option<String>,
}

impl Default for ToolOffloadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold_tokens: 500,
            max_preview_tokens: 150,
            storage_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailConfig {
    pub enabled: bool,
    pub strict_mode: bool,
    pub sensitivity: f64,
    pub max_input_length: usize,
    pub enable_pattern_detection: bool,
    pub enable_heuristic_detection: bool,
    pub enable_encoding_detection: bool,
    pub enable_entropy_detection: bool,
    pub enable_sequential_detection: bool,
    pub allowlist_patterns: Vec<String>,
    pub blocklist_patterns: Vec<String>,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strict_mode: false,
            sensitivity: 1.0,
            max_input_length: 10_000,
            enable_pattern_detection: true,
            enable_heuristic_detection: true,
            enable_encoding_detection: true,
            enable_entropy_detection: true,
            enable_sequential_detection: true,
            allowlist_patterns: Vec::new(),
            blocklist_patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryToolBackend {
    None,
    Local,
}

impl Default for MemoryToolBackend {
    fn default() -> Self {
        MemoryToolBackend::None
    }
}

/// Top-level agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub max_steps: usize,
    pub tool_call_timeout_s: u64,
    /// `0` means unbounded.
    pub max_execution_time_s: u64,
    /// `0` means unbounded.
    pub request_limit: u64,
    /// `0` means unbounded.
    pub total_tokens_limit: u64,
    pub memory_config: MemoryConfig,
    pub context_management: ContextManagementConfig,
    pub tool_offload: ToolOffloadConfig,
    pub guardrail_config: GuardrailConfig,
    pub enable_advanced_tool_use: bool,
    pub enable_agent_skills: bool,
    pub memory_tool_backend: MemoryToolBackend,
    pub fail_fast: bool,
    /// Maximum sub-agent delegation depth, breaking cycles in the agent
    /// graph.
    pub max_delegation_depth: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: 15,
            tool_call_timeout_s: 30,
            max_execution_time_s: 0,
            request_limit: 0,
            total_tokens_limit: 0,
            memory_config: MemoryConfig::default(),
            context_management: ContextManagementConfig::default(),
            tool_offload: ToolOffloadConfig::default(),
            guardrail_config: GuardrailConfig::default(),
            enable_advanced_tool_use: false,
            enable_agent_skills: false,
            memory_tool_backend: MemoryToolBackend::None,
            fail_fast: false,
            max_delegation_depth: 3,
        }
    }
}

impl AgentConfig {
    pub fn with_max_steps(mut self, steps: usize) -> Self {
        self.max_steps = steps;
        self
    }

    pub fn with_total_tokens_limit(mut self, limit: u64) -> Self {
        self.total_tokens_limit = limit;
        self
    }

    pub fn with_max_execution_time_s(mut self, seconds: u64) -> Self {
        self.max_execution_time_s = seconds;
        self
    }
}
