use crate::artifact::ArtifactRef;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Structural parameter type, inferred once at registration time by walking
/// a handler's declared inputs -- never re-derived at call time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ParamType {
    String,
    Int,
    Float,
    Bool,
    Array { items: Box<ParamType> },
    Object,
    Enum { values: Vec<String> },
}

/// One entry of a tool's inferred parameter schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSchema {
    pub name: String,
    #[serde(flatten)]
    pub ty: ParamType,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// What provides a tool's implementation. Priority for BM25 tie-breaking
/// and deterministic prompt ordering is `Local > Mcp > SkillScript`, with
/// `Builtin` and `SubAgent` treated at `Local` priority (they are locally
/// dispatched, just not user-registered).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Local,
    Mcp,
    Builtin,
    SkillScript,
    SubAgent,
}

impl ToolKind {
    /// Higher number sorts first: `local > mcp > skill`.
    pub fn priority(self) -> u8 {
        match self {
            ToolKind::Local | ToolKind::Builtin | ToolKind::SubAgent => 2,
            ToolKind::Mcp => 1,
            ToolKind::SkillScript => 0,
        }
    }
}

/// Metadata record for a registered tool. The actual handler lives behind
/// a `Tool` trait object in `agentcore::tools`; `handler_ref` is just the
/// opaque key the registry uses to look it up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters_schema: Vec<ParamSchema>,
    pub handler_ref: String,
    pub kind: ToolKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Ok,
    Error,
    Timeout,
    Cancelled,
}

/// Either the tool's raw output (inline, under the offload threshold) or a
/// handle to the full payload in `ArtifactStore`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "ref_kind")]
pub enum ResultRef {
    Inline { payload: String },
    Artifact(ArtifactRef),
}

/// Record of a single tool invocation. `ended_at >= started_at` always;
/// `status = Timeout` implies the elapsed time reached the configured
/// per-call timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub id: String,
    pub session_id: String,
    pub tool_name: String,
    pub arguments: serde_json::Value,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub ended_at: OffsetDateTime,
    pub status: ToolStatus,
    pub result_ref: ResultRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
