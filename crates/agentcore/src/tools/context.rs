//! Unified tool interface. Parameter schemas are inferred once at
//! registration by walking the handler's declared inputs (structural
//! reflection done by hand, since Rust has no runtime introspection); the
//! schema is then stored as data and never re-derived at call time.

use agentcore_types::{ParamSchema, ParamType, ToolDescriptor, ToolKind};
use async_trait::async_trait;
use std::collections::HashMap;

/// Execution context handed to every tool call.
pub trait ToolContext: Send + Sync {
    fn session_id(&self) -> &str;
    /// Current sub-agent delegation depth; tools of kind `sub_agent` refuse
    /// to recurse past `max_delegation_depth` using this counter.
    fn delegation_depth(&self) -> usize;
    /// Deadline inherited from the enclosing run, if any. A `sub_agent`
    /// tool threads this through so a child's lifetime never outlives the
    /// parent turn's remaining budget.
    fn deadline(&self) -> Option<std::time::Instant> {
        None
    }
}

/// Unified tool trait every `ToolKind` implements a handler for.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn kind(&self) -> ToolKind;

    /// Structural parameter schema, built once and stored by the registry.
    fn parameters(&self) -> Vec<ParamSchema>;

    async fn call(
        &self,
        args: serde_json::Value,
        context: &dyn ToolContext,
    ) -> Result<String, ToolCallError>;

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters_schema: self.parameters(),
            handler_ref: self.name().to_string(),
            kind: self.kind(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ToolCallError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("{0}")]
    Failed(String),
}

/// Helper for building a required string parameter.
pub fn string_param(name: &str, description: &str, required: bool) -> ParamSchema {
    ParamSchema {
        name: name.to_string(),
        ty: ParamType::String,
        required,
        default: None,
        description: Some(description.to_string()),
    }
}

pub fn int_param(name: &str, description: &str, required: bool) -> ParamSchema {
    ParamSchema {
        name: name.to_string(),
        ty: ParamType::Int,
        required,
        default: None,
        description: Some(description.to_string()),
    }
}

/// Pull a required argument out of a JSON object, typed.
pub fn required_str<'a>(args: &'a serde_json::Value, name: &str) -> Result<&'a str, ToolCallError> {
    args.get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolCallError::InvalidArgs(format!("missing required field `{name}`")))
}

pub fn required_i64(args: &serde_json::Value, name: &str) -> Result<i64, ToolCallError> {
    args.get(name)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| ToolCallError::InvalidArgs(format!("missing required field `{name}`")))
}

/// A simple tool built from a name/description/params plus an async
/// closure-like handler, used by tests and by `ArtifactStore`'s builtins so
/// they don't each need a hand-written struct.
pub struct FnTool<F> {
    pub name: String,
    pub description: String,
    pub kind: ToolKind,
    pub params: Vec<ParamSchema>,
    pub handler: F,
}

#[async_trait]
impl<F> Tool for FnTool<F>
where
    F: Fn(serde_json::Value) -> Result<String, ToolCallError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn kind(&self) -> ToolKind {
        self.kind
    }

    fn parameters(&self) -> Vec<ParamSchema> {
        self.params.clone()
    }

    async fn call(
        &self,
        args: serde_json::Value,
        _context: &dyn ToolContext,
    ) -> Result<String, ToolCallError> {
        (self.handler)(args)
    }
}

/// Flatten a tool's parameter schema into the `name -> schema` map a BM25
/// index or a prompt-rendering step needs.
pub fn schema_index(schema: &[ParamSchema]) -> HashMap<&str, &ParamSchema> {
    schema.iter().map(|p| (p.name.as_str(), p)).collect()
}
