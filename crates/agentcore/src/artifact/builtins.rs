//! Builtin tools exposing `ArtifactStore` operations back to the model,
//! registered automatically when tool-output offloading is enabled.

use super::ArtifactStore;
use crate::tools::context::{int_param, required_i64, required_str, string_param, Tool, ToolCallError, ToolContext};
use agentcore_types::{ParamSchema, ToolKind};
use async_trait::async_trait;
use std::sync::Arc;

struct ReadArtifactTool(Arc<ArtifactStore>);
struct TailArtifactTool(Arc<ArtifactStore>);
struct SearchArtifactTool(Arc<ArtifactStore>);
struct ListArtifactsTool(Arc<ArtifactStore>);

#[async_trait]
impl Tool for ReadArtifactTool {
    fn name(&self) -> &str {
        "read_artifact"
    }
    fn description(&self) -> &str {
        "Read the full content of a previously offloaded tool result by its artifact id."
    }
    fn kind(&self) -> ToolKind {
        ToolKind::Builtin
    }
    fn parameters(&self) -> Vec<ParamSchema> {
        vec![string_param("artifact_id", "id of the artifact to read", true)]
    }
    async fn call(&self, args: serde_json::Value, _ctx: &dyn ToolContext) -> Result<String, ToolCallError> {
        let id = required_str(&args, "artifact_id")?;
        let bytes = self
            .0
            .read(id)
            .map_err(|e| ToolCallError::Failed(e.to_string()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[async_trait]
impl Tool for TailArtifactTool {
    fn name(&self) -> &str {
        "tail_artifact"
    }
    fn description(&self) -> &str {
        "Return the last N lines of an offloaded artifact."
    }
    fn kind(&self) -> ToolKind {
        ToolKind::Builtin
    }
    fn parameters(&self) -> Vec<ParamSchema> {
        vec![
            string_param("artifact_id", "id of the artifact", true),
            int_param("n_lines", "number of trailing lines to return", true),
        ]
    }
    async fn call(&self, args: serde_json::Value, _ctx: &dyn ToolContext) -> Result<String, ToolCallError> {
        let id = required_str(&args, "artifact_id")?;
        let n_lines = required_i64(&args, "n_lines")?.max(0) as usize;
        self.0
            .tail(id, n_lines)
            .map_err(|e| ToolCallError::Failed(e.to_string()))
    }
}

#[async_trait]
impl Tool for SearchArtifactTool {
    fn name(&self) -> &str {
        "search_artifact"
    }
    fn description(&self) -> &str {
        "Case-insensitive substring search over an offloaded artifact, capped at 100 hits."
    }
    fn kind(&self) -> ToolKind {
        ToolKind::Builtin
    }
    fn parameters(&self) -> Vec<ParamSchema> {
        vec![
            string_param("artifact_id", "id of the artifact", true),
            string_param("query", "substring to search for", true),
        ]
    }
    async fn call(&self, args: serde_json::Value, _ctx: &dyn ToolContext) -> Result<String, ToolCallError> {
        let id = required_str(&args, "artifact_id")?;
        let query = required_str(&args, "query")?;
        let hits = self
            .0
            .search(id, query)
            .map_err(|e| ToolCallError::Failed(e.to_string()))?;
        let rendered: Vec<String> = hits.into_iter().map(|(offset, line)| format!("{offset}: {line}")).collect();
        Ok(rendered.join("\n"))
    }
}

#[async_trait]
impl Tool for ListArtifactsTool {
    fn name(&self) -> &str {
        "list_artifacts"
    }
    fn description(&self) -> &str {
        "List artifacts offloaded so far in the current session."
    }
    fn kind(&self) -> ToolKind {
        ToolKind::Builtin
    }
    fn parameters(&self) -> Vec<ParamSchema> {
        vec![]
    }
    async fn call(&self, _args: serde_json::Value, ctx: &dyn ToolContext) -> Result<String, ToolCallError> {
        let refs = self.0.list(ctx.session_id());
        let rendered: Vec<String> = refs
            .into_iter()
            .map(|r| format!("{} ({} bytes)", r.artifact_id, r.size_bytes))
            .collect();
        Ok(rendered.join("\n"))
    }
}

/// Register the four artifact-access tools against a registry, sharing one
/// `ArtifactStore`.
pub fn register_artifact_tools(
    registry: &crate::tools::ToolRegistry,
    store: Arc<ArtifactStore>,
) -> Result<(), agentcore_types::AgentError> {
    registry.register(Arc::new(ReadArtifactTool(store.clone())))?;
    registry.register(Arc::new(TailArtifactTool(store.clone())))?;
    registry.register(Arc::new(SearchArtifactTool(store.clone())))?;
    registry.register(Arc::new(ListArtifactsTool(store)))?;
    Ok(())
}
