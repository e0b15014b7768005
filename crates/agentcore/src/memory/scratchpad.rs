//! `memory_tool_backend = local`: a per-session scratchpad the model can
//! write to and recall from directly, distinct from the conversation
//! history `MemoryRouter` manages. Grounded on the same builtin-tool
//! registration shape as `artifact::builtins` (a small `Tool` impl per
//! operation, sharing one backing store via `Arc`).

use crate::tools::context::{string_param, Tool, ToolCallError, ToolContext};
use crate::tools::ToolRegistry;
use agentcore_types::{AgentError, ParamSchema, ToolKind};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// In-process key-value scratchpad, one note map per session. `none` (the
/// default) never constructs this; `local` wires it in via
/// [`register_memory_tools`].
#[derive(Default)]
pub struct MemoryScratchpad {
    notes: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl MemoryScratchpad {
    pub fn new() -> Self {
        Self::default()
    }

    fn remember(&self, session_id: &str, key: &str, value: &str) {
        self.notes
            .write()
            .entry(session_id.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    fn recall(&self, session_id: &str, key: &str) -> Option<String> {
        self.notes.read().get(session_id).and_then(|m| m.get(key).cloned())
    }

    fn list(&self, session_id: &str) -> Vec<String> {
        self.notes
            .read()
            .get(session_id)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }
}

struct RememberTool(Arc<MemoryScratchpad>);
struct RecallTool(Arc<MemoryScratchpad>);
struct ListMemoryTool(Arc<MemoryScratchpad>);

#[async_trait]
impl Tool for RememberTool {
    fn name(&self) -> &str {
        "remember"
    }
    fn description(&self) -> &str {
        "Save a durable note under a key, retrievable later in this session with recall."
    }
    fn kind(&self) -> ToolKind {
        ToolKind::Builtin
    }
    fn parameters(&self) -> Vec<ParamSchema> {
        vec![
            string_param("key", "name to file the note under", true),
            string_param("value", "note content", true),
        ]
    }
    async fn call(&self, args: serde_json::Value, ctx: &dyn ToolContext) -> Result<String, ToolCallError> {
        let key = crate::tools::context::required_str(&args, "key")?;
        let value = crate::tools::context::required_str(&args, "value")?;
        self.0.remember(ctx.session_id(), key, value);
        Ok(format!("remembered '{key}'"))
    }
}

#[async_trait]
impl Tool for RecallTool {
    fn name(&self) -> &str {
        "recall"
    }
    fn description(&self) -> &str {
        "Retrieve a note previously saved with remember by its key."
    }
    fn kind(&self) -> ToolKind {
        ToolKind::Builtin
    }
    fn parameters(&self) -> Vec<ParamSchema> {
        vec![string_param("key", "key the note was saved under", true)]
    }
    async fn call(&self, args: serde_json::Value, ctx: &dyn ToolContext) -> Result<String, ToolCallError> {
        let key = crate::tools::context::required_str(&args, "key")?;
        self.0
            .recall(ctx.session_id(), key)
            .ok_or_else(|| ToolCallError::Failed(format!("no note saved under '{key}'")))
    }
}

#[async_trait]
impl Tool for ListMemoryTool {
    fn name(&self) -> &str {
        "list_memory"
    }
    fn description(&self) -> &str {
        "List the keys of notes saved so far in this session."
    }
    fn kind(&self) -> ToolKind {
        ToolKind::Builtin
    }
    fn parameters(&self) -> Vec<ParamSchema> {
        vec![]
    }
    async fn call(&self, _args: serde_json::Value, ctx: &dyn ToolContext) -> Result<String, ToolCallError> {
        Ok(self.0.list(ctx.session_id()).join("\n"))
    }
}

/// Register `remember`/`recall`/`list_memory` against `registry`, sharing
/// one scratchpad.
pub fn register_memory_tools(registry: &ToolRegistry, scratchpad: Arc<MemoryScratchpad>) -> Result<(), AgentError> {
    registry.register(Arc::new(RememberTool(scratchpad.clone())))?;
    registry.register(Arc::new(RecallTool(scratchpad.clone())))?;
    registry.register(Arc::new(ListMemoryTool(scratchpad)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubCtx(String);
    impl ToolContext for StubCtx {
        fn session_id(&self) -> &str {
            &self.0
        }
        fn delegation_depth(&self) -> usize {
            0
        }
    }

    #[tokio::test]
    async fn remember_then_recall_round_trips() {
        let pad = Arc::new(MemoryScratchpad::new());
        let remember = RememberTool(pad.clone());
        let recall = RecallTool(pad.clone());
        let ctx = StubCtx("s1".to_string());

        remember
            .call(serde_json::json!({"key": "favorite_color", "value": "teal"}), &ctx)
            .await
            .unwrap();
        let value = recall.call(serde_json::json!({"key": "favorite_color"}), &ctx).await.unwrap();
        assert_eq!(value, "teal");
    }

    #[tokio::test]
    async fn recall_missing_key_fails() {
        let pad = Arc::new(MemoryScratchpad::new());
        let recall = RecallTool(pad);
        let ctx = StubCtx("s1".to_string());
        let err = recall.call(serde_json::json!({"key": "nope"}), &ctx).await.unwrap_err();
        assert!(matches!(err, ToolCallError::Failed(_)));
    }

    #[tokio::test]
    async fn notes_are_scoped_per_session() {
        let pad = Arc::new(MemoryScratchpad::new());
        let remember = RememberTool(pad.clone());
        let list = ListMemoryTool(pad);
        remember
            .call(serde_json::json!({"key": "a", "value": "1"}), &StubCtx("s1".into()))
            .await
            .unwrap();
        let keys_s2 = list.call(serde_json::json!({}), &StubCtx("s2".into())).await.unwrap();
        assert!(keys_s2.is_empty());
    }
}
