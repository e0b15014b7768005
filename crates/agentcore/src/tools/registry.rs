//! Tool registry: holds local tool descriptors, builds JSON-schema for
//! parameters, and (when `advanced_tool_use` is enabled) serves a BM25
//! index over them so the prompt only carries the top-k relevant tools.

use crate::tools::bm25::Bm25Index;
use crate::tools::context::Tool;
use agentcore_types::{AgentError, ToolDescriptor};
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::Arc;

/// Copy-on-write tool registry: registration builds a new snapshot map and
/// swaps the pointer atomically, so concurrent `find`/`definitions` callers
/// never observe a partially-updated registry.
#[derive(Default)]
pub struct ToolRegistry {
    tools: ArcSwap<HashMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// Register a tool. Fails if a tool with the same name already exists.
    pub fn register(&self, tool: Arc<dyn Tool>) -> Result<(), AgentError> {
        let name = tool.name().to_string();
        let current = self.tools.load();
        if current.contains_key(&name) {
            return Err(AgentError::Internal(format!(
                "duplicate tool registration: {name}"
            )));
        }
        let mut next = (**current).clone();
        next.insert(name, tool);
        self.tools.store(Arc::new(next));
        Ok(())
    }

    pub fn unregister(&self, name: &str) {
        let current = self.tools.load();
        if !current.contains_key(name) {
            return;
        }
        let mut next = (**current).clone();
        next.remove(name);
        self.tools.store(Arc::new(next));
    }

    pub fn find(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.load().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.tools.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All descriptors, deterministically ordered by `(kind priority desc,
    /// name asc)` so repeated prompt assembly never leaks hash-map
    /// iteration order.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        let current = self.tools.load();
        let mut descriptors: Vec<ToolDescriptor> = current.values().map(|t| t.descriptor()).collect();
        descriptors.sort_by(|a, b| {
            b.kind
                .priority()
                .cmp(&a.kind.priority())
                .then_with(|| a.name.cmp(&b.name))
        });
        descriptors
    }

    /// Tool descriptors for the prompt: the full catalog if
    /// `advanced_tool_use` is disabled, else the top-`k` BM25 matches for
    /// `query`.
    pub fn descriptors_for_prompt(
        &self,
        advanced_tool_use: bool,
        query: &str,
        k: usize,
    ) -> Vec<ToolDescriptor> {
        let all = self.descriptors();
        if !advanced_tool_use {
            return all;
        }
        let index = Bm25Index::build(&all);
        let ranked_names = index.search(query, k);
        let by_name: HashMap<&str, &ToolDescriptor> =
            all.iter().map(|d| (d.name.as_str(), d)).collect();
        ranked_names
            .into_iter()
            .filter_map(|name| by_name.get(name.as_str()).map(|d| (*d).clone()))
            .collect()
    }
}
