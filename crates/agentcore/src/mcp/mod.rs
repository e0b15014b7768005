//! MCP tool-provider connector surface. Wire-level transport (stdio,
//! HTTP-stream, SSE) is a thin boundary this crate defines and a host
//! integration fills in; only the contract and a registration helper live
//! here.

use agentcore_types::{AgentError, ParamSchema, ToolDescriptor, ToolKind};
use async_trait::async_trait;
use std::sync::Arc;

use crate::tools::context::{Tool, ToolCallError, ToolContext};
use crate::tools::ToolRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McpTransportKind {
    Stdio,
    HttpStream,
    Sse,
}

/// One remote MCP tool's advertised shape, as returned by `list_tools`.
#[derive(Debug, Clone)]
pub struct McpToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParamSchema>,
}

/// A connection to one MCP server. Transport framing is implementation
/// detail of whatever adapts a concrete `stdio`/`http`/`sse` client to this
/// trait; this crate only needs `list_tools`/`call`/`close`.
#[async_trait]
pub trait MCPConnector: Send + Sync {
    fn transport(&self) -> McpTransportKind;

    async fn connect(&self) -> Result<(), AgentError>;

    async fn list_tools(&self) -> Result<Vec<McpToolSpec>, AgentError>;

    async fn call(&self, tool_name: &str, arguments: serde_json::Value) -> Result<String, AgentError>;

    async fn close(&self) -> Result<(), AgentError>;
}

/// Adapts one remote tool behind an `MCPConnector` to the local `Tool`
/// trait, so the registry and BM25 index treat MCP tools identically to
/// local ones.
struct McpTool {
    connector: Arc<dyn MCPConnector>,
    spec: McpToolSpec,
}

#[async_trait]
impl Tool for McpTool {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn description(&self) -> &str {
        &self.spec.description
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Mcp
    }

    fn parameters(&self) -> Vec<ParamSchema> {
        self.spec.parameters.clone()
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.spec.name.clone(),
            description: self.spec.description.clone(),
            parameters_schema: self.spec.parameters.clone(),
            handler_ref: self.spec.name.clone(),
            kind: ToolKind::Mcp,
        }
    }

    async fn call(&self, args: serde_json::Value, _context: &dyn ToolContext) -> Result<String, ToolCallError> {
        self.connector
            .call(&self.spec.name, args)
            .await
            .map_err(|e| ToolCallError::Failed(e.to_string()))
    }
}

/// Connect to `connector`, list its tools, and register each as a `Tool`
/// against `registry`. Returns the count of tools registered.
pub async fn connect_and_register(
    registry: &ToolRegistry,
    connector: Arc<dyn MCPConnector>,
) -> Result<usize, AgentError> {
    connector.connect().await?;
    let specs = connector.list_tools().await?;
    let count = specs.len();
    for spec in specs {
        let tool = Arc::new(McpTool {
            connector: connector.clone(),
            spec,
        });
        registry.register(tool)?;
    }
    Ok(count)
}
