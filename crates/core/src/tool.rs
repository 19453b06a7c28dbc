//! Tool trait: the abstraction over assistant data lookups.
//!
//! Tools are what let the model ground an answer in live business data:
//! campaign status, utilization, WIP, transaction trends, and so on.
//! Every tool is read-only.

use crate::error::ToolError;
use crate::provider::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// A request to execute a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the LLM's tool_call.id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

/// Who is asking. Every tool query is scoped by the caller's tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolContext {
    pub tenant_id: String,
    pub user_id: String,
    pub role: String,
}

/// The core Tool trait.
///
/// Each domain lookup implements this trait. Tools are registered in a
/// [`ToolRegistry`] and offered to the model by the orchestrator.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "get_campaign_status").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(
        &self,
        ctx: &ToolContext,
        arguments: serde_json::Value,
    ) -> std::result::Result<serde_json::Value, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A fixed set of tools offered to the model.
///
/// Definitions are returned in registration order so the prompt the model
/// sees is stable across requests.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Get all tool definitions (for sending to the LLM).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| t.to_definition())
            .collect()
    }

    /// Execute a tool call, surfacing failures as errors.
    pub async fn execute(
        &self,
        ctx: &ToolContext,
        call: &ToolCall,
    ) -> std::result::Result<serde_json::Value, ToolError> {
        let tool = self
            .tools
            .get(&call.name)
            .ok_or_else(|| ToolError::UnknownTool(call.name.clone()))?;
        tool.execute(ctx, call.arguments.clone()).await
    }

    /// Execute a tool call and fold any failure into an `{"error": ...}` object.
    ///
    /// This never fails: unknown tools and failing handlers become ordinary
    /// results that are fed back to the model and recorded in the audit trail.
    pub async fn dispatch(&self, ctx: &ToolContext, call: &ToolCall) -> serde_json::Value {
        match self.execute(ctx, call).await {
            Ok(value) => {
                debug!(tool = %call.name, "Tool executed");
                value
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool returned an error");
                serde_json::json!({ "error": e.to_string() })
            }
        }
    }

    /// List all registered tool names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
