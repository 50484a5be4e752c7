//! Tool runner - manages and executes tools

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::assistants::{DescribeAssistantTool, ListAssistantsTool, SendRequestTool};
use super::Tool;
use crate::error::Error;
use crate::manager::AssistantManager;
use crate::Result;

/// Tool definition for LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Tool runner manages registered tools and executes them
pub struct ToolRunner {
    // Ordered so the tool list sent to the model is stable between calls.
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRunner {
    /// Create an empty tool runner
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Create a tool runner with the assistant tools
    pub fn for_assistants(manager: Arc<AssistantManager>) -> Self {
        let mut runner = Self::new();
        runner.register(DescribeAssistantTool::new(manager.clone()));
        runner.register(ListAssistantsTool::new(manager.clone()));
        runner.register(SendRequestTool::new(manager));
        runner
    }

    /// Register a tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    /// Get tool definitions for LLM
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, params: Value) -> Result<String> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| Error::Tool(format!("Unknown tool: {}", name)))?;

        tool.execute(params).await
    }

    /// Check if a tool exists
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// List registered tool names
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for ToolRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::testing::manager_with;
    use crate::tools::DummyTool;

    #[tokio::test]
    async fn test_tool_runner_register_and_execute() {
        let mut runner = ToolRunner::new();
        runner.register(DummyTool {
            name: "test_tool".to_string(),
            result: "success".to_string(),
        });

        assert!(runner.has("test_tool"));

        let result = runner.execute("test_tool", serde_json::json!({})).await.unwrap();
        assert_eq!(result, "success");
    }

    #[tokio::test]
    async fn test_tool_runner_unknown_tool() {
        let runner = ToolRunner::new();
        let result = runner.execute("unknown", serde_json::json!({})).await;
        assert!(matches!(result, Err(Error::Tool(_))));
    }

    #[test]
    fn test_assistant_tool_set() {
        let (manager, _, _) = manager_with(&[]);
        let runner = ToolRunner::for_assistants(manager);
        assert_eq!(
            runner.tool_names(),
            vec!["describe_assistant", "list_assistants", "send_request"]
        );
        assert_eq!(runner.definitions().len(), 3);
    }
}
