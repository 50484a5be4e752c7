//! Assistant tools - describe, list and send requests to registry assistants

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{required_str, Tool};
use crate::manager::AssistantManager;
use crate::Result;

/// Show an assistant's registry entry and its agent card
pub struct DescribeAssistantTool {
    manager: Arc<AssistantManager>,
}

impl DescribeAssistantTool {
    pub fn new(manager: Arc<AssistantManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl Tool for DescribeAssistantTool {
    fn name(&self) -> &str {
        "describe_assistant"
    }
    fn description(&self) -> &str {
        "Get details about an assistant, including its capabilities from its agent card"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "Exact name of the assistant"
                }
            },
            "required": ["name"]
        })
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let name = required_str(&params, "name")?;
        let card = self.manager.get_assistant_agent_card(name).await?;
        let assistant = self.manager.find_assistant(name).await;

        Ok(serde_json::to_string_pretty(&json!({
            "assistant": assistant,
            "agentCard": card,
        }))?)
    }
}

/// List every assistant known to the registry
pub struct ListAssistantsTool {
    manager: Arc<AssistantManager>,
}

impl ListAssistantsTool {
    pub fn new(manager: Arc<AssistantManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl Tool for ListAssistantsTool {
    fn name(&self) -> &str {
        "list_assistants"
    }
    fn description(&self) -> &str {
        "List the names of all available assistants"
    }

    fn parameters(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _params: Value) -> Result<String> {
        let assistants = self.manager.get_all_assistants().await;
        if assistants.is_empty() {
            return Ok("No assistants are available.".to_string());
        }
        let listing: Vec<Value> = assistants
            .iter()
            .map(|a| json!({"name": a.name, "slug": a.slug}))
            .collect();
        Ok(serde_json::to_string(&listing)?)
    }
}

/// Dispatch a free-text request to a named assistant
pub struct SendRequestTool {
    manager: Arc<AssistantManager>,
}

impl SendRequestTool {
    pub fn new(manager: Arc<AssistantManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl Tool for SendRequestTool {
    fn name(&self) -> &str {
        "send_request"
    }
    fn description(&self) -> &str {
        "Send a request to an assistant as a task"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "Exact name of the assistant"
                },
                "request": {
                    "type": "string",
                    "description": "What the assistant should do"
                }
            },
            "required": ["name", "request"]
        })
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let name = required_str(&params, "name")?;
        let request = required_str(&params, "request")?;
        let response = self.manager.send_task_to_assistant(name, request).await?;
        Ok(serde_json::to_string(&response)?)
    }
}
