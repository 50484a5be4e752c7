//! Message processor - one long-lived conversation routed through the LLM

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use super::llm::LlmClient;
use super::message::{Message, ToolCallRequest};
use crate::error::Error;
use crate::manager::AssistantManager;
use crate::tools::ToolRunner;
use crate::Result;

/// Maximum history messages to include in prompt (prevents unbounded growth).
const MAX_HISTORY_MESSAGES: usize = 40;

/// Reply used when the model finishes without any text.
pub const FALLBACK_REPLY: &str = "I'm sorry, I couldn't come up with a response.";

struct Session {
    system_prompt: String,
    history: Vec<Message>,
    tools: ToolRunner,
}

impl Session {
    /// Record a finished turn, keeping only the messages that can still be sent.
    fn remember(&mut self, user: &str, reply: &str) {
        self.history.push(Message::user(user));
        self.history.push(Message::assistant(reply));
        if self.history.len() > MAX_HISTORY_MESSAGES {
            let excess = self.history.len() - MAX_HISTORY_MESSAGES;
            self.history.drain(..excess);
        }
    }

    fn build_messages(&self, current: &str) -> Vec<Message> {
        let windowed = if self.history.len() > MAX_HISTORY_MESSAGES {
            &self.history[self.history.len() - MAX_HISTORY_MESSAGES..]
        } else {
            &self.history[..]
        };

        let mut messages = Vec::with_capacity(windowed.len() + 2);
        messages.push(Message::system(self.system_prompt.clone()));
        messages.extend(windowed.iter().cloned());
        messages.push(Message::user(current));
        messages
    }
}

/// Forwards user text to the chat model, offering the assistant tools.
pub struct MessageProcessor {
    client: Box<dyn LlmClient>,
    manager: Arc<AssistantManager>,
    max_iterations: usize,
    session: Mutex<Option<Session>>,
}

impl MessageProcessor {
    pub fn new(
        client: Box<dyn LlmClient>,
        manager: Arc<AssistantManager>,
        max_iterations: usize,
    ) -> Self {
        Self {
            client,
            manager,
            max_iterations,
            session: Mutex::new(None),
        }
    }

    /// Start the conversation: system prompt with the current assistant
    /// names, and the three assistant tools.
    pub async fn initialize(&self) -> Result<()> {
        let names: Vec<String> = self
            .manager
            .get_all_assistants()
            .await
            .into_iter()
            .map(|a| a.name)
            .collect();

        let session = Session {
            system_prompt: build_system_prompt(&names),
            history: Vec::new(),
            tools: ToolRunner::for_assistants(self.manager.clone()),
        };

        info!(
            "Message processor ready with {} assistants and tools {:?}",
            names.len(),
            session.tools.tool_names()
        );
        *self.session.lock().await = Some(session);
        Ok(())
    }

    /// Run one user message through the model and return its reply.
    ///
    /// Turns are serialized: the session lock is held for the whole exchange.
    pub async fn process_message(&self, text: &str) -> Result<String> {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(Error::Uninitialized)?;

        let mut messages = session.build_messages(text);
        let tools = session.tools.definitions();

        debug!("Processing message: {}", text);

        for iteration in 0..self.max_iterations {
            debug!("Iteration {}/{}", iteration + 1, self.max_iterations);

            let response = self.client.chat(&messages, &tools).await?;

            if !response.has_tool_calls() {
                let reply = response
                    .content
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| FALLBACK_REPLY.to_string());
                info!("Reply ready: {} chars", reply.len());

                session.remember(text, &reply);
                return Ok(reply);
            }

            messages.push(Message::assistant_with_tools(
                response.content.clone().unwrap_or_default(),
                response.tool_calls.clone(),
            ));

            for tool_call in &response.tool_calls {
                let result = execute_tool(&session.tools, tool_call).await;
                messages.push(Message::tool_result(tool_call, result));
            }
        }

        Err(Error::MaxIterations)
    }
}

async fn execute_tool(tools: &ToolRunner, tool_call: &ToolCallRequest) -> String {
    debug!("Executing tool: {} with args: {}", tool_call.name, tool_call.arguments);

    match tools.execute(&tool_call.name, tool_call.arguments.clone()).await {
        Ok(result) => {
            debug!("Tool {} succeeded: {} chars", tool_call.name, result.len());
            result
        }
        Err(e) => {
            let error_msg = format!("Error: {}", e);
            debug!("Tool {} failed: {}", tool_call.name, error_msg);
            error_msg
        }
    }
}

fn build_system_prompt(names: &[String]) -> String {
    let listing = if names.is_empty() {
        "(no assistants are currently available)".to_string()
    } else {
        names
            .iter()
            .map(|n| format!("- {n}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"You are a concierge that helps users work with a set of remote assistants.

## Available assistants
{listing}

## Tools
- `list_assistants` - list every available assistant
- `describe_assistant(name)` - show what an assistant can do
- `send_request(name, request)` - hand a request to an assistant

Use the exact assistant names above. If the user asks for something one of
the assistants can do, send it the request and tell the user it was sent.
If a tool reports an error, explain it briefly. Otherwise answer directly."#
    )
}
