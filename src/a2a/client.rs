//! JSON-RPC client that submits tasks to remote assistants.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::COOKIE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Error;
use crate::Result;

use super::types::{AgentCard, Task, TaskSendParams};
use super::TaskDispatcher;

pub const METHOD_TASKS_SEND: &str = "tasks/send";
const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: &'a str,
    method: &'static str,
    params: P,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// A2A client keyed by assistant id.
///
/// Each assistant must be registered with its agent card before tasks can be
/// sent to it; the card's `url` is the JSON-RPC endpoint.
pub struct A2aClient {
    http: Client,
    cookies: Option<String>,
    cards: RwLock<HashMap<String, AgentCard>>,
}

impl A2aClient {
    pub fn new(timeout: Duration, cookies: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Dispatch(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            cookies,
            cards: RwLock::new(HashMap::new()),
        })
    }

    async fn endpoint_for(&self, assistant_id: &str) -> Result<String> {
        let cards = self.cards.read().await;
        let card = cards
            .get(assistant_id)
            .ok_or_else(|| Error::Dispatch(format!("Assistant {assistant_id} is not registered")))?;
        card.url
            .clone()
            .ok_or_else(|| Error::Dispatch(format!("Agent card for {assistant_id} has no url")))
    }
}

#[async_trait]
impl TaskDispatcher for A2aClient {
    async fn register(&self, assistant_id: &str, card: AgentCard) -> Result<()> {
        self.cards.write().await.insert(assistant_id.to_string(), card);
        Ok(())
    }

    async fn send_task(&self, assistant_id: &str, params: TaskSendParams) -> Result<Task> {
        let url = self.endpoint_for(assistant_id).await?;
        let request = JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION,
            id: &params.id,
            method: METHOD_TASKS_SEND,
            params: &params,
        };

        debug!("Sending task {} to {} at {}", params.id, assistant_id, url);

        let mut builder = self.http.post(&url).json(&request);
        if let Some(ref cookies) = self.cookies {
            builder = builder.header(COOKIE, cookies);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Dispatch(format!("Request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Dispatch(format!("{url} returned {status}: {body}")));
        }

        let rpc: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| Error::Dispatch(format!("Invalid JSON-RPC response: {e}")))?;

        match (rpc.result, rpc.error) {
            (_, Some(err)) => Err(Error::Dispatch(format!(
                "Remote agent error {}: {}",
                err.code, err.message
            ))),
            (Some(result), None) => Ok(serde_json::from_value(result)?),
            (None, None) => Err(Error::Dispatch("Empty JSON-RPC response".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2a::types::{TaskMessage, TaskState};
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn card(url: String) -> AgentCard {
        AgentCard {
            name: Some("Code Reviewer".to_string()),
            url: Some(url),
            ..AgentCard::default()
        }
    }

    #[tokio::test]
    async fn test_send_task_posts_json_rpc() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/reviewer")
            .match_header("cookie", "session=abc")
            .match_body(Matcher::PartialJson(json!({
                "jsonrpc": "2.0",
                "id": "task-1",
                "method": "tasks/send",
                "params": {
                    "id": "task-1",
                    "message": {"role": "user", "parts": [{"type": "text", "text": "review this"}]}
                }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "jsonrpc": "2.0",
                    "id": "task-1",
                    "result": {"id": "task-1", "status": {"state": "completed"}}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client =
            A2aClient::new(Duration::from_secs(5), Some("session=abc".to_string())).unwrap();
        client
            .register("asst-1", card(format!("{}/reviewer", server.url())))
            .await
            .unwrap();

        let task = client
            .send_task(
                "asst-1",
                TaskSendParams::new("task-1", TaskMessage::user_text("review this")),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(task.id, "task-1");
        assert_eq!(task.status.state, TaskState::Completed);
    }

    #[tokio::test]
    async fn test_rpc_error_is_dispatch_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","id":"t","error":{"code":-32001,"message":"Task not found"}}"#)
            .create_async()
            .await;

        let client = A2aClient::new(Duration::from_secs(5), None).unwrap();
        client.register("a", card(format!("{}/", server.url()))).await.unwrap();

        let err = client
            .send_task("a", TaskSendParams::new("t", TaskMessage::user_text("hi")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Dispatch(msg) if msg.contains("Task not found")));
    }

    #[tokio::test]
    async fn test_unregistered_assistant() {
        let client = A2aClient::new(Duration::from_secs(5), None).unwrap();
        let err = client
            .send_task("ghost", TaskSendParams::new("t", TaskMessage::user_text("hi")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Dispatch(msg) if msg.contains("not registered")));
    }

    #[tokio::test]
    async fn test_card_without_url() {
        let client = A2aClient::new(Duration::from_secs(5), None).unwrap();
        client.register("a", AgentCard::default()).await.unwrap();
        let err = client
            .send_task("a", TaskSendParams::new("t", TaskMessage::user_text("hi")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Dispatch(msg) if msg.contains("no url")));
    }
}
