//! HTTP adapter - JSON activity endpoint on axum

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::Channel;
use crate::agent::InboundMessage;
use crate::shell::{BotShell, Replier};
use crate::Result;

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// One outbound event, in the order the shell produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Activity {
    Typing,
    Message { text: String },
}

/// Reply to `POST /api/messages`.
///
/// `conversation_id` is echoed for client-side correlation only. Every
/// channel feeds the same conversation, so turns from other callers are
/// part of the context the model sees.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub conversation_id: String,
    pub activities: Vec<Activity>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub assistants: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Collects activities for a single request/response exchange.
#[derive(Default)]
struct ActivityCollector {
    activities: Mutex<Vec<Activity>>,
}

impl ActivityCollector {
    fn into_activities(self) -> Vec<Activity> {
        self.activities.into_inner().unwrap_or_else(|e| e.into_inner())
    }

    fn push(&self, activity: Activity) {
        self.activities
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(activity);
    }
}

#[async_trait]
impl Replier for ActivityCollector {
    async fn typing(&self) -> Result<()> {
        self.push(Activity::Typing);
        Ok(())
    }

    async fn reply(&self, text: &str) -> Result<()> {
        self.push(Activity::Message {
            text: text.to_string(),
        });
        Ok(())
    }
}

pub fn router(shell: Arc<BotShell>) -> Router {
    Router::new()
        .route("/api/messages", post(messages))
        .route("/api/health", get(health))
        .route("/api/assistants", get(assistants))
        .with_state(shell)
}

pub async fn messages(
    State(shell): State<Arc<BotShell>>,
    Json(request): Json<MessageRequest>,
) -> std::result::Result<Json<MessageResponse>, (StatusCode, Json<ErrorResponse>)> {
    let text = request.text.trim();
    if text.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "text must not be empty".to_string(),
            }),
        ));
    }

    let conversation_id = request
        .conversation_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let inbound = InboundMessage::from_chat("http", conversation_id.clone(), "http", text);

    let collector = ActivityCollector::default();
    shell.handle(&inbound, &collector).await;

    Ok(Json(MessageResponse {
        conversation_id,
        activities: collector.into_activities(),
    }))
}

pub async fn health(State(shell): State<Arc<BotShell>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        assistants: shell.manager().get_all_assistants().await.len(),
    })
}

pub async fn assistants(State(shell): State<Arc<BotShell>>) -> Json<Vec<String>> {
    let names = shell
        .manager()
        .get_all_assistants()
        .await
        .into_iter()
        .map(|a| a.name)
        .collect();
    Json(names)
}

/// Serves the activity endpoint on `host:port`.
pub struct HttpChannel {
    shell: Arc<BotShell>,
    address: String,
}

impl HttpChannel {
    pub fn new(shell: Arc<BotShell>, host: &str, port: u16) -> Self {
        Self {
            shell,
            address: format!("{host}:{port}"),
        }
    }
}

impl Channel for HttpChannel {
    fn name(&self) -> &str {
        "http"
    }

    fn start(&self) -> impl std::future::Future<Output = Result<()>> + Send {
        let app = router(self.shell.clone());
        let address = self.address.clone();

        async move {
            let listener = tokio::net::TcpListener::bind(&address).await?;
            info!("HTTP channel listening on {}", address);
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await?;
            info!("HTTP channel stopped");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::llm::FakeLlmClient;
    use crate::agent::MessageProcessor;
    use crate::manager::testing::manager_with;
    use crate::shell::APOLOGY;

    async fn started_with(client: Arc<FakeLlmClient>, names: &[&str]) -> Arc<BotShell> {
        let (manager, _, _) = manager_with(names);
        let processor = MessageProcessor::new(Box::new(client), manager.clone(), 5);
        let shell = Arc::new(BotShell::new(manager, processor));
        shell.start().await.unwrap();
        shell
    }

    async fn started(responses: Vec<&str>, names: &[&str]) -> Arc<BotShell> {
        started_with(Arc::new(FakeLlmClient::new(responses)), names).await
    }

    fn request(text: &str, conversation_id: &str) -> Json<MessageRequest> {
        Json(MessageRequest {
            text: text.to_string(),
            conversation_id: Some(conversation_id.to_string()),
        })
    }

    #[tokio::test]
    async fn test_conversation_ids_share_one_history() {
        let client = Arc::new(FakeLlmClient::new(vec!["first", "second"]));
        let shell = started_with(client.clone(), &[]).await;

        messages(State(shell.clone()), request("from alice", "conv-a")).await.unwrap();
        let Json(response) = messages(State(shell), request("from bob", "conv-b")).await.unwrap();
        assert_eq!(response.conversation_id, "conv-b");

        let calls = client.calls.lock().unwrap();
        let seen: Vec<&str> = calls[1].iter().map(|m| m.content.as_str()).collect();
        assert!(seen.contains(&"from alice"));
        assert_eq!(seen.last(), Some(&"from bob"));
    }

    #[tokio::test]
    async fn test_messages_returns_typing_then_reply() {
        let shell = started(vec!["Hi!"], &[]).await;

        let Json(response) = messages(
            State(shell),
            Json(MessageRequest {
                text: "hello".to_string(),
                conversation_id: Some("conv-1".to_string()),
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.conversation_id, "conv-1");
        assert_eq!(
            response.activities,
            vec![
                Activity::Typing,
                Activity::Message {
                    text: "Hi!".to_string()
                }
            ]
        );
    }

    #[tokio::test]
    async fn test_messages_apologises_on_failure() {
        let shell = started(vec![], &[]).await;

        let Json(response) = messages(
            State(shell),
            Json(MessageRequest {
                text: "hello".to_string(),
                conversation_id: None,
            }),
        )
        .await
        .unwrap();

        assert!(!response.conversation_id.is_empty());
        assert_eq!(
            response.activities.last(),
            Some(&Activity::Message {
                text: APOLOGY.to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_messages_rejects_empty_text() {
        let shell = started(vec![], &[]).await;

        let (status, _) = messages(
            State(shell),
            Json(MessageRequest {
                text: "   ".to_string(),
                conversation_id: None,
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health_and_assistants() {
        let shell = started(vec![], &["Code Reviewer", "Translator"]).await;

        let Json(h) = health(State(shell.clone())).await;
        assert_eq!(h.status, "ok");
        assert_eq!(h.assistants, 2);

        let Json(names) = assistants(State(shell)).await;
        assert_eq!(names, vec!["Code Reviewer", "Translator"]);
    }

    #[test]
    fn test_activity_wire_shape() {
        let json = serde_json::to_value(vec![
            Activity::Typing,
            Activity::Message {
                text: "hi".to_string(),
            },
        ])
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!([{"type": "typing"}, {"type": "message", "text": "hi"}])
        );
    }
}
