//! Assistant manager - name-keyed view over the directory plus task dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::a2a::{AgentCard, TaskDispatcher, TaskMessage, TaskSendParams};
use crate::directory::{Assistant, AssistantDirectory};
use crate::error::Error;
use crate::Result;

/// Outcome of a dispatched task as reported by the remote assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchStatus {
    Success,
    Error,
}

/// Result of [`AssistantManager::send_task_to_assistant`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResponse {
    /// Correlation id, fresh for every dispatch
    pub id: String,
    pub status: DispatchStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Default)]
struct Table {
    /// Registry order of the last fetch
    assistants: Vec<Assistant>,
    by_name: HashMap<String, usize>,
}

impl Table {
    fn build(assistants: Vec<Assistant>) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(assistants.len());
        for (idx, assistant) in assistants.iter().enumerate() {
            if by_name.insert(assistant.name.clone(), idx).is_some() {
                return Err(Error::DuplicateAssistant {
                    name: assistant.name.clone(),
                });
            }
        }
        Ok(Self { assistants, by_name })
    }

    fn get(&self, name: &str) -> Option<&Assistant> {
        self.by_name.get(name).map(|&idx| &self.assistants[idx])
    }
}

/// Holds the assistants from the latest directory fetch.
pub struct AssistantManager {
    directory: Arc<dyn AssistantDirectory>,
    dispatcher: Arc<dyn TaskDispatcher>,
    table: RwLock<Table>,
}

impl AssistantManager {
    pub fn new(
        directory: Arc<dyn AssistantDirectory>,
        dispatcher: Arc<dyn TaskDispatcher>,
    ) -> Self {
        Self {
            directory,
            dispatcher,
            table: RwLock::new(Table::default()),
        }
    }

    /// Fetch the directory and replace the lookup table wholesale.
    ///
    /// Two assistants sharing a name fail the whole refresh with
    /// [`Error::DuplicateAssistant`]; the previous table stays in place.
    pub async fn initialize(&self) -> Result<()> {
        let assistants = self.directory.fetch_assistants().await?;
        let table = Table::build(assistants).map_err(|e| {
            warn!("Rejecting directory contents: {}", e);
            e
        })?;
        info!("Assistant table holds {} entries", table.assistants.len());
        *self.table.write().await = table;
        Ok(())
    }

    /// Exact, case-sensitive lookup.
    pub async fn find_assistant(&self, name: &str) -> Option<Assistant> {
        self.table.read().await.get(name).cloned()
    }

    /// All assistants, in the order of the last fetch.
    pub async fn get_all_assistants(&self) -> Vec<Assistant> {
        self.table.read().await.assistants.clone()
    }

    pub async fn get_assistant_agent_card(&self, name: &str) -> Result<AgentCard> {
        let assistant = self.require(name).await?;
        self.directory.fetch_agent_card(&assistant.agent_card_url).await
    }

    /// Fetch the assistant's card, register it with the dispatcher and submit
    /// `request` as a single user text part.
    ///
    /// Transport and protocol failures are returned as `Err`. A task the remote
    /// side reports as failed or canceled comes back as
    /// [`DispatchStatus::Error`].
    pub async fn send_task_to_assistant(&self, name: &str, request: &str) -> Result<TaskResponse> {
        let assistant = self.require(name).await?;
        let task_id = Uuid::new_v4().to_string();

        let card = self.directory.fetch_agent_card(&assistant.agent_card_url).await?;
        self.dispatcher.register(&assistant.id, card).await?;

        info!("Dispatching task {} to {} ({})", task_id, assistant.name, assistant.id);
        let task = self
            .dispatcher
            .send_task(
                &assistant.id,
                TaskSendParams::new(task_id.clone(), TaskMessage::user_text(request)),
            )
            .await?;

        let (status, message) = if task.status.state.is_failure() {
            let reason = task
                .status
                .message
                .as_ref()
                .map(TaskMessage::text)
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "no reason given".to_string());
            (
                DispatchStatus::Error,
                format!(
                    "{} could not complete the request \"{}\": {}",
                    assistant.name, request, reason
                ),
            )
        } else {
            let mut message =
                format!("Task sent to {} with request: \"{}\"", assistant.name, request);
            let output = task.output_text();
            if !output.is_empty() {
                message.push_str("\n\n");
                message.push_str(&output);
            }
            (DispatchStatus::Success, message)
        };

        Ok(TaskResponse {
            id: task_id,
            status,
            message,
            url: Some(assistant.url),
        })
    }

    async fn require(&self, name: &str) -> Result<Assistant> {
        self.find_assistant(name)
            .await
            .ok_or_else(|| Error::AssistantNotFound {
                name: name.to_string(),
            })
    }
}
