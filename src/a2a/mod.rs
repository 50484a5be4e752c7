//! Agent-to-agent task dispatch.
//!
//! The [`TaskDispatcher`] trait is the seam the assistant manager talks to;
//! [`A2aClient`] is the JSON-RPC implementation used in production.

mod client;
pub mod types;

use async_trait::async_trait;

use crate::Result;

pub use client::{A2aClient, METHOD_TASKS_SEND};
pub use types::{AgentCard, Part, Task, TaskMessage, TaskSendParams, TaskState};

/// Capability to submit tasks to remote assistants.
#[async_trait]
pub trait TaskDispatcher: Send + Sync {
    /// Make an assistant reachable under `assistant_id`.
    async fn register(&self, assistant_id: &str, card: AgentCard) -> Result<()>;

    /// Submit a task to a previously registered assistant.
    async fn send_task(&self, assistant_id: &str, params: TaskSendParams) -> Result<Task>;
}
