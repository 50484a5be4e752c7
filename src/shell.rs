//! Bot shell - the glue between a chat channel and the message processor.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::agent::{InboundMessage, MessageProcessor};
use crate::manager::AssistantManager;
use crate::Result;

/// Reply sent when processing a message fails.
pub const APOLOGY: &str = "Sorry, something went wrong while handling your message.";

/// Outbound side of a conversation, implemented per channel.
#[async_trait]
pub trait Replier: Send + Sync {
    /// Show a typing indicator.
    async fn typing(&self) -> Result<()>;

    /// Post a text reply.
    async fn reply(&self, text: &str) -> Result<()>;
}

pub struct BotShell {
    manager: Arc<AssistantManager>,
    processor: MessageProcessor,
}

impl BotShell {
    pub fn new(manager: Arc<AssistantManager>, processor: MessageProcessor) -> Self {
        Self { manager, processor }
    }

    /// Load the assistant table, then start the conversation.
    pub async fn start(&self) -> Result<()> {
        self.manager.initialize().await?;
        self.processor.initialize().await?;
        info!(
            "Bot shell started with {} assistants",
            self.manager.get_all_assistants().await.len()
        );
        Ok(())
    }

    pub fn manager(&self) -> &Arc<AssistantManager> {
        &self.manager
    }

    /// Handle one inbound message. Never fails: processing errors are logged
    /// and answered with [`APOLOGY`].
    pub async fn handle(&self, message: &InboundMessage, replier: &dyn Replier) {
        debug!("Inbound on {}: {}", message.session_key(), message.content);

        if let Err(e) = replier.typing().await {
            warn!("Failed to send typing indicator: {}", e);
        }

        let text = match self.processor.process_message(&message.content).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("Error processing message from {}: {}", message.session_key(), e);
                APOLOGY.to_string()
            }
        };

        if let Err(e) = replier.reply(&text).await {
            error!("Failed to deliver reply to {}: {}", message.session_key(), e);
        }
    }
}
