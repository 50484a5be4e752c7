//! Telegram adapter using teloxide

use std::sync::Arc;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, User};
use tracing::{debug, error, info};

use super::Channel;
use crate::agent::InboundMessage;
use crate::config::TelegramSettings;
use crate::error::Error;
use crate::shell::{BotShell, Replier};
use crate::Result;

/// Telegram channel adapter
#[derive(Clone)]
pub struct TelegramChannel {
    bot: Bot,
    allow_from: Arc<Vec<String>>,
    shell: Arc<BotShell>,
}

impl TelegramChannel {
    pub fn new(settings: &TelegramSettings, shell: Arc<BotShell>) -> Result<Self> {
        let token = settings
            .token
            .as_deref()
            .ok_or_else(|| Error::Config("TELEGRAM_BOT_TOKEN must be set".to_string()))?;
        Ok(Self {
            bot: Bot::new(token),
            allow_from: Arc::new(settings.allow_from.clone()),
            shell,
        })
    }

    async fn handle_message(&self, message: teloxide::types::Message) -> Result<()> {
        let chat_id = message.chat.id;
        let user = message.from();

        if !is_allowed(&self.allow_from, user) {
            debug!("Ignoring message from unauthorized user: {:?}", user.map(|u| u.id));
            return Ok(());
        }

        // Non-text messages are ignored
        let Some(text) = message.text() else {
            return Ok(());
        };

        info!("Received message from {}: {}", chat_id, text);

        let sender = user.map(|u| u.id.to_string()).unwrap_or_default();
        let inbound = InboundMessage::from_chat("telegram", chat_id.to_string(), sender, text);
        let replier = TelegramReplier {
            bot: self.bot.clone(),
            chat_id,
        };
        self.shell.handle(&inbound, &replier).await;
        Ok(())
    }
}

/// An empty allow-list admits everyone; otherwise match username or numeric id.
fn is_allowed(allow_from: &[String], user: Option<&User>) -> bool {
    if allow_from.is_empty() {
        return true;
    }

    let Some(user) = user else { return false };
    let username = user.username.as_deref().unwrap_or("");
    let id = user.id.to_string();

    allow_from
        .iter()
        .any(|allowed| allowed == username || allowed == &id)
}

struct TelegramReplier {
    bot: Bot,
    chat_id: ChatId,
}

#[async_trait]
impl Replier for TelegramReplier {
    async fn typing(&self) -> Result<()> {
        self.bot.send_chat_action(self.chat_id, ChatAction::Typing).await?;
        Ok(())
    }

    async fn reply(&self, text: &str) -> Result<()> {
        self.bot.send_message(self.chat_id, text).await?;
        Ok(())
    }
}

async fn run_telegram_loop(channel: TelegramChannel) {
    let handler = Update::filter_message().endpoint(
        |msg: teloxide::types::Message, channel: TelegramChannel| async move {
            if let Err(e) = channel.handle_message(msg).await {
                error!("Error handling telegram message: {}", e);
            }
            respond(())
        },
    );

    Dispatcher::builder(channel.bot.clone(), handler)
        .dependencies(dptree::deps![channel])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn start(&self) -> impl std::future::Future<Output = Result<()>> + Send {
        let this = self.clone();

        async move {
            info!("Starting Telegram bot...");
            run_telegram_loop(this).await;
            info!("Telegram bot stopped");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::UserId;

    fn user(id: u64, username: Option<&str>) -> User {
        User {
            id: UserId(id),
            is_bot: false,
            first_name: "Test".to_string(),
            last_name: None,
            username: username.map(str::to_string),
            language_code: None,
            is_premium: false,
            added_to_attachment_menu: false,
        }
    }

    #[test]
    fn test_empty_allow_list_admits_all() {
        assert!(is_allowed(&[], None));
        assert!(is_allowed(&[], Some(&user(1, None))));
    }

    #[test]
    fn test_allow_list_by_username_or_id() {
        let allow = vec!["alice".to_string(), "42".to_string()];
        assert!(is_allowed(&allow, Some(&user(1, Some("alice")))));
        assert!(is_allowed(&allow, Some(&user(42, None))));
        assert!(!is_allowed(&allow, Some(&user(7, Some("mallory")))));
        assert!(!is_allowed(&allow, None));
    }

    #[test]
    fn test_new_requires_token() {
        let (manager, _, _) = crate::manager::testing::manager_with(&[]);
        let processor = crate::agent::MessageProcessor::new(
            Box::new(crate::agent::llm::FakeLlmClient::new(vec![])),
            manager.clone(),
            1,
        );
        let shell = Arc::new(BotShell::new(manager, processor));

        let err = TelegramChannel::new(&TelegramSettings::default(), shell).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }
}
