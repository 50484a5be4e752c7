//! Adapters module - chat platform integrations.
//!
//! Each adapter turns platform traffic into [`InboundMessage`]s for the
//! [`BotShell`] and implements [`Replier`] for its outbound side.
//!
//! # Supported Channels
//!
//! - **HTTP** - JSON activity endpoint served by axum
//! - **Telegram** - Telegram Bot API via teloxide
//! - **CLI** - Interactive command line interface
//!
//! # Adding a New Channel
//!
//! 1. Create a new file (e.g., `slack.rs`)
//! 2. Implement the [`Channel`] trait and a [`Replier`]
//! 3. Add to [`ChannelRegistry`]
//!
//! [`InboundMessage`]: crate::agent::InboundMessage
//! [`BotShell`]: crate::shell::BotShell
//! [`Replier`]: crate::shell::Replier

pub mod cli;
pub mod http;
pub mod telegram;

pub use cli::CliChannel;
pub use http::HttpChannel;
pub use telegram::TelegramChannel;

use crate::config::Settings;

/// Channel trait for chat adapters.
///
/// All channel implementations must be [`Send`] + [`Sync`] for async compatibility.
pub trait Channel: Send + Sync {
    /// Channel name (e.g., "http", "telegram").
    fn name(&self) -> &str;

    /// Start listening for messages. Resolves when the channel shuts down.
    fn start(&self) -> impl std::future::Future<Output = crate::Result<()>> + Send;
}

/// Channel registry - metadata about available channels.
pub struct ChannelRegistry;

impl ChannelRegistry {
    /// List all available channel names.
    pub fn available() -> &'static [&'static str] {
        &["http", "telegram", "cli"]
    }

    /// Check if a channel is enabled by the settings.
    pub fn is_enabled(name: &str, settings: &Settings) -> bool {
        match name {
            "http" | "cli" => true,
            "telegram" => settings.telegram.enabled(),
            _ => false,
        }
    }

    /// Get a human-readable description of a channel.
    pub fn description(name: &str) -> &'static str {
        match name {
            "http" => "JSON activity endpoint",
            "telegram" => "Telegram Bot API",
            "cli" => "Interactive command line interface",
            _ => "Unknown channel",
        }
    }
}
