//! LLM client abstraction layer.
//!
//! This module provides:
//! - [`LlmClient`] trait for swappable LLM providers
//! - [`ProviderRegistry`] for creating the configured provider
//! - Concrete implementations: OpenAI-compatible (incl. Azure), Gemini
//!
//! # Adding a New Provider
//!
//! 1. Create a new file (e.g., `anthropic.rs`)
//! 2. Implement `LlmClient` trait
//! 3. Add a [`ChatProvider`] variant in `config.rs`
//! 4. Add to `ProviderRegistry::create()`

mod types;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{ChatProvider, Settings};
use crate::error::Error;
use crate::tools::ToolDefinition;
use crate::Result;

pub use types::*;

pub mod gemini;
pub mod openai;

pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

use super::message::{Message, ToolCallRequest};

/// Response from an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Text content of the response.
    pub content: Option<String>,

    /// Tool calls requested by the LLM.
    pub tool_calls: Vec<ToolCallRequest>,

    /// Reason the response finished.
    pub finish_reason: String,

    /// Token usage statistics.
    pub usage: Usage,
}

impl LlmResponse {
    /// Create a simple text response.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: vec![],
            finish_reason: "stop".to_string(),
            usage: Usage::default(),
        }
    }

    /// Check if response has tool calls.
    #[inline]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Token usage information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// LLM client trait - swappable provider abstraction.
///
/// The model decides whether and which of the offered tools to call; the
/// caller only supplies the tool set and executes what comes back.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send messages and get response.
    async fn chat(&self, messages: &[Message], tools: &[ToolDefinition]) -> Result<LlmResponse>;

    /// Get the default model for this provider.
    fn default_model(&self) -> &str;
}

/// Provider registry - creates the LLM client named in the settings.
///
/// # Example
///
/// ```ignore
/// let client = ProviderRegistry::create(&settings)?;
/// let response = client.chat(&messages, &tools).await?;
/// ```
pub struct ProviderRegistry;

impl ProviderRegistry {
    /// Create an LLM client from settings.
    ///
    /// Supported providers:
    /// - `"openai"`: OpenAI chat completions (or any compatible endpoint)
    /// - `"azure"`: Azure OpenAI deployment
    /// - `"gemini"`: Gemini API with API key authentication
    pub fn create(settings: &Settings) -> Result<Box<dyn LlmClient>> {
        let timeout = settings.request_timeout;
        match &settings.provider {
            ChatProvider::OpenAi { base_url } => Ok(Box::new(OpenAiClient::new(
                base_url,
                &settings.api_key,
                &settings.chat_model,
                timeout,
            )?)),
            ChatProvider::Azure { endpoint, api_version } => Ok(Box::new(OpenAiClient::azure(
                endpoint,
                api_version,
                &settings.api_key,
                &settings.chat_model,
                timeout,
            )?)),
            ChatProvider::Gemini => Ok(Box::new(GeminiClient::new(
                &settings.api_key,
                &settings.chat_model,
                timeout,
            )?)),
        }
    }

    /// List available provider names.
    pub fn available() -> &'static [&'static str] {
        &["openai", "azure", "gemini"]
    }
}

pub(crate) fn http_client(timeout: std::time::Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Llm(format!("Failed to create HTTP client: {e}")))
}

/// Fake LLM client for testing.
#[cfg(test)]
pub struct FakeLlmClient {
    responses: std::sync::Mutex<std::collections::VecDeque<LlmResponse>>,
    /// Every message list the client was called with.
    pub calls: std::sync::Mutex<Vec<Vec<Message>>>,
}

#[cfg(test)]
impl FakeLlmClient {
    /// Create with predefined text responses.
    pub fn new(responses: Vec<&str>) -> Self {
        Self::scripted(responses.iter().map(|s| LlmResponse::text(*s)).collect())
    }

    /// Create with an arbitrary response script.
    pub fn scripted(responses: Vec<LlmResponse>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses.into()),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Create with a single tool call followed by a text response.
    pub fn with_tool_call(name: &str, args: serde_json::Value, final_response: &str) -> Self {
        Self::scripted(vec![
            Self::tool_call(name, args),
            LlmResponse::text(final_response),
        ])
    }

    pub fn tool_call(name: &str, args: serde_json::Value) -> LlmResponse {
        LlmResponse {
            content: None,
            tool_calls: vec![ToolCallRequest {
                id: "tc_1".to_string(),
                name: name.to_string(),
                arguments: args,
            }],
            finish_reason: "tool_calls".to_string(),
            usage: Usage::default(),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl LlmClient for FakeLlmClient {
    async fn chat(&self, messages: &[Message], _tools: &[ToolDefinition]) -> Result<LlmResponse> {
        self.calls.lock().unwrap().push(messages.to_vec());
        let mut responses = self.responses.lock().unwrap();
        responses
            .pop_front()
            .ok_or_else(|| Error::Llm("No more fake responses".to_string()))
    }

    fn default_model(&self) -> &str {
        "fake-model"
    }
}

/// Lets a test keep a handle on the fake after handing it over.
#[cfg(test)]
#[async_trait]
impl LlmClient for std::sync::Arc<FakeLlmClient> {
    async fn chat(&self, messages: &[Message], tools: &[ToolDefinition]) -> Result<LlmResponse> {
        self.as_ref().chat(messages, tools).await
    }

    fn default_model(&self) -> &str {
        self.as_ref().default_model()
    }
}
