//! Agent module - conversation with the chat model.
//!
//! This module contains:
//! - Message types (Message, InboundMessage)
//! - LLM client trait and implementations
//! - The message processor that routes user text through the model
//!
//! # Adding a New LLM Provider
//!
//! See [`llm::ProviderRegistry`] for instructions.

mod message;
mod processor;

// LLM providers in submodule
pub mod llm;

// Re-exports for convenience
pub use llm::{GeminiClient, LlmClient, LlmResponse, OpenAiClient, ProviderRegistry, Usage};
pub use message::{InboundMessage, Message, Role, ToolCallRequest};
pub use processor::{MessageProcessor, FALLBACK_REPLY};
