//! Concierge - routes chat messages to assistants from a remote registry
//!
//! The library loads the assistant directory, exposes it to a chat model
//! as tools, and dispatches requests to assistants as A2A tasks.

pub mod a2a;
pub mod adapters;
pub mod agent;
pub mod config;
pub mod directory;
pub mod error;
pub mod manager;
pub mod shell;
pub mod tools;
pub mod ui;

pub use error::{Error, Result};
