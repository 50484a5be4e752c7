//! Assistant directory - the upstream registry of remote assistants.
//!
//! [`AssistantDirectory`] is implemented over HTTP by [`HttpDirectory`].

mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::a2a::AgentCard;
use crate::Result;

pub use http::{HttpDirectory, MAX_PAGES, PAGE_SIZE};

/// A remote assistant known to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assistant {
    /// Opaque identifier assigned by the registry
    pub id: String,

    /// Display name, used as the lookup key
    pub name: String,

    #[serde(default)]
    pub slug: String,

    /// Detail endpoint, derived from the base URL and `id`
    pub url: String,

    /// Agent-card endpoint, derived from the base URL and `id`
    pub agent_card_url: String,
}

impl Assistant {
    /// Build an assistant and derive its endpoints from `base_url`.
    pub fn new(
        base_url: &str,
        id: impl Into<String>,
        name: impl Into<String>,
        slug: impl Into<String>,
    ) -> Self {
        let id = id.into();
        let base = base_url.trim_end_matches('/');
        Self {
            url: format!("{base}/a2a/assistants/{id}"),
            agent_card_url: format!("{base}/a2a/assistants/{id}/.well-known/agent.json"),
            id,
            name: name.into(),
            slug: slug.into(),
        }
    }
}

/// Source of assistants and their agent cards.
#[async_trait]
pub trait AssistantDirectory: Send + Sync {
    /// Fetch the full list of assistants.
    async fn fetch_assistants(&self) -> Result<Vec<Assistant>>;

    /// Fetch the agent card published at `url`.
    async fn fetch_agent_card(&self, url: &str) -> Result<AgentCard>;
}
