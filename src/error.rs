//! Error types for Concierge

use thiserror::Error;

/// Result type alias for Concierge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Concierge
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport or format failure talking to the registry or agent-card endpoints.
    #[error("Upstream error{}", upstream_detail(.status, .code, .body))]
    Upstream {
        status: Option<u16>,
        code: Option<String>,
        body: Option<String>,
    },

    #[error("Assistant not found: {name}")]
    AssistantNotFound { name: String },

    #[error("Duplicate assistant name in registry: {name}")]
    DuplicateAssistant { name: String },

    #[error("Message processor used before initialize()")]
    Uninitialized,

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Task dispatch error: {0}")]
    Dispatch(String),

    #[error("Max iterations reached")]
    MaxIterations,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Upstream answered, but not with what we expected.
    pub fn invalid_format(body: impl Into<String>) -> Self {
        Error::Upstream {
            status: None,
            code: Some("invalid_format".to_string()),
            body: Some(body.into()),
        }
    }

    /// Map a reqwest failure into an upstream error.
    pub fn upstream_transport(err: reqwest::Error) -> Self {
        let code = if err.is_timeout() {
            "timeout"
        } else if err.is_decode() {
            "invalid_format"
        } else {
            "transport"
        };
        Error::Upstream {
            status: err.status().map(|s| s.as_u16()),
            code: Some(code.to_string()),
            body: Some(err.to_string()),
        }
    }

    /// Upstream replied with a non-success status.
    pub fn upstream_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        Error::Upstream {
            status: Some(status),
            code: Some("http_status".to_string()),
            body: (!body.is_empty()).then_some(body),
        }
    }
}

fn upstream_detail(status: &Option<u16>, code: &Option<String>, body: &Option<String>) -> String {
    let mut out = String::new();
    if let Some(status) = status {
        out.push_str(&format!(" (HTTP {status})"));
    }
    if let Some(code) = code {
        out.push_str(&format!(" [{code}]"));
    }
    out.push_str(": ");
    out.push_str(body.as_deref().unwrap_or("no response body"));
    out
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}
