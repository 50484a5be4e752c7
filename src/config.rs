//! Configuration management
//!
//! Settings are read once from the process environment and never mutated.

use std::time::Duration;

use url::Url;

use crate::error::Error;
use crate::Result;

const DEFAULT_PORT: u16 = 3978;
const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Chat model backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatProvider {
    /// Any OpenAI-compatible chat completions endpoint.
    OpenAi { base_url: String },
    /// Azure OpenAI deployment.
    Azure { endpoint: String, api_version: String },
    /// Google Gemini `generateContent`.
    Gemini,
}

impl ChatProvider {
    pub fn name(&self) -> &'static str {
        match self {
            ChatProvider::OpenAi { .. } => "openai",
            ChatProvider::Azure { .. } => "azure",
            ChatProvider::Gemini => "gemini",
        }
    }
}

/// Process-wide settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Bind address of the HTTP bot endpoint
    pub host: String,

    /// Listen port of the HTTP bot endpoint
    pub port: u16,

    /// Model (or Azure deployment) name
    pub chat_model: String,

    pub provider: ChatProvider,

    pub api_key: String,

    /// Registry base URL, without trailing slash
    pub upstream_base_url: String,

    /// Raw `Cookie` header value forwarded to the registry
    pub auth_cookies: Option<String>,

    pub request_timeout: Duration,

    /// Maximum LLM/tool round trips per message
    pub max_iterations: usize,

    pub telegram: TelegramSettings,

    /// Default log filter when `RUST_LOG` is not set
    pub log_level: String,
}

#[derive(Debug, Clone, Default)]
pub struct TelegramSettings {
    pub token: Option<String>,
    pub allow_from: Vec<String>,
}

impl TelegramSettings {
    pub fn enabled(&self) -> bool {
        self.token.is_some()
    }
}

impl Settings {
    /// Load settings from the process environment (after `.env`, if any).
    pub fn from_env() -> Result<Self> {
        // A missing .env file is fine; a malformed one is not.
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(e) if e.not_found() => {}
            Err(e) => return Err(Error::Config(format!("Failed to read .env: {e}"))),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| Error::Config(format!("{key} must be set")))
        };

        let port = parse_or(&get, "PORT", DEFAULT_PORT)?;
        let timeout_secs = parse_or(&get, "REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        let max_iterations = parse_or(&get, "MAX_ITERATIONS", DEFAULT_MAX_ITERATIONS)?;
        if max_iterations == 0 {
            return Err(Error::Config("MAX_ITERATIONS must be at least 1".to_string()));
        }

        let chat_model = get("CHAT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_key = get("CHAT_API_KEY")
            .or_else(|| get("OPENAI_API_KEY"))
            .ok_or_else(|| Error::Config("CHAT_API_KEY must be set".to_string()))?;

        let provider = match get("CHAT_MODEL_PROVIDER").as_deref().unwrap_or("openai") {
            "openai" => ChatProvider::OpenAi {
                base_url: validate_url(
                    "OPENAI_BASE_URL",
                    &get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
                )?,
            },
            "azure" => {
                let (Some(endpoint), Some(api_version)) =
                    (get("AZURE_OPENAI_ENDPOINT"), get("AZURE_OPENAI_API_VERSION"))
                else {
                    return Err(Error::Config(
                        "Azure configuration is incomplete. Set AZURE_OPENAI_ENDPOINT and AZURE_OPENAI_API_VERSION."
                            .to_string(),
                    ));
                };
                ChatProvider::Azure {
                    endpoint: validate_url("AZURE_OPENAI_ENDPOINT", &endpoint)?,
                    api_version,
                }
            }
            "gemini" => ChatProvider::Gemini,
            other => {
                return Err(Error::Config(format!(
                    "Unknown CHAT_MODEL_PROVIDER: {other} (expected openai, azure or gemini)"
                )))
            }
        };

        let upstream_base_url =
            validate_url("ASSISTANTS_BASE_URL", &require("ASSISTANTS_BASE_URL")?)?;

        let telegram = TelegramSettings {
            token: get("TELEGRAM_BOT_TOKEN"),
            allow_from: get("TELEGRAM_ALLOW_FROM")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
        };

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            chat_model,
            provider,
            api_key,
            upstream_base_url,
            auth_cookies: get("ASSISTANTS_AUTH_COOKIES"),
            request_timeout: Duration::from_secs(timeout_secs),
            max_iterations,
            telegram,
            log_level: get("LOG_LEVEL")
                .map(|l| l.to_lowercase())
                .unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn parse_or<G, T>(get: &G, key: &str, default: T) -> Result<T>
where
    G: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("{key} is invalid ({raw}): {e}"))),
        None => Ok(default),
    }
}

/// Check that `raw` is an absolute http(s) URL and strip trailing slashes.
fn validate_url(key: &str, raw: &str) -> Result<String> {
    let parsed = Url::parse(raw)
        .map_err(|e| Error::Config(format!("{key} is not a valid URL ({raw}): {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::Config(format!("{key} must use http or https: {raw}")));
    }
    Ok(raw.trim_end_matches('/').to_string())
}
