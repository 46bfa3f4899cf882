use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::{ConnectionDescriptor, DEFAULT_API_VERSION};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Clone)]
pub struct Config {
    pub openai_endpoint: String,
    pub openai_api_key: String,
    pub openai_deployment: String,
    pub openai_api_version: String,
    /// Transport timeout for chat calls. `None` waits for the remote service.
    pub llm_timeout: Option<Duration>,
    /// Directory overriding the built-in reference blocks.
    pub knowledge_dir: Option<PathBuf>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            openai_endpoint: require_env("AZURE_OPENAI_ENDPOINT")?,
            openai_api_key: require_env("AZURE_OPENAI_API_KEY")?,
            openai_deployment: require_env("AZURE_OPENAI_DEPLOYMENT")?,
            openai_api_version: optional_env("AZURE_OPENAI_API_VERSION")
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            llm_timeout: parse_timeout(optional_env("LLM_TIMEOUT_SECS").as_deref())?,
            knowledge_dir: optional_env("KNOWLEDGE_DIR").map(PathBuf::from),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn connection(&self) -> ConnectionDescriptor {
        ConnectionDescriptor::new(
            &self.openai_endpoint,
            &self.openai_api_key,
            &self.openai_deployment,
        )
        .with_api_version(&self.openai_api_version)
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and blank variables are both treated as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_timeout(raw: Option<&str>) -> Result<Option<Duration>> {
    raw.map(|v| {
        v.trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .context("LLM_TIMEOUT_SECS must be a whole number of seconds")
    })
    .transpose()
}
