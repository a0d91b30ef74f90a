use crate::constants::*;
use crate::redaction::RedactionLevel;
use crate::relay::Relay;
use clap::{Parser, Subcommand};
use std::fmt;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the relay HTTP service
    Serve(ServeArgs),
    /// Chat with a running relay from the terminal
    Chat(ChatArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, default_value_t = 8080)]
    pub port: u16,
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,
    #[arg(long, default_value_t = 120)]
    pub request_timeout_secs: u64,
    #[arg(long, default_value_t = 10)]
    pub connect_timeout_secs: u64,
    #[arg(long, default_value_t = 1024 * 1024)]
    pub max_body_size: usize,
    #[arg(long, default_value = ".")]
    pub log_dir: String,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ChatArgs {
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    pub url: String,
    /// Persona to start with; `/persona` changes it mid-conversation
    #[arg(long)]
    pub persona: Option<String>,
    #[arg(long, default_value_t = 120)]
    pub request_timeout_secs: u64,
    #[arg(long, default_value = ".")]
    pub log_dir: String,
}

/// Provider settings read from the deployment environment.
#[derive(Clone)]
pub struct RelayConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub default_persona: Option<String>,
    pub redaction: RedactionLevel,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            default_persona: None,
            redaction: RedactionLevel::Normal,
        }
    }
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("default_persona", &self.default_persona)
            .field("redaction", &self.redaction)
            .finish()
    }
}

impl RelayConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            api_key: get(ENV_PROVIDER_TOKEN).map(|v| v.trim().to_string()),
            base_url: get(ENV_PROVIDER_BASE_URL).unwrap_or(defaults.base_url),
            model: get(ENV_PROVIDER_MODEL).unwrap_or(defaults.model),
            default_persona: get(ENV_DEFAULT_PERSONA),
            redaction: RedactionLevel::parse(&lookup("REDACTION_LEVEL").unwrap_or_default()),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
}

impl AppState {
    pub fn new(relay: Relay) -> Self {
        Self {
            relay: Arc::new(relay),
        }
    }
}
