//! API server configuration.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use aiyou_core::auth::TokenConfig;
use aiyou_core::auth::jwt::resolve_jwt_secret;
use aiyou_core::auth::password::DEFAULT_BCRYPT_COST;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3100").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Token signing secret.
    pub jwt_secret: String,
    /// Token lifetime and refresh window.
    pub token: TokenConfig,
    /// Number of documents returned by `retrieve`.
    pub top_k: usize,
    /// Bound on every external call (embedding, store, chat, tools).
    pub call_timeout: Duration,
    /// Ollama base URL for chat completion.
    pub ollama_base_url: String,
    /// Chat model name.
    pub chat_model: String,
    /// bcrypt cost for new password hashes.
    pub bcrypt_cost: u32,
}

fn parsed<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3100".into(),
            database_url: "postgres://localhost:5432/aiyou".into(),
            jwt_secret: String::new(),
            token: TokenConfig::default(),
            top_k: 5,
            call_timeout: Duration::from_secs(30),
            ollama_base_url: "http://localhost:11434".into(),
            chat_model: "aiyou-llm-target".into(),
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                     | Default                           |
    /// |------------------------------|-----------------------------------|
    /// | `BIND_ADDR`                  | `127.0.0.1:3100`                  |
    /// | `DATABASE_URL`               | `postgres://localhost:5432/aiyou` |
    /// | `JWT_SECRET` / `AUTH_SECRET` | generated & persisted to file     |
    /// | `TOKEN_LIFETIME_SECS`        | `1800`                            |
    /// | `REFRESH_WINDOW_SECS`        | `300`                             |
    /// | `RETRIEVAL_TOP_K`            | `5`                               |
    /// | `EXTERNAL_CALL_TIMEOUT_SECS` | `30`                              |
    /// | `OLLAMA_BASE_URL`            | `http://localhost:11434`          |
    /// | `CHAT_MODEL`                 | `aiyou-llm-target`                |
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or(d.bind_addr),
            database_url: env::var("DATABASE_URL").unwrap_or(d.database_url),
            jwt_secret: resolve_jwt_secret(),
            token: TokenConfig {
                lifetime_secs: parsed("TOKEN_LIFETIME_SECS", d.token.lifetime_secs),
                refresh_window_secs: parsed("REFRESH_WINDOW_SECS", d.token.refresh_window_secs),
            },
            top_k: parsed("RETRIEVAL_TOP_K", d.top_k),
            call_timeout: Duration::from_secs(parsed(
                "EXTERNAL_CALL_TIMEOUT_SECS",
                d.call_timeout.as_secs(),
            )),
            ollama_base_url: env::var("OLLAMA_BASE_URL").unwrap_or(d.ollama_base_url),
            chat_model: env::var("CHAT_MODEL").unwrap_or(d.chat_model),
            bcrypt_cost: d.bcrypt_cost,
        }
    }
}
