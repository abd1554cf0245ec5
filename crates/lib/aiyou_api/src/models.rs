//! Wire models for the request/response envelope and the chat endpoint.

use aiyou_core::llm::HistoryEntry;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// `POST /api` request body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiRequest {
    #[serde(default)]
    pub text: Option<String>,
    pub method: String,
    /// JSON-encoded [`Meta`]. An object is accepted too; empty means `{}`.
    #[serde(default)]
    pub meta: serde_json::Value,
}

/// Email and password pair.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Decoded `meta` of an [`ApiRequest`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub credentials: Option<Credentials>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub chunk_source: Option<String>,
}

/// Response envelope shared by every operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refreshed_token: Option<String>,
}

impl ApiResponse {
    pub fn failure(error: &AppError, refreshed_token: Option<String>) -> Self {
        Self {
            error: true,
            message: Some(error.public_message()),
            refreshed_token,
            ..Default::default()
        }
    }
}

/// `POST /api/chat` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    pub query: String,
    /// Run the CRAG pipeline (default) or a single plain call.
    #[serde(default = "default_agentic")]
    pub agentic: bool,
}

fn default_agentic() -> bool {
    true
}

/// `POST /api/chat` response body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub notices: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refreshed_token: Option<String>,
}

/// `GET /api/hello` response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelloResponse {
    pub greeting: String,
    pub store_backend: String,
}
