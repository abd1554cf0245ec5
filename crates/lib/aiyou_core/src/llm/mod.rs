//! Chat-completion provider contract and chat message model.

pub mod ollama;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tools::ToolSchema;

/// Errors from the chat-completion provider.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Config error: {0}")]
    Config(String),
}

/// Chat message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

/// One message sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A conversation turn as held by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub content: String,
    pub is_user: bool,
}

/// A model-requested tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// The provider's reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatReply {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

/// Messages in, response out.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// When `tools` is given the provider is asked for structured tool-call output.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolSchema]>,
    ) -> Result<ChatReply, LlmError>;
}

/// Build the provider message list: history, optional system prompt, then the query.
pub fn build_messages(
    history: &[HistoryEntry],
    query: &str,
    query_role: Role,
    system_prompt: Option<&str>,
) -> Vec<ChatMessage> {
    let mut messages: Vec<ChatMessage> = history
        .iter()
        .map(|m| {
            let role = if m.is_user { Role::User } else { Role::Assistant };
            ChatMessage::new(role, m.content.clone())
        })
        .collect();
    if let Some(prompt) = system_prompt {
        messages.push(ChatMessage::new(Role::System, prompt));
    }
    messages.push(ChatMessage::new(query_role, query));
    messages
}

/// Single-shot chat: history plus query, no system prompt and no tools.
pub async fn plain_call(
    provider: &dyn ChatProvider,
    history: &[HistoryEntry],
    query: &str,
) -> Result<String, LlmError> {
    let messages = build_messages(history, query, Role::User, None);
    let reply = provider.chat(&messages, None).await?;
    tracing::debug!(chars = reply.content.len(), "plain chat reply");
    Ok(reply.content)
}
