//! Ollama chat provider (`/api/chat`, non-streaming).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ChatMessage, ChatProvider, ChatReply, LlmError, ToolCall};
use crate::tools::ToolSchema;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolSchema]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<ResponseToolCall>,
}

#[derive(Deserialize)]
struct ResponseToolCall {
    function: ToolCall,
}

/// Chat provider backed by an Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaChat {
    client: Client,
    url: String,
    model: String,
}

impl OllamaChat {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Config(format!("http client: {e}")))?;
        Ok(Self {
            client,
            url: format!("{}/api/chat", base_url.trim_end_matches('/')),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl ChatProvider for OllamaChat {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolSchema]>,
    ) -> Result<ChatReply, LlmError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&ChatRequest {
                model: &self.model,
                messages,
                tools,
                format: tools.map(|_| "json"),
                stream: false,
            })
            .send()
            .await
            .map_err(|e| LlmError::Provider(format!("Ollama chat request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(LlmError::Provider(format!(
                "Ollama chat failed: {status} {body}"
            )));
        }

        let data: ChatResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Provider(format!("Ollama chat parse error: {e}")))?;

        Ok(ChatReply {
            content: data.message.content,
            tool_calls: data
                .message
                .tool_calls
                .into_iter()
                .map(|c| c.function)
                .collect(),
        })
    }
}
