//! Corrective RAG pipeline: query rewrite, tool resolution, then retrieval
//! and answer synthesis.
//!
//! Phases run strictly in order. Rewrite and synthesis failures are fatal;
//! tool resolution and retrieval degrade. When retrieval fails the caller is
//! notified and receives the rewritten query as the answer.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::llm::{ChatProvider, ChatReply, HistoryEntry, LlmError, Role, build_messages};
use crate::tools::{ToolInvoker, ToolSchema};

pub const REWRITE_PROMPT: &str = "You are an LLM Agent whose sole purpose is to improve and enhance the user's query or statement with any relevant information suitable. However, ensure that the core intent or message is not distorted. Respond only with the improved query. DO NOT MAKE ANY OTHER RESPONSE.";

pub const TOOL_PROMPT: &str = "You are an LLM Agent with access to special tools which you can choose to invoke. Use them to best help the user with their query.";

pub const SYNTHESIS_PROMPT: &str = "You are a professional AI assistant. Answer the user's query with utmost clarity. You may optionally be provided with additional context to help you answer. Evaluate the relevance and usefulness of the information before answering.";

/// Fatal pipeline failures.
#[derive(Debug, Error)]
pub enum CragError {
    #[error("query rewrite failed: {0}")]
    Rewrite(#[source] LlmError),

    #[error("answer synthesis failed: {0}")]
    Synthesis(#[source] LlmError),
}

/// Retrieval failed; carries the reason shown to the caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct RetrieveFailure(pub String);

/// Access to the retrieve operation on behalf of a token holder.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str, token: &str) -> Result<Vec<String>, RetrieveFailure>;
}

/// Receives user-facing notices about degraded phases.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

impl<F> Notifier for F
where
    F: Fn(&str) + Send + Sync,
{
    fn notify(&self, message: &str) {
        self(message)
    }
}

/// Notifier that records every notice.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    messages: Mutex<Vec<String>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn into_messages(self) -> Vec<String> {
        self.messages
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}

/// Build the synthesis context block.
pub fn build_context(documents: &[String], tool_responses: &str, attempted: &str) -> String {
    format!(
        "\nCONTEXT\n{}\n\nTOOL RESPONSE\n{tool_responses}\nATTEMPTED ANSWER\n{attempted}",
        documents.join("\n")
    )
}

pub struct CragOrchestrator {
    chat: Arc<dyn ChatProvider>,
    tools: Arc<dyn ToolInvoker>,
    retriever: Arc<dyn Retriever>,
    call_timeout: Duration,
}

impl CragOrchestrator {
    pub fn new(
        chat: Arc<dyn ChatProvider>,
        tools: Arc<dyn ToolInvoker>,
        retriever: Arc<dyn Retriever>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            chat,
            tools,
            retriever,
            call_timeout,
        }
    }

    async fn chat(
        &self,
        history: &[HistoryEntry],
        query: &str,
        system_prompt: &str,
        tools: Option<&[ToolSchema]>,
    ) -> Result<ChatReply, LlmError> {
        let messages = build_messages(history, query, Role::User, Some(system_prompt));
        match timeout(self.call_timeout, self.chat.chat(&messages, tools)).await {
            Ok(reply) => reply,
            Err(_) => Err(LlmError::Provider(format!(
                "chat call timed out after {}s",
                self.call_timeout.as_secs()
            ))),
        }
    }

    /// Phase 2. Never fails; provider errors yield an empty buffer.
    async fn resolve_tools(
        &self,
        history: &[HistoryEntry],
        query: &str,
        notifier: &dyn Notifier,
    ) -> String {
        let schemas = self.tools.schemas();
        let reply = match self.chat(history, query, TOOL_PROMPT, Some(schemas.as_slice())).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "tool resolution call failed; continuing without tools");
                notifier.notify(&format!("Tool resolution failed: {e}"));
                return String::new();
            }
        };
        debug!(calls = reply.tool_calls.len(), "tool calls requested");

        let outputs = join_all(reply.tool_calls.iter().map(|call| self.tools.invoke(call))).await;

        let mut buffer = String::new();
        for (call, output) in reply.tool_calls.iter().zip(outputs) {
            match output {
                Some(out) => {
                    buffer.push_str(&format!("Tool Response for {}: {out}\n", call.name));
                }
                None => info!(tool = %call.name, "skipped unknown tool"),
            }
        }
        buffer
    }

    async fn retrieve(&self, query: &str, token: &str) -> Result<Vec<String>, RetrieveFailure> {
        match timeout(self.call_timeout, self.retriever.retrieve(query, token)).await {
            Ok(result) => result,
            Err(_) => Err(RetrieveFailure(format!(
                "retrieval timed out after {}s",
                self.call_timeout.as_secs()
            ))),
        }
    }

    /// Run the full pipeline for one query.
    pub async fn run(
        &self,
        history: &[HistoryEntry],
        query: &str,
        token: &str,
        notifier: &dyn Notifier,
    ) -> Result<String, CragError> {
        let rewritten = self
            .chat(history, query, REWRITE_PROMPT, None)
            .await
            .map_err(CragError::Rewrite)?
            .content;
        debug!(chars = rewritten.len(), "query rewritten");

        let tool_responses = self.resolve_tools(history, query, notifier).await;

        let documents = match self.retrieve(&rewritten, token).await {
            Ok(docs) => docs,
            Err(e) => {
                warn!(error = %e, "retrieval failed; returning rewritten query");
                notifier.notify(&format!("Failed to retrieve documents: {e}"));
                return Ok(rewritten);
            }
        };
        debug!(documents = documents.len(), "context retrieved");

        let context = build_context(&documents, &tool_responses, &rewritten);
        let prompt = format!("{SYNTHESIS_PROMPT}{context}");
        let answer = self
            .chat(history, query, &prompt, None)
            .await
            .map_err(CragError::Synthesis)?;
        Ok(answer.content)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::llm::{ChatMessage, ToolCall};
    use crate::tools::ToolKind;

    /// Replies by system prompt; records every synthesis prompt it sees.
    #[derive(Default)]
    struct ScriptedChat {
        tool_calls: Vec<ToolCall>,
        fail_tools: bool,
        fail_rewrite: bool,
        fail_synthesis: bool,
        synthesis_prompts: Mutex<Vec<String>>,
    }

    fn system_prompt(messages: &[ChatMessage]) -> &str {
        messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }

    #[async_trait]
    impl ChatProvider for ScriptedChat {
        async fn chat(
            &self,
            messages: &[ChatMessage],
            tools: Option<&[ToolSchema]>,
        ) -> Result<ChatReply, LlmError> {
            let system = system_prompt(messages);
            if system == REWRITE_PROMPT {
                if self.fail_rewrite {
                    return Err(LlmError::Provider("rewrite down".into()));
                }
                return Ok(ChatReply {
                    content: "improved: what is rust?".into(),
                    tool_calls: vec![],
                });
            }
            if system == TOOL_PROMPT {
                assert!(tools.is_some());
                if self.fail_tools {
                    return Err(LlmError::Provider("tools down".into()));
                }
                return Ok(ChatReply {
                    content: String::new(),
                    tool_calls: self.tool_calls.clone(),
                });
            }
            self.synthesis_prompts
                .lock()
                .unwrap()
                .push(system.to_string());
            if self.fail_synthesis {
                return Err(LlmError::Provider("synthesis down".into()));
            }
            Ok(ChatReply {
                content: "final answer".into(),
                tool_calls: vec![],
            })
        }
    }

    /// Knows only `quote`, which echoes a fixed string.
    #[derive(Default)]
    struct FakeTools {
        invoked: AtomicUsize,
    }

    #[async_trait]
    impl ToolInvoker for FakeTools {
        fn schemas(&self) -> Vec<ToolSchema> {
            vec![ToolKind::Quote.schema()]
        }

        async fn invoke(&self, call: &ToolCall) -> Option<String> {
            self.invoked.fetch_add(1, Ordering::SeqCst);
            (call.name == "quote").then(|| "be kind".to_string())
        }
    }

    struct FakeRetriever {
        result: Result<Vec<String>, RetrieveFailure>,
        seen: Mutex<Vec<(String, String)>>,
    }

    impl FakeRetriever {
        fn new(result: Result<Vec<String>, RetrieveFailure>) -> Self {
            Self {
                result,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Retriever for FakeRetriever {
        async fn retrieve(&self, query: &str, token: &str) -> Result<Vec<String>, RetrieveFailure> {
            self.seen
                .lock()
                .unwrap()
                .push((query.to_string(), token.to_string()));
            self.result.clone()
        }
    }

    fn call(name: &str) -> ToolCall {
        ToolCall {
            name: name.into(),
            arguments: json!({}),
        }
    }

    fn orchestrator(
        chat: Arc<ScriptedChat>,
        tools: Arc<FakeTools>,
        retriever: Arc<FakeRetriever>,
    ) -> CragOrchestrator {
        CragOrchestrator::new(chat, tools, retriever, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn retrieval_failure_returns_rewritten_query() {
        let chat = Arc::new(ScriptedChat::default());
        let retriever = Arc::new(FakeRetriever::new(Err(RetrieveFailure(
            "Unauthenticated".into(),
        ))));
        let crag = orchestrator(chat.clone(), Arc::new(FakeTools::default()), retriever);
        let notifier = CollectingNotifier::new();

        let answer = crag
            .run(&[], "what is rust", "tok", &notifier)
            .await
            .unwrap();

        assert_eq!(answer, "improved: what is rust?");
        let notices = notifier.messages();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].contains("Failed to retrieve documents"));
        assert!(chat.synthesis_prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_tool_is_skipped_and_known_tool_reported() {
        let chat = Arc::new(ScriptedChat {
            tool_calls: vec![call("teleport"), call("quote")],
            ..Default::default()
        });
        let tools = Arc::new(FakeTools::default());
        let retriever = Arc::new(FakeRetriever::new(Ok(vec!["doc one".into()])));
        let crag = orchestrator(chat.clone(), tools.clone(), retriever);

        let answer = crag
            .run(&[], "inspire me", "tok", &CollectingNotifier::new())
            .await
            .unwrap();

        assert_eq!(answer, "final answer");
        assert_eq!(tools.invoked.load(Ordering::SeqCst), 2);
        let prompts = chat.synthesis_prompts.lock().unwrap();
        let expected = format!(
            "{SYNTHESIS_PROMPT}{}",
            build_context(
                &["doc one".to_string()],
                "Tool Response for quote: be kind\n",
                "improved: what is rust?"
            )
        );
        assert_eq!(prompts.as_slice(), [expected]);
        assert!(!prompts[0].contains("teleport"));
    }

    #[tokio::test]
    async fn retrieval_uses_rewritten_query_and_token() {
        let retriever = Arc::new(FakeRetriever::new(Ok(vec![])));
        let crag = orchestrator(
            Arc::new(ScriptedChat::default()),
            Arc::new(FakeTools::default()),
            retriever.clone(),
        );
        crag.run(&[], "q", "T9", &|_: &str| {}).await.unwrap();
        assert_eq!(
            retriever.seen.lock().unwrap().as_slice(),
            [("improved: what is rust?".to_string(), "T9".to_string())]
        );
    }

    #[tokio::test]
    async fn tool_resolution_failure_is_not_fatal() {
        let chat = Arc::new(ScriptedChat {
            fail_tools: true,
            ..Default::default()
        });
        let crag = orchestrator(
            chat.clone(),
            Arc::new(FakeTools::default()),
            Arc::new(FakeRetriever::new(Ok(vec![]))),
        );
        let notifier = CollectingNotifier::new();

        let answer = crag.run(&[], "q", "tok", &notifier).await.unwrap();

        assert_eq!(answer, "final answer");
        assert!(notifier.messages()[0].starts_with("Tool resolution failed"));
        assert!(chat.synthesis_prompts.lock().unwrap()[0].contains("\nTOOL RESPONSE\n\nATTEMPTED ANSWER\n"));
    }

    #[tokio::test]
    async fn rewrite_failure_is_fatal() {
        let chat = Arc::new(ScriptedChat {
            fail_rewrite: true,
            ..Default::default()
        });
        let retriever = Arc::new(FakeRetriever::new(Ok(vec![])));
        let crag = orchestrator(chat, Arc::new(FakeTools::default()), retriever.clone());

        let result = crag.run(&[], "q", "tok", &CollectingNotifier::new()).await;
        assert!(matches!(result, Err(CragError::Rewrite(_))));
        assert!(retriever.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn synthesis_failure_is_fatal() {
        let chat = Arc::new(ScriptedChat {
            fail_synthesis: true,
            ..Default::default()
        });
        let crag = orchestrator(
            chat,
            Arc::new(FakeTools::default()),
            Arc::new(FakeRetriever::new(Ok(vec!["d".into()]))),
        );
        assert!(matches!(
            crag.run(&[], "q", "tok", &CollectingNotifier::new()).await,
            Err(CragError::Synthesis(_))
        ));
    }

    #[tokio::test]
    async fn tool_outputs_keep_call_order() {
        let chat = Arc::new(ScriptedChat {
            tool_calls: vec![call("quote"), call("quote")],
            ..Default::default()
        });
        let crag = orchestrator(
            chat.clone(),
            Arc::new(FakeTools::default()),
            Arc::new(FakeRetriever::new(Ok(vec![]))),
        );
        crag.run(&[], "q", "tok", &CollectingNotifier::new())
            .await
            .unwrap();
        let prompts = chat.synthesis_prompts.lock().unwrap();
        assert!(prompts[0].contains(
            "TOOL RESPONSE\nTool Response for quote: be kind\nTool Response for quote: be kind\n\nATTEMPTED"
        ));
    }

    #[test]
    fn context_layout() {
        assert_eq!(
            build_context(&["a".into(), "b".into()], "T\n", "R"),
            "\nCONTEXT\na\nb\n\nTOOL RESPONSE\nT\n\nATTEMPTED ANSWER\nR"
        );
    }
}
