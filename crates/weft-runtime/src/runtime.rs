use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use weft_bridge::processor::{RuntimeProfile, SpanProcessor};
use weft_core::errors::TranslateError;
use weft_core::ids::{RunId, ThreadId};
use weft_core::messages::ChatMessage;

/// Normalized input for one run: the client's canonical identifiers plus
/// the conversation so far.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunInput {
    pub thread_id: ThreadId,
    pub run_id: RunId,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl RunInput {
    pub fn new(thread_id: ThreadId, run_id: RunId) -> Self {
        Self { thread_id, run_id, messages: Vec::new() }
    }

    pub fn with_messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages = messages;
        self
    }

    /// The newest user utterance, if any. Flow-style backends take this
    /// as their sole input.
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages.iter().rev().find_map(|m| match m {
            ChatMessage::User { content } => Some(content.as_str()),
            _ => None,
        })
    }
}

/// Failure of one execution run.
#[derive(Clone, Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("execution failed: {0}")]
    Execution(String),

    #[error(transparent)]
    Translate(#[from] TranslateError),

    #[error("unsupported input: {0}")]
    Unsupported(String),
}

/// An execution backend: run the given normalized input, raising trace
/// spans/events through the processor as execution proceeds.
///
/// Implementations that dispatch work onto another thread/task must clone
/// the `Arc<SpanProcessor>` across that spawn point themselves: the handle
/// is the request context, and nothing ambient crosses the boundary.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// What this backend's event set carries. The translation engine never
    /// otherwise branches on backend identity.
    fn profile(&self) -> RuntimeProfile {
        RuntimeProfile::default()
    }

    async fn run(
        &self,
        input: &RunInput,
        processor: Arc<SpanProcessor>,
    ) -> Result<(), RuntimeError>;
}
