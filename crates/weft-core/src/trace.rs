use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{CallId, MessageId};

/// One streamed fragment of a tool call: the arguments arrive as text
/// pieces whose boundaries the producer controls.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCallDelta {
    pub call_id: CallId,
    pub tool_name: String,
    pub arguments: String,
}

/// A fully-formed tool call carried by a one-shot generation response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCallData {
    pub call_id: CallId,
    pub tool_name: String,
    pub arguments: String,
}

/// Events raised inside trace spans by the execution runtime. This is the
/// engine's entire input surface: adding a variant forces every consumer to
/// decide how to handle it.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TraceEvent {
    /// Incremental generation output. Some runtimes only assign a
    /// completion id at the end of the stream, so chunks may carry the
    /// request id instead.
    #[serde(rename = "generation_chunk")]
    GenerationChunk {
        #[serde(default)]
        request_id: Option<MessageId>,
        #[serde(default)]
        completion_id: Option<MessageId>,
        #[serde(default)]
        content: Option<String>,
        #[serde(default)]
        tool_calls: Vec<ToolCallDelta>,
    },

    /// The outgoing LLM request. Carries nothing the protocol needs.
    #[serde(rename = "generation_request")]
    GenerationRequest,

    /// The complete generation, emitted whether or not chunks streamed.
    #[serde(rename = "generation_response")]
    GenerationResponse {
        #[serde(default)]
        completion_id: Option<MessageId>,
        content: String,
        #[serde(default)]
        tool_calls: Vec<ToolCallData>,
    },

    #[serde(rename = "tool_request")]
    ToolRequest {
        call_id: CallId,
        tool_name: String,
        inputs: Value,
    },

    #[serde(rename = "tool_response")]
    ToolResponse {
        #[serde(default)]
        call_id: Option<CallId>,
        outputs: Value,
    },

    #[serde(rename = "exception")]
    ExceptionRaised { message: String, stacktrace: String },
}

impl TraceEvent {
    /// Convenience: a streamed text chunk keyed by its request id.
    pub fn text_chunk(request_id: MessageId, content: impl Into<String>) -> Self {
        Self::GenerationChunk {
            request_id: Some(request_id),
            completion_id: None,
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    /// Convenience: a one-shot text response keyed by its completion id.
    pub fn text_response(completion_id: MessageId, content: impl Into<String>) -> Self {
        Self::GenerationResponse {
            completion_id: Some(completion_id),
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::GenerationChunk { .. } => "generation_chunk",
            Self::GenerationRequest => "generation_request",
            Self::GenerationResponse { .. } => "generation_response",
            Self::ToolRequest { .. } => "tool_request",
            Self::ToolResponse { .. } => "tool_response",
            Self::ExceptionRaised { .. } => "exception",
        }
    }
}
