use serde::{Deserialize, Serialize};

use crate::ids::{CallId, MessageId, RunId, ThreadId};

/// Author of a protocol-level message fragment.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Assistant,
    Tool,
}

/// Protocol events sent to the client. Immutable once constructed; the
/// position in the output stream is the only ordering guarantee, no event
/// is revised after it has been handed to the channel.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UiEvent {
    #[serde(rename = "run_started")]
    RunStarted { thread_id: ThreadId, run_id: RunId },

    #[serde(rename = "run_finished")]
    RunFinished { thread_id: ThreadId, run_id: RunId },

    #[serde(rename = "run_error")]
    RunError { message: String },

    #[serde(rename = "step_started")]
    StepStarted { step_name: String },

    #[serde(rename = "step_finished")]
    StepFinished { step_name: String },

    #[serde(rename = "text_message_chunk")]
    TextMessageChunk {
        message_id: MessageId,
        role: Role,
        delta: String,
    },

    #[serde(rename = "tool_call_chunk")]
    ToolCallChunk {
        tool_call_id: CallId,
        #[serde(skip_serializing_if = "Option::is_none")]
        parent_message_id: Option<MessageId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_call_name: Option<String>,
        delta: String,
    },

    #[serde(rename = "tool_call_result")]
    ToolCallResult {
        message_id: MessageId,
        tool_call_id: CallId,
        content: String,
        role: Role,
    },
}

impl UiEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "run_started",
            Self::RunFinished { .. } => "run_finished",
            Self::RunError { .. } => "run_error",
            Self::StepStarted { .. } => "step_started",
            Self::StepFinished { .. } => "step_finished",
            Self::TextMessageChunk { .. } => "text_message_chunk",
            Self::ToolCallChunk { .. } => "tool_call_chunk",
            Self::ToolCallResult { .. } => "tool_call_result",
        }
    }

    /// Terminal events end the run's stream; nothing may follow them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::RunFinished { .. } | Self::RunError { .. })
    }
}
