use crate::ids::CallId;

/// Failures raised while translating trace events into protocol events.
///
/// `RuntimeFailure` and `ChannelUnavailable` are operational; the rest are
/// ordering-invariant violations that a well-behaved runtime never
/// produces. All of them are fatal to the run's translation and none is
/// retried here: every one surfaces to the client as a terminal error
/// event.
#[derive(Clone, Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("generation event carries no message id")]
    MissingMessageId,

    #[error("expected exactly one tool call delta per chunk, got {count}")]
    MalformedToolCallChunk { count: usize },

    #[error("tool result references unknown call {0}")]
    UnknownToolCall(CallId),

    #[error("tool response carries no call id")]
    MissingCorrelationId,

    #[error("event channel unavailable")]
    ChannelUnavailable,

    #[error("execution raised: {message}")]
    RuntimeFailure { message: String, stacktrace: String },
}

impl TranslateError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::MissingMessageId => "missing_message_id",
            Self::MalformedToolCallChunk { .. } => "malformed_tool_call_chunk",
            Self::UnknownToolCall(_) => "unknown_tool_call",
            Self::MissingCorrelationId => "missing_correlation_id",
            Self::ChannelUnavailable => "channel_unavailable",
            Self::RuntimeFailure { .. } => "runtime_failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_strings() {
        assert_eq!(TranslateError::MissingMessageId.error_kind(), "missing_message_id");
        assert_eq!(
            TranslateError::MalformedToolCallChunk { count: 2 }.error_kind(),
            "malformed_tool_call_chunk"
        );
        assert_eq!(
            TranslateError::UnknownToolCall(CallId::from_raw("call-1")).error_kind(),
            "unknown_tool_call"
        );
    }

    #[test]
    fn display_includes_detail() {
        let err = TranslateError::MalformedToolCallChunk { count: 3 };
        assert!(err.to_string().contains("got 3"));

        let err = TranslateError::RuntimeFailure {
            message: "divide by zero".into(),
            stacktrace: "frame 0".into(),
        };
        assert!(err.to_string().contains("divide by zero"));
    }
}
