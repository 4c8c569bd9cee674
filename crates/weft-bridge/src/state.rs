use std::collections::HashMap;

use weft_core::ids::{CallId, MessageId, SpanId};
use weft_core::span::{Span, SpanKind};

/// What the run remembers about one tool call: the logical message its
/// chunks are attached to. Never mutated after creation.
#[derive(Clone, Debug)]
pub struct ToolCallRecord {
    pub message_id: MessageId,
}

/// Per-run bookkeeping: open LLM spans and tool-call correlation. Purely
/// synchronous and in-memory; discarded with the run. A span that never
/// ends leaks its entry for the run's lifetime, which is bounded.
#[derive(Debug, Default)]
pub struct RunState {
    llm_chunks_seen: HashMap<SpanId, bool>,
    tool_calls: HashMap<CallId, ToolCallRecord>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_span_start(&mut self, span: &Span) {
        if matches!(span.kind, SpanKind::LlmGeneration) {
            self.llm_chunks_seen.insert(span.id.clone(), false);
        }
    }

    pub fn on_span_end(&mut self, span: &Span) {
        if matches!(span.kind, SpanKind::LlmGeneration) {
            self.llm_chunks_seen.remove(&span.id);
        }
    }

    pub fn record_chunk_seen(&mut self, span_id: &SpanId) {
        self.llm_chunks_seen.insert(span_id.clone(), true);
    }

    pub fn has_chunk_been_seen(&self, span_id: &SpanId) -> bool {
        self.llm_chunks_seen.get(span_id).copied().unwrap_or(false)
    }

    /// First registration wins; repeated calls for the same id are no-ops.
    pub fn record_tool_call_started(&mut self, call_id: CallId, message_id: MessageId) {
        self.tool_calls
            .entry(call_id)
            .or_insert(ToolCallRecord { message_id });
    }

    pub fn has_tool_call_started(&self, call_id: &CallId) -> bool {
        self.tool_calls.contains_key(call_id)
    }

    pub fn tool_call_message_id(&self, call_id: &CallId) -> Option<MessageId> {
        self.tool_calls.get(call_id).map(|r| r.message_id.clone())
    }

    pub fn open_llm_spans(&self) -> usize {
        self.llm_chunks_seen.len()
    }
}
