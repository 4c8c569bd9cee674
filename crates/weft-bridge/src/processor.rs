use parking_lot::Mutex;

use weft_core::errors::TranslateError;
use weft_core::ids::MessageId;
use weft_core::protocol::{Role, UiEvent};
use weft_core::span::{Span, SpanKind};
use weft_core::trace::TraceEvent;

use crate::channel::EventSink;
use crate::normalize::{escape_text, normalize_tool_output};
use crate::state::RunState;

/// What a backend's event set carries. The translator is backend-agnostic
/// except where a backend is known to omit information.
#[derive(Clone, Copy, Debug, Default)]
pub struct RuntimeProfile {
    /// True when LLM-level chunk/response events already carry the
    /// tool-call lifecycle, making `ToolRequest` redundant for protocol
    /// purposes (graph-style runtimes). When false, `ToolRequest` is the
    /// only place a call id first appears.
    pub tool_lifecycle_from_llm: bool,
}

/// Translates span lifecycle notifications and trace events into protocol
/// events on the run's sink.
///
/// One processor per run. Every method is synchronous; the tracker sits
/// behind a mutex so a producer with internal concurrency across spans
/// stays safe. Any returned error is fatal to the run's translation.
pub struct SpanProcessor {
    sink: EventSink,
    state: Mutex<RunState>,
    profile: RuntimeProfile,
    debug: bool,
}

impl SpanProcessor {
    pub fn new(sink: EventSink, profile: RuntimeProfile) -> Self {
        Self {
            sink,
            state: Mutex::new(RunState::new()),
            profile,
            debug: debug_enabled(),
        }
    }

    /// Override the `WEFT_DEBUG` environment switch.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    fn emit(&self, event: UiEvent) -> Result<(), TranslateError> {
        if self.debug {
            tracing::debug!(event_type = event.event_type(), payload = ?event, "emit");
        }
        self.sink.send(event)
    }

    pub fn on_span_start(&self, span: &Span) -> Result<(), TranslateError> {
        self.state.lock().on_span_start(span);
        match &span.kind {
            SpanKind::Step { name } => self.emit(UiEvent::StepStarted { step_name: name.clone() }),
            // Tool-call lifecycle derives from LLM-level events; tool spans
            // lack the ids needed to correlate to a chat message.
            SpanKind::Run | SpanKind::LlmGeneration | SpanKind::ToolExecution => Ok(()),
        }
    }

    pub fn on_span_end(&self, span: &Span) -> Result<(), TranslateError> {
        self.state.lock().on_span_end(span);
        match &span.kind {
            SpanKind::Step { name } => self.emit(UiEvent::StepFinished { step_name: name.clone() }),
            SpanKind::Run | SpanKind::LlmGeneration | SpanKind::ToolExecution => Ok(()),
        }
    }

    /// Translate one trace event raised inside `span`. Dispatch is
    /// exhaustive over the event union; exactly one case applies.
    pub fn on_event(&self, event: &TraceEvent, span: &Span) -> Result<(), TranslateError> {
        match event {
            TraceEvent::GenerationChunk { request_id, completion_id, content, tool_calls } => {
                // Some runtimes only assign the completion id at stream end.
                let message_id = completion_id
                    .clone()
                    .or_else(|| request_id.clone())
                    .ok_or(TranslateError::MissingMessageId)?;

                if let Some(text) = content.as_deref().filter(|t| !t.is_empty()) {
                    self.emit(UiEvent::TextMessageChunk {
                        message_id: message_id.clone(),
                        role: Role::Assistant,
                        delta: escape_text(text),
                    })?;
                    self.state.lock().record_chunk_seen(&span.id);
                }

                if !tool_calls.is_empty() {
                    if tool_calls.len() != 1 {
                        return Err(TranslateError::MalformedToolCallChunk {
                            count: tool_calls.len(),
                        });
                    }
                    let delta = &tool_calls[0];
                    self.state
                        .lock()
                        .record_tool_call_started(delta.call_id.clone(), message_id.clone());
                    // Fragments may repeat for one call; registration above
                    // happens once, emission does not dedup.
                    self.emit(UiEvent::ToolCallChunk {
                        tool_call_id: delta.call_id.clone(),
                        parent_message_id: Some(message_id),
                        tool_call_name: Some(delta.tool_name.clone()),
                        delta: delta.arguments.clone(),
                    })?;
                }
                Ok(())
            }

            TraceEvent::GenerationRequest => Ok(()),

            TraceEvent::GenerationResponse { completion_id, content, tool_calls } => {
                let message_id = completion_id.clone().ok_or(TranslateError::MissingMessageId)?;

                // Fallback for runtimes that never streamed: the full
                // completion text becomes the one and only content event.
                if !self.state.lock().has_chunk_been_seen(&span.id) {
                    if !content.is_empty() {
                        self.emit(UiEvent::TextMessageChunk {
                            message_id: message_id.clone(),
                            role: Role::Assistant,
                            delta: escape_text(content),
                        })?;
                    }
                    self.state.lock().record_chunk_seen(&span.id);
                }

                // Same fallback for tool calls that were never streamed.
                for call in tool_calls {
                    if self.state.lock().has_tool_call_started(&call.call_id) {
                        continue;
                    }
                    self.emit(UiEvent::ToolCallChunk {
                        tool_call_id: call.call_id.clone(),
                        parent_message_id: Some(message_id.clone()),
                        tool_call_name: Some(call.tool_name.clone()),
                        delta: call.arguments.clone(),
                    })?;
                    self.state
                        .lock()
                        .record_tool_call_started(call.call_id.clone(), message_id.clone());
                }
                Ok(())
            }

            TraceEvent::ToolRequest { call_id, tool_name, inputs } => {
                if self.profile.tool_lifecycle_from_llm {
                    return Ok(());
                }
                if self.state.lock().has_tool_call_started(call_id) {
                    return Ok(());
                }
                // The tool span cannot name the chat message it belongs to;
                // the span id stands in as the correlation target.
                self.state.lock().record_tool_call_started(
                    call_id.clone(),
                    MessageId::from_raw(span.id.as_str()),
                );
                self.emit(UiEvent::ToolCallChunk {
                    tool_call_id: call_id.clone(),
                    parent_message_id: None,
                    tool_call_name: Some(tool_name.clone()),
                    delta: inputs.to_string(),
                })
            }

            TraceEvent::ToolResponse { call_id, outputs } => {
                let call_id = call_id.clone().ok_or(TranslateError::MissingCorrelationId)?;
                let message_id = self
                    .state
                    .lock()
                    .tool_call_message_id(&call_id)
                    .ok_or_else(|| TranslateError::UnknownToolCall(call_id.clone()))?;
                self.emit(UiEvent::ToolCallResult {
                    message_id,
                    tool_call_id: call_id,
                    content: normalize_tool_output(outputs),
                    role: Role::Tool,
                })
            }

            TraceEvent::ExceptionRaised { message, stacktrace } => {
                Err(TranslateError::RuntimeFailure {
                    message: message.clone(),
                    stacktrace: stacktrace.clone(),
                })
            }
        }
    }
}

fn debug_enabled() -> bool {
    std::env::var("WEFT_DEBUG")
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_stream::StreamExt;
    use weft_core::ids::CallId;
    use weft_core::trace::{ToolCallData, ToolCallDelta};

    use crate::channel::{EventDrain, RunChannel};

    fn processor() -> (SpanProcessor, EventDrain) {
        let (sink, drain) = RunChannel::open();
        (SpanProcessor::new(sink, RuntimeProfile::default()).with_debug(false), drain)
    }

    async fn collect(p: SpanProcessor, drain: EventDrain) -> Vec<UiEvent> {
        drop(p);
        drain.collect().await
    }

    fn chunk_with_tool(call: &str, name: &str, args: &str, msg: &str) -> TraceEvent {
        TraceEvent::GenerationChunk {
            request_id: Some(MessageId::from_raw(msg)),
            completion_id: None,
            content: None,
            tool_calls: vec![ToolCallDelta {
                call_id: CallId::from_raw(call),
                tool_name: name.into(),
                arguments: args.into(),
            }],
        }
    }

    #[tokio::test]
    async fn step_spans_emit_lifecycle_events() {
        let (p, drain) = processor();
        let step = Span::step("lookup");
        p.on_span_start(&step).unwrap();
        p.on_span_end(&step).unwrap();

        let events = collect(p, drain).await;
        assert!(matches!(&events[0], UiEvent::StepStarted { step_name } if step_name == "lookup"));
        assert!(matches!(&events[1], UiEvent::StepFinished { step_name } if step_name == "lookup"));
    }

    #[tokio::test]
    async fn run_and_tool_spans_are_silent() {
        let (p, drain) = processor();
        for span in [Span::run(), Span::tool_execution(), Span::llm_generation()] {
            p.on_span_start(&span).unwrap();
            p.on_span_end(&span).unwrap();
        }
        assert!(collect(p, drain).await.is_empty());
    }

    #[tokio::test]
    async fn streamed_text_suppresses_response_text() {
        let (p, drain) = processor();
        let llm = Span::llm_generation();
        p.on_span_start(&llm).unwrap();
        p.on_event(&TraceEvent::text_chunk(MessageId::from_raw("req-1"), "hel"), &llm)
            .unwrap();
        p.on_event(&TraceEvent::text_chunk(MessageId::from_raw("req-1"), "lo"), &llm)
            .unwrap();
        p.on_event(&TraceEvent::text_response(MessageId::from_raw("cmpl-1"), "hello"), &llm)
            .unwrap();
        p.on_span_end(&llm).unwrap();

        let events = collect(p, drain).await;
        let texts: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, UiEvent::TextMessageChunk { .. }))
            .collect();
        assert_eq!(texts.len(), 2, "final response must not re-emit streamed content");
    }

    #[tokio::test]
    async fn unstreamed_response_falls_back_to_full_text() {
        let (p, drain) = processor();
        let llm = Span::llm_generation();
        p.on_span_start(&llm).unwrap();
        p.on_event(&TraceEvent::text_response(MessageId::from_raw("cmpl-1"), "full answer"), &llm)
            .unwrap();

        let events = collect(p, drain).await;
        assert_eq!(events.len(), 1);
        match &events[0] {
            UiEvent::TextMessageChunk { message_id, role, delta } => {
                assert_eq!(message_id.as_str(), "cmpl-1");
                assert_eq!(*role, Role::Assistant);
                assert_eq!(delta, "full answer");
            }
            other => panic!("expected text chunk, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_response_text_emits_nothing() {
        let (p, drain) = processor();
        let llm = Span::llm_generation();
        p.on_span_start(&llm).unwrap();
        p.on_event(&TraceEvent::text_response(MessageId::from_raw("cmpl-1"), ""), &llm)
            .unwrap();
        assert!(collect(p, drain).await.is_empty());
    }

    #[tokio::test]
    async fn chunk_without_any_message_id_fails() {
        let (p, _drain) = processor();
        let llm = Span::llm_generation();
        let event = TraceEvent::GenerationChunk {
            request_id: None,
            completion_id: None,
            content: Some("text".into()),
            tool_calls: Vec::new(),
        };
        let err = p.on_event(&event, &llm).unwrap_err();
        assert!(matches!(err, TranslateError::MissingMessageId));
    }

    #[tokio::test]
    async fn completion_id_is_preferred_over_request_id() {
        let (p, drain) = processor();
        let llm = Span::llm_generation();
        let event = TraceEvent::GenerationChunk {
            request_id: Some(MessageId::from_raw("req-1")),
            completion_id: Some(MessageId::from_raw("cmpl-1")),
            content: Some("x".into()),
            tool_calls: Vec::new(),
        };
        p.on_event(&event, &llm).unwrap();

        let events = collect(p, drain).await;
        assert!(matches!(&events[0], UiEvent::TextMessageChunk { message_id, .. }
            if message_id.as_str() == "cmpl-1"));
    }

    #[tokio::test]
    async fn text_is_escaped_before_emission() {
        let (p, drain) = processor();
        let llm = Span::llm_generation();
        p.on_event(
            &TraceEvent::text_chunk(MessageId::from_raw("req-1"), "<script>&"),
            &llm,
        )
        .unwrap();

        let events = collect(p, drain).await;
        assert!(matches!(&events[0], UiEvent::TextMessageChunk { delta, .. }
            if delta == "&lt;script&gt;&amp;"));
    }

    #[tokio::test]
    async fn two_tool_deltas_in_one_chunk_is_malformed() {
        let (p, _drain) = processor();
        let llm = Span::llm_generation();
        let delta = ToolCallDelta {
            call_id: CallId::from_raw("call-1"),
            tool_name: "get_weather".into(),
            arguments: "{".into(),
        };
        let event = TraceEvent::GenerationChunk {
            request_id: Some(MessageId::from_raw("req-1")),
            completion_id: None,
            content: None,
            tool_calls: vec![delta.clone(), delta],
        };
        let err = p.on_event(&event, &llm).unwrap_err();
        assert!(matches!(err, TranslateError::MalformedToolCallChunk { count: 2 }));
    }

    #[tokio::test]
    async fn repeated_tool_chunks_forward_but_register_once() {
        let (p, drain) = processor();
        let llm = Span::llm_generation();
        p.on_event(&chunk_with_tool("call-1", "get_weather", "{\"ci", "req-1"), &llm)
            .unwrap();
        p.on_event(&chunk_with_tool("call-1", "get_weather", "ty\":\"Oslo\"}", "req-1"), &llm)
            .unwrap();
        // The one-shot response lists the same call; it must not re-emit.
        p.on_event(
            &TraceEvent::GenerationResponse {
                completion_id: Some(MessageId::from_raw("cmpl-1")),
                content: String::new(),
                tool_calls: vec![ToolCallData {
                    call_id: CallId::from_raw("call-1"),
                    tool_name: "get_weather".into(),
                    arguments: "{\"city\":\"Oslo\"}".into(),
                }],
            },
            &llm,
        )
        .unwrap();

        let events = collect(p, drain).await;
        let chunks = events
            .iter()
            .filter(|e| matches!(e, UiEvent::ToolCallChunk { .. }))
            .count();
        assert_eq!(chunks, 2, "streamed fragments forward; the response dedups");
    }

    #[tokio::test]
    async fn unstreamed_tool_call_is_emitted_from_response() {
        let (p, drain) = processor();
        let llm = Span::llm_generation();
        p.on_event(
            &TraceEvent::GenerationResponse {
                completion_id: Some(MessageId::from_raw("cmpl-1")),
                content: "calling".into(),
                tool_calls: vec![ToolCallData {
                    call_id: CallId::from_raw("call-9"),
                    tool_name: "search".into(),
                    arguments: "{\"q\":\"rust\"}".into(),
                }],
            },
            &llm,
        )
        .unwrap();

        let events = collect(p, drain).await;
        assert!(events.iter().any(|e| matches!(e, UiEvent::ToolCallChunk {
            tool_call_id, parent_message_id: Some(parent), tool_call_name: Some(name), delta,
        } if tool_call_id.as_str() == "call-9"
            && parent.as_str() == "cmpl-1"
            && name == "search"
            && delta == "{\"q\":\"rust\"}")));
    }

    #[tokio::test]
    async fn tool_result_resolves_recorded_message_id() {
        let (p, drain) = processor();
        let llm = Span::llm_generation();
        p.on_event(&chunk_with_tool("call-1", "get_weather", "{}", "req-1"), &llm)
            .unwrap();

        let tool_span = Span::tool_execution();
        p.on_event(
            &TraceEvent::ToolResponse {
                call_id: Some(CallId::from_raw("call-1")),
                outputs: json!({"weather_result": {"temp": 20}}),
            },
            &tool_span,
        )
        .unwrap();

        let events = collect(p, drain).await;
        match &events[1] {
            UiEvent::ToolCallResult { message_id, tool_call_id, content, role } => {
                assert_eq!(message_id.as_str(), "req-1");
                assert_eq!(tool_call_id.as_str(), "call-1");
                assert_eq!(content, r#"{"temp":20}"#);
                assert_eq!(*role, Role::Tool);
            }
            other => panic!("expected tool result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn tool_result_for_unknown_call_fails() {
        let (p, _drain) = processor();
        let err = p
            .on_event(
                &TraceEvent::ToolResponse {
                    call_id: Some(CallId::from_raw("never-seen")),
                    outputs: json!("out"),
                },
                &Span::tool_execution(),
            )
            .unwrap_err();
        assert!(matches!(err, TranslateError::UnknownToolCall(id) if id.as_str() == "never-seen"));
    }

    #[tokio::test]
    async fn tool_result_without_call_id_fails() {
        let (p, _drain) = processor();
        let err = p
            .on_event(
                &TraceEvent::ToolResponse { call_id: None, outputs: json!("out") },
                &Span::tool_execution(),
            )
            .unwrap_err();
        assert!(matches!(err, TranslateError::MissingCorrelationId));
    }

    #[tokio::test]
    async fn tool_request_registers_when_lifecycle_not_from_llm() {
        let (sink, drain) = RunChannel::open();
        let p = SpanProcessor::new(sink, RuntimeProfile { tool_lifecycle_from_llm: false })
            .with_debug(false);
        let tool_span = Span::tool_execution();
        p.on_event(
            &TraceEvent::ToolRequest {
                call_id: CallId::from_raw("call-5"),
                tool_name: "lookup".into(),
                inputs: json!({"key": "value"}),
            },
            &tool_span,
        )
        .unwrap();
        p.on_event(
            &TraceEvent::ToolResponse {
                call_id: Some(CallId::from_raw("call-5")),
                outputs: json!("done"),
            },
            &tool_span,
        )
        .unwrap();

        let events = collect(p, drain).await;
        assert!(matches!(&events[0], UiEvent::ToolCallChunk { parent_message_id: None, .. }));
        // Best-effort correlation: the span id stands in for the message.
        assert!(matches!(&events[1], UiEvent::ToolCallResult { message_id, .. }
            if message_id.as_str() == tool_span.id.as_str()));
    }

    #[tokio::test]
    async fn tool_request_is_ignored_when_llm_carries_lifecycle() {
        let (sink, drain) = RunChannel::open();
        let p = SpanProcessor::new(sink, RuntimeProfile { tool_lifecycle_from_llm: true })
            .with_debug(false);
        p.on_event(
            &TraceEvent::ToolRequest {
                call_id: CallId::from_raw("call-5"),
                tool_name: "lookup".into(),
                inputs: json!({}),
            },
            &Span::tool_execution(),
        )
        .unwrap();
        assert!(collect(p, drain).await.is_empty());
    }

    #[tokio::test]
    async fn generation_request_is_ignored() {
        let (p, drain) = processor();
        p.on_event(&TraceEvent::GenerationRequest, &Span::llm_generation()).unwrap();
        assert!(collect(p, drain).await.is_empty());
    }

    #[tokio::test]
    async fn exception_becomes_runtime_failure() {
        let (p, _drain) = processor();
        let err = p
            .on_event(
                &TraceEvent::ExceptionRaised {
                    message: "boom".into(),
                    stacktrace: "frame 0\nframe 1".into(),
                },
                &Span::run(),
            )
            .unwrap_err();
        match err {
            TranslateError::RuntimeFailure { message, stacktrace } => {
                assert_eq!(message, "boom");
                assert!(stacktrace.contains("frame 1"));
            }
            other => panic!("expected runtime failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn chunk_seen_state_is_per_span() {
        let (p, drain) = processor();
        let first = Span::llm_generation();
        let second = Span::llm_generation();
        p.on_span_start(&first).unwrap();
        p.on_event(&TraceEvent::text_chunk(MessageId::from_raw("req-1"), "streamed"), &first)
            .unwrap();
        p.on_span_end(&first).unwrap();

        // The second span never streamed, so its response text goes out.
        p.on_span_start(&second).unwrap();
        p.on_event(&TraceEvent::text_response(MessageId::from_raw("cmpl-2"), "one-shot"), &second)
            .unwrap();
        p.on_span_end(&second).unwrap();

        let events = collect(p, drain).await;
        let texts = events
            .iter()
            .filter(|e| matches!(e, UiEvent::TextMessageChunk { .. }))
            .count();
        assert_eq!(texts, 2);
    }
}
