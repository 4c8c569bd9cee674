use std::sync::Arc;

use async_trait::async_trait;

use weft_bridge::processor::{RuntimeProfile, SpanProcessor};
use weft_core::ids::MessageId;
use weft_core::span::Span;
use weft_core::trace::TraceEvent;

use crate::runtime::{AgentRuntime, RunInput, RuntimeError};

/// One step of a scripted run.
#[derive(Clone, Debug)]
pub enum ScriptStep {
    OpenSpan(Span),
    CloseSpan(Span),
    Raise { span: Span, event: TraceEvent },
    /// Abort the run with an execution failure.
    Fail(String),
}

/// Replays a pre-programmed trace: deterministic runs without a real
/// execution engine, for tests and the demo binary.
pub struct ScriptedRuntime {
    steps: Vec<ScriptStep>,
    profile: RuntimeProfile,
    on_worker_thread: bool,
}

impl ScriptedRuntime {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self { steps, profile: RuntimeProfile::default(), on_worker_thread: false }
    }

    pub fn with_profile(mut self, profile: RuntimeProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Replay from a blocking worker thread instead of the async task. The
    /// processor handle crosses the spawn point as an explicit clone, the
    /// same move a real synchronous backend has to make.
    pub fn on_worker_thread(mut self) -> Self {
        self.on_worker_thread = true;
        self
    }

    /// A minimal well-formed run: one step wrapping one LLM generation
    /// that streams `reply` in two chunks and then confirms it one-shot.
    pub fn canned(reply: &str) -> Self {
        let run = Span::run();
        let step = Span::step("respond");
        let llm = Span::llm_generation();
        let message_id = MessageId::new();
        let mid = (0..=reply.len() / 2)
            .rev()
            .find(|i| reply.is_char_boundary(*i))
            .unwrap_or(0);
        let (head, tail) = reply.split_at(mid);

        Self::new(vec![
            ScriptStep::OpenSpan(run.clone()),
            ScriptStep::OpenSpan(step.clone()),
            ScriptStep::OpenSpan(llm.clone()),
            ScriptStep::Raise {
                span: llm.clone(),
                event: TraceEvent::text_chunk(message_id.clone(), head),
            },
            ScriptStep::Raise {
                span: llm.clone(),
                event: TraceEvent::text_chunk(message_id.clone(), tail),
            },
            ScriptStep::Raise {
                span: llm.clone(),
                event: TraceEvent::text_response(message_id, reply),
            },
            ScriptStep::CloseSpan(llm),
            ScriptStep::CloseSpan(step),
            ScriptStep::CloseSpan(run),
        ])
    }
}

fn replay(steps: &[ScriptStep], processor: &SpanProcessor) -> Result<(), RuntimeError> {
    for step in steps {
        match step {
            ScriptStep::OpenSpan(span) => processor.on_span_start(span)?,
            ScriptStep::CloseSpan(span) => processor.on_span_end(span)?,
            ScriptStep::Raise { span, event } => processor.on_event(event, span)?,
            ScriptStep::Fail(message) => return Err(RuntimeError::Execution(message.clone())),
        }
    }
    Ok(())
}

#[async_trait]
impl AgentRuntime for ScriptedRuntime {
    fn profile(&self) -> RuntimeProfile {
        self.profile
    }

    async fn run(
        &self,
        _input: &RunInput,
        processor: Arc<SpanProcessor>,
    ) -> Result<(), RuntimeError> {
        let steps = self.steps.clone();
        if self.on_worker_thread {
            tokio::task::spawn_blocking(move || replay(&steps, &processor))
                .await
                .map_err(|e| RuntimeError::Execution(format!("worker thread panicked: {e}")))?
        } else {
            replay(&steps, &processor)
        }
    }
}
