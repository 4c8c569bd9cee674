use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use pin_project_lite::pin_project;
use tracing::{error, warn};

use weft_bridge::channel::{EventDrain, EventSink, RunChannel};
use weft_bridge::processor::SpanProcessor;
use weft_core::ids::{RunId, ThreadId};
use weft_core::protocol::UiEvent;

use crate::runtime::{AgentRuntime, RunInput, RuntimeError};

/// Drives runs end to end: opens the run's channel, emits the lifecycle
/// frame, launches the runtime on its own task, and guarantees that every
/// stream terminates with the channel closed exactly once: `RunFinished`
/// on success, `RunError` on any failure (including a panicking runtime).
pub struct RunDriver {
    runtime: Arc<dyn AgentRuntime>,
}

impl RunDriver {
    pub fn new(runtime: Arc<dyn AgentRuntime>) -> Self {
        Self { runtime }
    }

    /// Start executing and return the consuming stream. The producer keeps
    /// running even if the returned stream is dropped; its sends simply
    /// become inert.
    pub fn start(&self, input: RunInput) -> RunStream {
        let (sink, drain) = RunChannel::open();
        let runtime = Arc::clone(&self.runtime);
        let processor = Arc::new(SpanProcessor::new(sink.clone(), runtime.profile()));

        // Lifecycle events carry internally generated ids; the consumer
        // stream patches in the client's canonical ones.
        let canonical_thread = input.thread_id.clone();
        let canonical_run = input.run_id.clone();

        tokio::spawn(run_to_completion(runtime, input, processor, sink));

        RunStream { drain, thread_id: canonical_thread, run_id: canonical_run }
    }
}

async fn run_to_completion(
    runtime: Arc<dyn AgentRuntime>,
    input: RunInput,
    processor: Arc<SpanProcessor>,
    sink: EventSink,
) {
    let thread_id = ThreadId::new();
    let run_id = RunId::new();

    if sink
        .send(UiEvent::RunStarted { thread_id: thread_id.clone(), run_id: run_id.clone() })
        .is_err()
    {
        warn!("consumer gone before run start");
    }

    // The runtime gets its own task so a panic surfaces here as a join
    // error instead of tearing the stream down without a terminus.
    let exec = tokio::spawn(async move { runtime.run(&input, processor).await });
    let result = match exec.await {
        Ok(result) => result,
        Err(join_err) => Err(RuntimeError::Execution(format!("runtime panicked: {join_err}"))),
    };

    let terminal = match result {
        Ok(()) => UiEvent::RunFinished { thread_id, run_id },
        Err(err) => {
            error!(error = %err, "run failed");
            UiEvent::RunError { message: err.to_string() }
        }
    };
    if sink.send(terminal).is_err() {
        warn!("consumer gone before terminal event");
    }
    sink.close();
}

pin_project! {
    /// Consumer stream for one run. Lifecycle events are rewritten with
    /// the canonical thread/run ids the client supplied; everything else
    /// passes through untouched. Ends after the channel's sentinel.
    pub struct RunStream {
        #[pin]
        drain: EventDrain,
        thread_id: ThreadId,
        run_id: RunId,
    }
}

impl Stream for RunStream {
    type Item = UiEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<UiEvent>> {
        let this = self.project();
        match this.drain.poll_next(cx) {
            Poll::Ready(Some(event)) => Poll::Ready(Some(match event {
                UiEvent::RunStarted { .. } => UiEvent::RunStarted {
                    thread_id: this.thread_id.clone(),
                    run_id: this.run_id.clone(),
                },
                UiEvent::RunFinished { .. } => UiEvent::RunFinished {
                    thread_id: this.thread_id.clone(),
                    run_id: this.run_id.clone(),
                },
                other => other,
            })),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}
