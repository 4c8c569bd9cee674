use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use pin_project_lite::pin_project;
use tokio::sync::mpsc;

use weft_core::errors::TranslateError;
use weft_core::protocol::UiEvent;

/// The request-scoped FIFO conduit from execution to the output stream.
/// One channel per run; no two runs ever share one.
pub struct RunChannel;

impl RunChannel {
    pub fn open() -> (EventSink, EventDrain) {
        let (tx, rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        (EventSink { tx, closed }, EventDrain { rx, done: false })
    }
}

/// Producer handle. Cheap to clone; a runtime that dispatches work onto a
/// worker thread/task must move a clone across that spawn point itself,
/// since nothing ambient survives the boundary. Dropping the worker's
/// clone when its unit of work ends is what prevents leakage into
/// unrelated requests reusing the same worker.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<Option<UiEvent>>,
    closed: Arc<AtomicBool>,
}

impl EventSink {
    /// Enqueue one event. Never blocks. Fails with `ChannelUnavailable`
    /// once the channel has been closed or the consumer is gone.
    pub fn send(&self, event: UiEvent) -> Result<(), TranslateError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TranslateError::ChannelUnavailable);
        }
        self.tx
            .send(Some(event))
            .map_err(|_| TranslateError::ChannelUnavailable)
    }

    /// Enqueue the end-of-stream sentinel and refuse all further sends,
    /// from this handle and every clone of it. Idempotent.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            let _ = self.tx.send(None);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

pin_project! {
    /// Consumer side: yields events in FIFO order until the sentinel is
    /// observed, then terminates. Finite and not restartable.
    pub struct EventDrain {
        rx: mpsc::UnboundedReceiver<Option<UiEvent>>,
        done: bool,
    }
}

impl Stream for EventDrain {
    type Item = UiEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<UiEvent>> {
        let this = self.project();
        if *this.done {
            return Poll::Ready(None);
        }
        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(Some(event))) => Poll::Ready(Some(event)),
            Poll::Ready(Some(None)) | Poll::Ready(None) => {
                *this.done = true;
                this.rx.close();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
