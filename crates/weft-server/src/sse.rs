use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::{Stream, StreamExt};

use weft_core::protocol::UiEvent;
use weft_runtime::runtime::RunInput;

use crate::server::AppState;

/// POST /run: start a run and stream its protocol events back as
/// server-sent events. The stream always reaches a terminal event; the
/// driver guarantees that even when execution fails or panics.
pub async fn run_handler(
    State(state): State<AppState>,
    Json(input): Json<RunInput>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = state.driver.start(input).map(|event| Ok(encode(&event)));
    Sse::new(events).keep_alive(KeepAlive::default())
}

/// One protocol event as one SSE message: event name from the type tag,
/// data the event's JSON. An encoding failure is converted into a
/// `RunError` message so the client still sees a well-formed terminus
/// instead of a truncated stream.
fn encode(event: &UiEvent) -> Event {
    match Event::default().event(event.event_type()).json_data(event) {
        Ok(encoded) => encoded,
        Err(err) => {
            tracing::error!(error = %err, event_type = event.event_type(), "event encoding failed");
            let fallback = UiEvent::RunError { message: format!("event encoding failed: {err}") };
            Event::default()
                .event(fallback.event_type())
                .json_data(&fallback)
                .unwrap_or_else(|_| Event::default().event("run_error").data("encoding failed"))
        }
    }
}
