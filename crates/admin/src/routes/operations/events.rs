//! Live operations feed over server-sent events.

use std::convert::Infallible;

use axum::{
    extract::State,
    response::{
        Sse,
        sse::{Event, KeepAlive},
    },
};
use futures::{Stream, StreamExt};
use tracing::info;

use crate::middleware::RequireStaff;
use crate::state::AppState;

/// GET /api/operations/events
///
/// Each event carries its kind as the SSE event name and the JSON payload
/// as data. Events published before the client connects are not replayed.
pub async fn stream(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = state.events();
    info!(
        staff = %staff.id,
        subscribers = events.subscriber_count() + 1,
        "Operations feed opened"
    );

    let sse_stream = events.subscribe().map(|event| {
        let json = serde_json::to_string(&event)
            .unwrap_or_else(|_| r#"{"error":"Failed to serialize event"}"#.to_string());
        Ok(Event::default().event(event.name()).data(json))
    });

    Sse::new(sse_stream).keep_alive(KeepAlive::default())
}
