use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;

use crate::state::AppState;

/// GET /api/events — SSE stream emitting a `status` event with the JSON
/// `StatusChange` for every transition. Lagged receivers skip missed events.
pub async fn sse_events(State(app): State<AppState>) -> impl axum::response::IntoResponse {
    let rx = app.executor.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| {
        let change = msg.ok()?;
        let data = serde_json::to_string(&change).ok()?;
        Some(Ok::<Event, Infallible>(
            Event::default().event("status").data(data),
        ))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
