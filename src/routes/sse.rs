use std::convert::Infallible;

use axum::{Router, extract::State, response::sse::Sse, routing::get};
use futures::Stream;
use tracing::info;

use crate::{services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/v1/announcements",
    tag = "sse",
    responses((status = 200, description = "Announcement SSE stream", content_type = "text/event-stream", body = String))
)]
/// Stream rendered announcements as they leave the rate limiter.
pub async fn announcements_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    let receiver = sse_service::subscribe_announcements(&state);
    info!("New announcement SSE connection");
    sse_service::to_sse_stream(receiver, state.shutdown())
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/v1/announcements", get(announcements_stream))
}
