use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::instrumentation::{WhyOpenedEvent, MAX_EVENTS};
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<usize>,
}

/// GET /api/v1/why-events
/// Most recent why_opened events, oldest first.
pub async fn handle_list_events(
    State(state): State<AppState>,
    Query(params): Query<EventsQuery>,
) -> Json<Vec<WhyOpenedEvent>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_EVENTS);
    Json(state.sink.tail(limit).await)
}
