pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::compare::handlers as compare;
use crate::explain::handlers as explain;
use crate::instrumentation::handlers as instrumentation;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // WHY explanations
        .route("/api/v1/candidates/why", post(explain::handle_why))
        .route(
            "/api/v1/why-events",
            get(instrumentation::handle_list_events),
        )
        // Compare mode
        .route(
            "/api/v1/compare/sessions",
            post(compare::handle_create_session),
        )
        .route(
            "/api/v1/compare/sessions/:id",
            get(compare::handle_get_session).delete(compare::handle_delete_session),
        )
        .route(
            "/api/v1/compare/sessions/:id/select",
            post(compare::handle_select),
        )
        .route(
            "/api/v1/compare/sessions/:id/sections",
            post(compare::handle_toggle_section),
        )
        .with_state(state)
}
