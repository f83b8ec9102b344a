use std::sync::Arc;

use crate::compare::session::CompareSessions;
use crate::instrumentation::WhySink;
use crate::why_client::WhyService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Upstream explanation source. Default: HttpWhyClient.
    pub why: Arc<dyn WhyService>,
    pub sink: Arc<WhySink>,
    pub sessions: CompareSessions,
}
