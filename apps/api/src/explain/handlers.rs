//! Axum route handlers for single-candidate WHY explanations.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::drawer::{render_panel, DrawerView, SectionToggles};
use crate::errors::AppError;
use crate::instrumentation::WhyOpenedEvent;
use crate::models::candidate::Candidate;
use crate::models::explanation::Explanation;
use crate::models::filters::FilterSet;
use crate::plan::{BlockReason, PlanContext};
use crate::state::AppState;
use crate::why_client::{fetch_explanation, ExplanationOrigin};

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct WhyRequestBody {
    pub candidate: Candidate,
    #[serde(default)]
    pub filters: FilterSet,
    #[serde(default)]
    pub plan: PlanContext,
    /// Role of the viewer, recorded on the audit event.
    #[serde(default = "default_role")]
    pub role: String,
}

pub fn default_role() -> String {
    "recruiter".to_string()
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WhyResponse {
    Explained {
        explanation: Explanation,
        origin: ExplanationOrigin,
        drawer: DrawerView,
        #[serde(rename = "creditsRemaining")]
        credits_remaining: Option<u32>,
    },
    /// The action was a no-op (explanations off or credits exhausted).
    Skipped { reason: BlockReason },
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/candidates/why
///
/// Fetches (or falls back to) a base explanation, enriches it, records a
/// `why_opened` event and returns the single-panel drawer.
pub async fn handle_why(
    State(state): State<AppState>,
    Json(request): Json<WhyRequestBody>,
) -> Result<Json<WhyResponse>, AppError> {
    let WhyRequestBody {
        candidate,
        filters,
        mut plan,
        role,
    } = request;

    if candidate.id.is_empty() {
        return Err(AppError::Validation("candidate.id cannot be empty".to_string()));
    }

    if let Err(reason) = plan.check(1) {
        return Ok(Json(WhyResponse::Skipped { reason }));
    }

    let filters = filters.for_plan(&plan);
    let fetched = fetch_explanation(state.why.as_ref(), &candidate, &filters).await;
    plan.consume(1);

    let mode = plan.mode();
    let panel = render_panel(
        &candidate.id,
        &fetched.explanation,
        mode,
        &SectionToggles::default(),
    );

    state
        .sink
        .record(WhyOpenedEvent::new(
            &candidate.id,
            &role,
            &fetched.explanation,
            mode,
        ))
        .await;

    Ok(Json(WhyResponse::Explained {
        explanation: fetched.explanation,
        origin: fetched.origin,
        drawer: DrawerView::Single { panel },
        credits_remaining: if plan.is_metered() {
            plan.credits_remaining
        } else {
            None
        },
    }))
}
