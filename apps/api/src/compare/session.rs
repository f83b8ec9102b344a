//! Compare sessions drive `CompareMachine` against the why-service.
//!
//! A `FetchPair` effect spawns one fetch per slot, fire-and-forget. Each task
//! reports back through `settle`; results for a selection that has since
//! changed (or a session that was deleted) are dropped there. In-flight
//! requests are never cancelled.
//!
//! Sessions idle for longer than the configured TTL are evicted on `create`
//! and `select`; when the live count is at its cap, the least recently
//! touched session makes room for a new one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::compare::selection::{
    CompareMachine, Phase, Selection, SelectionEffect, SlotStatus, COMPARE_COST,
};
use crate::drawer::{render_panel, DrawerView, ExplanationMode, PanelState, Section};
use crate::instrumentation::{WhyOpenedEvent, WhySink};
use crate::models::candidate::Candidate;
use crate::models::filters::FilterSet;
use crate::plan::{BlockReason, PlanContext};
use crate::why_client::{fetch_explanation, FetchedExplanation, WhyService};

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("compare session {0} not found")]
    NotFound(Uuid),

    #[error("panel index {0} out of range")]
    InvalidPanel(usize),
}

pub struct CompareSession {
    machine: CompareMachine,
    plan: PlanContext,
    filters: FilterSet,
    role: String,
    candidates: HashMap<String, Candidate>,
    panels: [PanelState; 2],
    last_touched: Instant,
}

impl CompareSession {
    fn new(filters: FilterSet, plan: PlanContext, role: String) -> Self {
        Self {
            last_touched: Instant::now(),
            machine: CompareMachine::new(),
            filters: filters.for_plan(&plan),
            plan,
            role,
            candidates: HashMap::new(),
            panels: [PanelState::default(), PanelState::default()],
        }
    }

    fn view(&self, session_id: Uuid, blocked: Option<BlockReason>) -> CompareView {
        let mode = self.plan.mode();
        let (slots, drawer) = match self.machine.selection() {
            Selection::Comparing { pair, slots } => {
                let statuses = slots.iter().map(|s| s.status()).collect();
                let drawer = match (slots[0].explanation(), slots[1].explanation()) {
                    (Some(a), Some(b)) => Some(DrawerView::Compare {
                        panels: [
                            render_panel(&pair[0], a, mode, self.panels[0].toggles()),
                            render_panel(&pair[1], b, mode, self.panels[1].toggles()),
                        ],
                    }),
                    _ => None,
                };
                (statuses, drawer)
            }
            _ => (Vec::new(), None),
        };

        CompareView {
            session_id,
            phase: self.machine.phase(),
            selected: self
                .machine
                .selected_ids()
                .into_iter()
                .map(str::to_string)
                .collect(),
            slots,
            mode,
            credits_remaining: if self.plan.is_metered() {
                self.plan.credits_remaining
            } else {
                None
            },
            drawer,
            blocked,
        }
    }

    /// Marks both panels as presenting the current pair and returns the
    /// audit events for them.
    fn open_drawer(&mut self) -> Vec<WhyOpenedEvent> {
        let mode = self.plan.mode();
        let generation = self.machine.generation();
        let Selection::Comparing { pair, slots } = self.machine.selection() else {
            return Vec::new();
        };

        let mut events = Vec::new();
        for (idx, (id, slot)) in pair.iter().zip(slots.iter()).enumerate() {
            if let Some(explanation) = slot.explanation() {
                self.panels[idx].present(&format!("{generation}:{id}"), mode);
                events.push(WhyOpenedEvent::new(id, &self.role, explanation, mode));
            }
        }
        events
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareView {
    pub session_id: Uuid,
    pub phase: Phase,
    pub selected: Vec<String>,
    pub slots: Vec<SlotStatus>,
    pub mode: ExplanationMode,
    pub credits_remaining: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drawer: Option<DrawerView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked: Option<BlockReason>,
}

/// Result of a `select`. `pending` holds the spawned fetch tasks; callers
/// may drop them (fire-and-forget) or await them.
pub struct SelectOutcome {
    pub view: CompareView,
    pub pending: Vec<JoinHandle<()>>,
}

/// Default idle time after which a session is evicted.
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(30 * 60);
/// Default cap on live sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

#[derive(Clone)]
pub struct CompareSessions {
    inner: Arc<Mutex<HashMap<Uuid, CompareSession>>>,
    idle_ttl: Duration,
    max_sessions: usize,
}

impl Default for CompareSessions {
    fn default() -> Self {
        Self::with_limits(DEFAULT_IDLE_TTL, DEFAULT_MAX_SESSIONS)
    }
}

impl CompareSessions {
    pub fn with_limits(idle_ttl: Duration, max_sessions: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            idle_ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    pub async fn create(&self, filters: FilterSet, plan: PlanContext, role: String) -> CompareView {
        let id = Uuid::new_v4();
        let session = CompareSession::new(filters, plan, role);
        let view = session.view(id, None);

        let mut sessions = self.inner.lock().await;
        self.evict_idle(&mut sessions);
        if sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, s)| s.last_touched)
                .map(|(id, _)| *id);
            if let Some(oldest) = oldest {
                sessions.remove(&oldest);
                debug!("Evicted compare session {oldest} to stay under {} sessions", self.max_sessions);
            }
        }
        sessions.insert(id, session);
        info!("Created compare session {id} ({} live)", sessions.len());
        view
    }

    pub async fn view(&self, id: Uuid) -> Result<CompareView, SessionError> {
        let mut sessions = self.inner.lock().await;
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        session.last_touched = Instant::now();
        Ok(session.view(id, None))
    }

    fn evict_idle(&self, sessions: &mut HashMap<Uuid, CompareSession>) {
        let now = Instant::now();
        let before = sessions.len();
        sessions.retain(|_, s| now.duration_since(s.last_touched) < self.idle_ttl);
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!("Evicted {evicted} idle compare sessions");
        }
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), SessionError> {
        self.inner
            .lock()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(SessionError::NotFound(id))
    }

    pub async fn toggle_section(
        &self,
        id: Uuid,
        panel: usize,
        section: Section,
    ) -> Result<CompareView, SessionError> {
        let mut sessions = self.inner.lock().await;
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        session.last_touched = Instant::now();
        let state = session
            .panels
            .get_mut(panel)
            .ok_or(SessionError::InvalidPanel(panel))?;
        state.toggle(section);
        Ok(session.view(id, None))
    }

    pub async fn select(
        &self,
        id: Uuid,
        candidate: Candidate,
        service: Arc<dyn WhyService>,
        sink: Arc<WhySink>,
    ) -> Result<SelectOutcome, SessionError> {
        let mut sessions = self.inner.lock().await;
        self.evict_idle(&mut sessions);
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        session.last_touched = Instant::now();

        let candidate_id = candidate.id.clone();
        session.candidates.insert(candidate_id.clone(), candidate);

        let effect = session.machine.select(&candidate_id, &session.plan);

        let selected: Vec<String> = session
            .machine
            .selected_ids()
            .into_iter()
            .map(str::to_string)
            .collect();
        session.candidates.retain(|k, _| selected.contains(k));

        let mut blocked = None;
        let mut pending = Vec::new();
        match effect {
            SelectionEffect::Idle => {}
            SelectionEffect::CloseDrawer => {
                session.panels.iter_mut().for_each(PanelState::clear);
            }
            SelectionEffect::Blocked(reason) => {
                debug!("Compare selection blocked in session {id}: {reason:?}");
                blocked = Some(reason);
            }
            SelectionEffect::FetchPair { generation, pair } => {
                session.plan.consume(COMPARE_COST);
                session.panels.iter_mut().for_each(PanelState::clear);
                for (slot, candidate_id) in pair.iter().enumerate() {
                    let Some(candidate) = session.candidates.get(candidate_id).cloned() else {
                        continue;
                    };
                    pending.push(self.spawn_fetch(FetchJob {
                        session_id: id,
                        generation,
                        slot,
                        candidate,
                        filters: session.filters.clone(),
                        service: service.clone(),
                        sink: sink.clone(),
                    }));
                }
            }
        }

        Ok(SelectOutcome {
            view: session.view(id, blocked),
            pending,
        })
    }

    fn spawn_fetch(&self, job: FetchJob) -> JoinHandle<()> {
        let sessions = self.clone();
        tokio::spawn(async move {
            let fetched =
                fetch_explanation(job.service.as_ref(), &job.candidate, &job.filters).await;
            sessions
                .settle(job.session_id, job.generation, job.slot, fetched, &job.sink)
                .await;
        })
    }

    async fn settle(
        &self,
        id: Uuid,
        generation: u64,
        slot: usize,
        fetched: FetchedExplanation,
        sink: &WhySink,
    ) {
        let events = {
            let mut sessions = self.inner.lock().await;
            let Some(session) = sessions.get_mut(&id) else {
                debug!("Dropping explanation for closed compare session {id}");
                return;
            };
            if !session.machine.settle(generation, slot, fetched) {
                debug!("Dropping stale explanation for session {id} slot {slot} (generation {generation})");
                return;
            }
            if !session.machine.drawer_open() {
                return;
            }
            session.open_drawer()
        };

        for event in events {
            sink.record(event).await;
        }
    }
}

struct FetchJob {
    session_id: Uuid,
    generation: u64,
    slot: usize,
    candidate: Candidate,
    filters: FilterSet,
    service: Arc<dyn WhyService>,
    sink: Arc<WhySink>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawer::SectionBody;
    use crate::models::explanation::BaseExplanation;
    use crate::why_client::{WhyClientError, WhyRequest};
    use async_trait::async_trait;
    use serde_json::json;

    /// Succeeds for every candidate except `fail_id`.
    struct SelectiveService {
        fail_id: &'static str,
    }

    #[async_trait]
    impl WhyService for SelectiveService {
        async fn explain(&self, request: &WhyRequest) -> Result<BaseExplanation, WhyClientError> {
            if request.candidate_id == self.fail_id {
                return Err(WhyClientError::Api {
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            Ok(BaseExplanation::from(json!({
                "score": 60,
                "summary": format!("Service summary for {}", request.candidate_id),
                "reasons": [{"requirement": "Specific", "evidence": [{"text": "x", "source": "y"}]}]
            })))
        }
    }

    fn candidate(id: &str, name: &str) -> Candidate {
        serde_json::from_value(json!({"id": id, "name": name, "title": "CSM"})).unwrap()
    }

    fn deps() -> (Arc<dyn WhyService>, Arc<WhySink>) {
        (
            Arc::new(SelectiveService { fail_id: "b" }),
            Arc::new(WhySink::in_memory()),
        )
    }

    async fn await_all(outcome: SelectOutcome) -> CompareView {
        for handle in outcome.pending {
            handle.await.unwrap();
        }
        outcome.view
    }

    #[tokio::test]
    async fn test_pair_settles_and_opens_drawer() {
        let sessions = CompareSessions::default();
        let (service, sink) = deps();
        let view = sessions
            .create(FilterSet::default(), PlanContext::enterprise(), "recruiter".into())
            .await;
        let id = view.session_id;

        let first = sessions
            .select(id, candidate("a", "Ana Ruiz"), service.clone(), sink.clone())
            .await
            .unwrap();
        assert_eq!(first.view.phase, Phase::OneSelected);
        assert!(first.pending.is_empty());

        let second = sessions
            .select(id, candidate("b", "Ben Ode"), service.clone(), sink.clone())
            .await
            .unwrap();
        assert_eq!(second.view.phase, Phase::Comparing);
        assert_eq!(second.view.slots, vec![SlotStatus::Pending, SlotStatus::Pending]);
        await_all(second).await;

        let view = sessions.view(id).await.unwrap();
        assert_eq!(view.slots, vec![SlotStatus::Resolved, SlotStatus::Substituted]);
        match view.drawer {
            Some(DrawerView::Compare { panels }) => {
                assert_eq!(panels[0].candidate_id, "a");
                assert_eq!(panels[1].candidate_id, "b");
                match &panels[1].sections[0].body {
                    Some(SectionBody::Summary { text }) => {
                        assert!(text.starts_with("Ben recommended based on"))
                    }
                    other => panic!("unexpected body: {other:?}"),
                }
            }
            other => panic!("expected compare drawer, got {other:?}"),
        }
        assert_eq!(sink.len().await, 2);
    }

    #[tokio::test]
    async fn test_third_pick_keeps_first_candidate() {
        let sessions = CompareSessions::default();
        let (service, sink) = deps();
        let id = sessions
            .create(FilterSet::default(), PlanContext::enterprise(), "recruiter".into())
            .await
            .session_id;

        for c in [candidate("a", "Ana"), candidate("b", "Ben")] {
            await_all(sessions.select(id, c, service.clone(), sink.clone()).await.unwrap()).await;
        }
        let view = await_all(
            sessions
                .select(id, candidate("c", "Cy"), service.clone(), sink.clone())
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(view.selected, vec!["a", "c"]);

        let settled = sessions.view(id).await.unwrap();
        assert_eq!(settled.slots, vec![SlotStatus::Resolved, SlotStatus::Resolved]);
    }

    #[tokio::test]
    async fn test_metered_plan_spends_two_credits_then_blocks() {
        let sessions = CompareSessions::default();
        let (service, sink) = deps();
        let id = sessions
            .create(FilterSet::default(), PlanContext::metered(3), "recruiter".into())
            .await
            .session_id;

        sessions
            .select(id, candidate("a", "Ana"), service.clone(), sink.clone())
            .await
            .unwrap();
        let outcome = sessions
            .select(id, candidate("c", "Cy"), service.clone(), sink.clone())
            .await
            .unwrap();
        assert_eq!(outcome.view.credits_remaining, Some(1));
        await_all(outcome).await;

        let blocked = sessions
            .select(id, candidate("d", "Di"), service.clone(), sink.clone())
            .await
            .unwrap();
        assert!(blocked.pending.is_empty());
        assert_eq!(
            blocked.view.blocked,
            Some(BlockReason::InsufficientCredits {
                needed: 2,
                remaining: 1
            })
        );
        assert_eq!(blocked.view.selected, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_deselect_closes_drawer_and_discards_late_results() {
        let sessions = CompareSessions::default();
        let (service, sink) = deps();
        let id = sessions
            .create(FilterSet::default(), PlanContext::enterprise(), "recruiter".into())
            .await
            .session_id;

        sessions
            .select(id, candidate("a", "Ana"), service.clone(), sink.clone())
            .await
            .unwrap();
        let in_flight = sessions
            .select(id, candidate("c", "Cy"), service.clone(), sink.clone())
            .await
            .unwrap();
        let closed = sessions
            .select(id, candidate("a", "Ana"), service.clone(), sink.clone())
            .await
            .unwrap();
        assert_eq!(closed.view.phase, Phase::Empty);

        await_all(in_flight).await;
        let view = sessions.view(id).await.unwrap();
        assert_eq!(view.phase, Phase::Empty);
        assert!(view.drawer.is_none());
    }

    #[tokio::test]
    async fn test_section_toggles_and_unknown_session() {
        let sessions = CompareSessions::default();
        let id = sessions
            .create(FilterSet::default(), PlanContext::enterprise(), "recruiter".into())
            .await
            .session_id;

        assert_eq!(
            sessions.toggle_section(id, 2, Section::Skills).await,
            Err(SessionError::InvalidPanel(2))
        );
        let missing = Uuid::new_v4();
        assert_eq!(
            sessions.view(missing).await,
            Err(SessionError::NotFound(missing))
        );
        assert!(sessions.remove(id).await.is_ok());
        assert_eq!(sessions.remove(id).await, Err(SessionError::NotFound(id)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sessions_are_evicted() {
        let sessions = CompareSessions::with_limits(Duration::from_secs(60), 100);
        let (service, sink) = deps();
        let plan = PlanContext::enterprise;

        let stale = sessions
            .create(FilterSet::default(), plan(), "recruiter".into())
            .await
            .session_id;
        let active = sessions
            .create(FilterSet::default(), plan(), "recruiter".into())
            .await
            .session_id;

        tokio::time::advance(Duration::from_secs(40)).await;
        sessions.view(active).await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;

        let fresh = sessions
            .create(FilterSet::default(), plan(), "recruiter".into())
            .await
            .session_id;
        assert_eq!(sessions.view(stale).await, Err(SessionError::NotFound(stale)));
        assert!(sessions.view(active).await.is_ok());

        tokio::time::advance(Duration::from_secs(61)).await;
        let missing = sessions
            .select(fresh, candidate("a", "Ana"), service, sink)
            .await
            .err();
        assert_eq!(missing, Some(SessionError::NotFound(fresh)));
        assert_eq!(sessions.inner.lock().await.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_cap_evicts_least_recently_touched() {
        let sessions = CompareSessions::with_limits(Duration::from_secs(3600), 2);
        let mut ids = Vec::new();
        for _ in 0..2 {
            ids.push(
                sessions
                    .create(FilterSet::default(), PlanContext::enterprise(), "recruiter".into())
                    .await
                    .session_id,
            );
            tokio::time::advance(Duration::from_secs(1)).await;
        }
        sessions.view(ids[0]).await.unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;

        let third = sessions
            .create(FilterSet::default(), PlanContext::enterprise(), "recruiter".into())
            .await
            .session_id;

        assert_eq!(sessions.inner.lock().await.len(), 2);
        assert!(sessions.view(ids[0]).await.is_ok());
        assert_eq!(sessions.view(ids[1]).await, Err(SessionError::NotFound(ids[1])));
        assert!(sessions.view(third).await.is_ok());
    }
}
