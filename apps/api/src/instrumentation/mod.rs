//! `why_opened` audit log.
//!
//! Every time a WHY panel is shown, a trimmed snapshot of the explanation is
//! appended to a bounded, append-only log (oldest entries dropped first). When a
//! path is configured, each event is also appended to a JSON-lines file.
//! Recording is a side effect only: failures are logged, never returned.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::drawer::ExplanationMode;
use crate::models::explanation::{Explanation, Reason};

pub mod handlers;

/// Maximum number of events retained.
pub const MAX_EVENTS: usize = 5000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhyOpenedEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub candidate_id: String,
    pub role: String,
    pub snapshot: WhySnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhySnapshot {
    pub mode: ExplanationMode,
    pub score: f64,
    pub summary: String,
    pub reasons: Vec<Reason>,
    pub matched_skills: Vec<String>,
    pub filters_triggered: Vec<String>,
}

impl WhySnapshot {
    /// Reasons capped at 2/8 and evidence at 1/4 per reason (lite/full).
    pub fn trim(explanation: &Explanation, mode: ExplanationMode) -> Self {
        let (max_reasons, max_evidence) = match mode {
            ExplanationMode::Full => (8, 4),
            ExplanationMode::Lite | ExplanationMode::Off => (2, 1),
        };
        Self {
            mode,
            score: explanation.score,
            summary: explanation.summary.clone(),
            reasons: explanation
                .reasons
                .iter()
                .take(max_reasons)
                .map(|r| Reason {
                    requirement: r.requirement.clone(),
                    evidence: r.evidence.iter().take(max_evidence).cloned().collect(),
                })
                .collect(),
            matched_skills: explanation.skills.matched.clone(),
            filters_triggered: explanation.filters_triggered.clone(),
        }
    }
}

impl WhyOpenedEvent {
    pub fn new(
        candidate_id: &str,
        role: &str,
        explanation: &Explanation,
        mode: ExplanationMode,
    ) -> Self {
        Self {
            event_type: "why_opened".to_string(),
            timestamp: Utc::now(),
            candidate_id: candidate_id.to_string(),
            role: role.to_string(),
            snapshot: WhySnapshot::trim(explanation, mode),
        }
    }
}

/// Bounded in-memory event log.
#[derive(Debug, Default)]
pub struct WhyEventLog {
    entries: VecDeque<WhyOpenedEvent>,
}

impl WhyEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, event: WhyOpenedEvent) {
        if self.entries.len() >= MAX_EVENTS {
            self.entries.pop_front();
        }
        self.entries.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Most recent `limit` events, oldest first.
    pub fn tail(&self, limit: usize) -> Vec<WhyOpenedEvent> {
        let skip = self.entries.len().saturating_sub(limit);
        self.entries.iter().skip(skip).cloned().collect()
    }

    fn from_events(events: Vec<WhyOpenedEvent>) -> Self {
        let mut log = Self::new();
        for event in events {
            log.append(event);
        }
        log
    }
}

/// The backing file is rewritten once it holds this many lines.
const COMPACT_AFTER_LINES: usize = MAX_EVENTS * 2;

struct SinkState {
    log: WhyEventLog,
    /// Lines currently in the backing file, including evicted and corrupt ones.
    file_lines: usize,
}

/// Shared sink: the log behind an async mutex plus an optional JSON-lines file.
///
/// Each event is appended to the file as one line. The 5000 cap is applied
/// when the file is loaded; the file itself is compacted through a temp file
/// and rename, on load and whenever it grows past `COMPACT_AFTER_LINES`.
pub struct WhySink {
    state: Mutex<SinkState>,
    path: Option<PathBuf>,
}

impl WhySink {
    pub fn in_memory() -> Self {
        Self {
            state: Mutex::new(SinkState {
                log: WhyEventLog::new(),
                file_lines: 0,
            }),
            path: None,
        }
    }

    /// Opens a file-backed sink, loading the newest events already on disk.
    /// Corrupt lines (a torn final write, say) are skipped.
    pub async fn open(path: PathBuf) -> Self {
        let (events, file_lines) = read_lines(&path).await;
        info!("Loaded {} why events from {}", events.len(), path.display());

        let mut state = SinkState {
            log: WhyEventLog::from_events(events),
            file_lines,
        };
        if state.file_lines > state.log.len() {
            compact(&path, &mut state).await;
        }

        Self {
            state: Mutex::new(state),
            path: Some(path),
        }
    }

    pub async fn record(&self, event: WhyOpenedEvent) {
        let line = self.path.as_ref().and_then(|_| match serde_json::to_vec(&event) {
            Ok(mut line) => {
                line.push(b'\n');
                Some(line)
            }
            Err(e) => {
                warn!("Failed to serialize why event for {}: {e}", event.candidate_id);
                None
            }
        });

        let mut state = self.state.lock().await;
        state.log.append(event);

        let (Some(path), Some(line)) = (&self.path, line) else {
            return;
        };
        match append_line(path, &line).await {
            Ok(()) => state.file_lines += 1,
            Err(e) => warn!("Failed to append to why log {}: {e}", path.display()),
        }
        if state.file_lines >= COMPACT_AFTER_LINES {
            compact(path, &mut state).await;
        }
    }

    pub async fn tail(&self, limit: usize) -> Vec<WhyOpenedEvent> {
        self.state.lock().await.log.tail(limit)
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.log.len()
    }
}

/// Parses a JSON-lines log. Returns the events and the number of non-empty lines.
async fn read_lines(path: &Path) -> (Vec<WhyOpenedEvent>, usize) {
    let data = match tokio::fs::read_to_string(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return (Vec::new(), 0),
        Err(e) => {
            warn!("Ignoring unreadable why log {}: {e}", path.display());
            return (Vec::new(), 0);
        }
    };

    let mut events = Vec::new();
    let mut lines = 0;
    for (i, line) in data.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        lines += 1;
        match serde_json::from_str::<WhyOpenedEvent>(line) {
            Ok(event) => events.push(event),
            Err(e) => warn!(
                file = %path.display(),
                line = i + 1,
                error = %e,
                "skipping corrupt why log line"
            ),
        }
    }
    (events, lines)
}

async fn append_line(path: &Path, line: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .await?;
    file.write_all(line).await?;
    file.flush().await
}

/// Rewrites the file to hold exactly the retained events.
async fn compact(path: &Path, state: &mut SinkState) {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut buf = Vec::new();
    for event in &state.log.entries {
        match serde_json::to_vec(event) {
            Ok(line) => {
                buf.extend_from_slice(&line);
                buf.push(b'\n');
            }
            Err(e) => {
                warn!("Skipping unserializable why event during compaction: {e}");
            }
        }
    }

    let written = match tokio::fs::write(&tmp, &buf).await {
        Ok(()) => tokio::fs::rename(&tmp, path).await,
        Err(e) => Err(e),
    };
    match written {
        Ok(()) => {
            debug!(
                "Compacted why log {} from {} to {} lines",
                path.display(),
                state.file_lines,
                state.log.len()
            );
            state.file_lines = state.log.len();
        }
        Err(e) => warn!("Failed to compact why log {}: {e}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::explanation::{Evidence, SkillBreakdown};

    fn explanation() -> Explanation {
        Explanation {
            score: 80.0,
            summary: "Jane: owned renewals".to_string(),
            reasons: (0..10)
                .map(|i| Reason {
                    requirement: format!("R{i}"),
                    evidence: (0..5).map(|j| Evidence::new(format!("e{j}"), "resume")).collect(),
                })
                .collect(),
            skills: SkillBreakdown::default(),
            trajectory: Vec::new(),
            filters_triggered: Vec::new(),
        }
    }

    fn event(id: &str) -> WhyOpenedEvent {
        WhyOpenedEvent::new(id, "recruiter", &explanation(), ExplanationMode::Lite)
    }

    #[test]
    fn test_snapshot_caps_by_mode() {
        let lite = WhySnapshot::trim(&explanation(), ExplanationMode::Lite);
        assert_eq!(lite.reasons.len(), 2);
        assert!(lite.reasons.iter().all(|r| r.evidence.len() == 1));

        let full = WhySnapshot::trim(&explanation(), ExplanationMode::Full);
        assert_eq!(full.reasons.len(), 8);
        assert!(full.reasons.iter().all(|r| r.evidence.len() == 4));
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let value = serde_json::to_value(event("c1")).unwrap();
        assert_eq!(value["type"], "why_opened");
        assert_eq!(value["candidateId"], "c1");
        assert_eq!(value["role"], "recruiter");
        assert!(value["snapshot"]["matchedSkills"].is_array());
        assert!(value["snapshot"]["filtersTriggered"].is_array());
    }

    #[test]
    fn test_log_drops_oldest_past_cap() {
        let mut log = WhyEventLog::new();
        for i in 0..(MAX_EVENTS + 3) {
            log.append(event(&format!("c{i}")));
        }
        assert_eq!(log.len(), MAX_EVENTS);
        assert_eq!(log.tail(MAX_EVENTS)[0].candidate_id, "c3");
        assert_eq!(log.tail(1)[0].candidate_id, format!("c{}", MAX_EVENTS + 2));
    }

    fn file_lines(path: &Path) -> usize {
        std::fs::read_to_string(path).unwrap().lines().count()
    }

    #[tokio::test]
    async fn test_file_sink_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("why_events.jsonl");

        let sink = WhySink::open(path.clone()).await;
        sink.record(event("c1")).await;
        sink.record(event("c2")).await;
        assert_eq!(file_lines(&path), 2);

        let reopened = WhySink::open(path).await;
        let ids: Vec<String> = reopened
            .tail(10)
            .await
            .into_iter()
            .map(|e| e.candidate_id)
            .collect();
        assert_eq!(ids, vec!["c1", "c2"]);
    }

    #[tokio::test]
    async fn test_reload_keeps_newest_events_and_compacts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("why_events.jsonl");

        let sink = WhySink::open(path.clone()).await;
        for i in 0..=COMPACT_AFTER_LINES {
            sink.record(event(&format!("c{i}"))).await;
        }
        // Compacted at COMPACT_AFTER_LINES, then one more append.
        assert_eq!(file_lines(&path), MAX_EVENTS + 1);

        let reopened = WhySink::open(path.clone()).await;
        assert_eq!(reopened.len().await, MAX_EVENTS);
        let kept = reopened.tail(MAX_EVENTS).await;
        assert_eq!(kept[0].candidate_id, format!("c{}", COMPACT_AFTER_LINES + 1 - MAX_EVENTS));
        assert_eq!(kept[MAX_EVENTS - 1].candidate_id, format!("c{COMPACT_AFTER_LINES}"));
        assert_eq!(file_lines(&path), MAX_EVENTS);
        assert!(!dir.path().join("why_events.jsonl.tmp").exists());
    }

    #[tokio::test]
    async fn test_torn_last_line_keeps_earlier_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("why_events.jsonl");

        let sink = WhySink::open(path.clone()).await;
        sink.record(event("c1")).await;
        sink.record(event("c2")).await;
        drop(sink);

        let mut data = std::fs::read(&path).unwrap();
        data.extend_from_slice(br#"{"type":"why_opened","timestamp""#);
        std::fs::write(&path, data).unwrap();

        let reopened = WhySink::open(path.clone()).await;
        assert_eq!(reopened.len().await, 2);
        reopened.record(event("c3")).await;

        let ids: Vec<String> = WhySink::open(path)
            .await
            .tail(10)
            .await
            .into_iter()
            .map(|e| e.candidate_id)
            .collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("why_events.jsonl");
        tokio::fs::write(&path, b"{not json").await.unwrap();

        let sink = WhySink::open(path).await;
        assert_eq!(sink.len().await, 0);
    }
}
