//! Drawer / panel presentation.
//!
//! Produces view-models for the WHY drawer. Single and compare drawers share
//! `render_panel`; clients only draw what they receive here.
//!
//! Truncation by mode:
//! - lite: ≤2 reasons × 1 evidence line, ≤3 matched skills, no gaps/transferable,
//!   no career path section
//! - full: every reason (builder already caps at 10), ≤4 evidence lines each,
//!   full skills, career path

use serde::{Deserialize, Serialize};

use crate::models::explanation::{Explanation, Reason, SkillBreakdown, TrajectoryEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplanationMode {
    Off,
    Lite,
    Full,
}

struct ModeLimits {
    reasons: usize,
    evidence: usize,
    matched_skills: usize,
}

impl ExplanationMode {
    fn limits(self) -> ModeLimits {
        match self {
            ExplanationMode::Full => ModeLimits {
                reasons: usize::MAX,
                evidence: 4,
                matched_skills: usize::MAX,
            },
            ExplanationMode::Lite | ExplanationMode::Off => ModeLimits {
                reasons: 2,
                evidence: 1,
                matched_skills: 3,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Summary,
    Requirements,
    Skills,
    CareerPath,
    FiltersTriggered,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Summary,
        Section::Requirements,
        Section::Skills,
        Section::CareerPath,
        Section::FiltersTriggered,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Section::Summary => "Summary",
            Section::Requirements => "Requirements",
            Section::Skills => "Skills",
            Section::CareerPath => "Career path",
            Section::FiltersTriggered => "Filters triggered",
        }
    }

    fn index(self) -> usize {
        match self {
            Section::Summary => 0,
            Section::Requirements => 1,
            Section::Skills => 2,
            Section::CareerPath => 3,
            Section::FiltersTriggered => 4,
        }
    }
}

/// Open/closed flags for the five sections of one panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionToggles([bool; 5]);

impl Default for SectionToggles {
    fn default() -> Self {
        Self([true, false, false, false, false])
    }
}

impl SectionToggles {
    pub fn is_open(&self, section: Section) -> bool {
        self.0[section.index()]
    }

    pub fn toggle(&mut self, section: Section) {
        let idx = section.index();
        self.0[idx] = !self.0[idx];
    }
}

/// Per-panel UI state. Toggles reset whenever a different explanation or mode
/// is presented; they never carry over between candidates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelState {
    presented: Option<(String, ExplanationMode)>,
    toggles: SectionToggles,
}

impl PanelState {
    /// Records what the panel now shows, resetting toggles on any change.
    pub fn present(&mut self, key: &str, mode: ExplanationMode) {
        let next = (key.to_string(), mode);
        if self.presented.as_ref() != Some(&next) {
            self.presented = Some(next);
            self.toggles = SectionToggles::default();
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn toggle(&mut self, section: Section) {
        self.toggles.toggle(section);
    }

    pub fn toggles(&self) -> &SectionToggles {
        &self.toggles
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelView {
    pub candidate_id: String,
    pub mode: ExplanationMode,
    pub score: f64,
    pub sections: Vec<SectionView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionView {
    pub section: Section,
    pub title: &'static str,
    pub open: bool,
    /// Present only while the section is open.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<SectionBody>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SectionBody {
    Summary { text: String },
    Requirements { reasons: Vec<Reason> },
    Skills { skills: SkillBreakdown },
    CareerPath { entries: Vec<TrajectoryEntry> },
    FiltersTriggered { filters: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum DrawerView {
    Single { panel: PanelView },
    Compare { panels: [PanelView; 2] },
}

pub fn render_panel(
    candidate_id: &str,
    explanation: &Explanation,
    mode: ExplanationMode,
    toggles: &SectionToggles,
) -> PanelView {
    let sections = Section::ALL
        .into_iter()
        .filter(|s| !(*s == Section::CareerPath && mode != ExplanationMode::Full))
        .map(|section| {
            let open = toggles.is_open(section);
            SectionView {
                section,
                title: section.title(),
                open,
                body: open.then(|| section_body(section, explanation, mode)),
            }
        })
        .collect();

    PanelView {
        candidate_id: candidate_id.to_string(),
        mode,
        score: explanation.score,
        sections,
    }
}

fn section_body(section: Section, explanation: &Explanation, mode: ExplanationMode) -> SectionBody {
    let limits = mode.limits();
    match section {
        Section::Summary => SectionBody::Summary {
            text: explanation.summary.clone(),
        },
        Section::Requirements => SectionBody::Requirements {
            reasons: explanation
                .reasons
                .iter()
                .take(limits.reasons)
                .map(|r| Reason {
                    requirement: r.requirement.clone(),
                    evidence: r.evidence.iter().take(limits.evidence).cloned().collect(),
                })
                .collect(),
        },
        Section::Skills => {
            let skills = &explanation.skills;
            SectionBody::Skills {
                skills: if mode == ExplanationMode::Full {
                    skills.clone()
                } else {
                    SkillBreakdown {
                        matched: skills
                            .matched
                            .iter()
                            .take(limits.matched_skills)
                            .cloned()
                            .collect(),
                        ..Default::default()
                    }
                },
            }
        }
        Section::CareerPath => SectionBody::CareerPath {
            entries: explanation.trajectory.clone(),
        },
        Section::FiltersTriggered => SectionBody::FiltersTriggered {
            filters: explanation.filters_triggered.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::explanation::Evidence;

    fn explanation() -> Explanation {
        let reasons = (0..5)
            .map(|i| Reason {
                requirement: format!("R{i}"),
                evidence: (0..6).map(|j| Evidence::new(format!("e{j}"), "resume")).collect(),
            })
            .collect();
        Explanation {
            score: 72.0,
            summary: "Jane: ran renewals".to_string(),
            reasons,
            skills: SkillBreakdown {
                matched: vec!["A".into(), "B".into(), "C".into(), "D".into()],
                gaps: vec!["G".into()],
                transferable: vec!["T".into()],
            },
            trajectory: vec![TrajectoryEntry {
                title: "CSM".into(),
                company: "Acme".into(),
                from: None,
                to: None,
            }],
            filters_triggered: vec!["Skills: A".into()],
        }
    }

    fn all_open() -> SectionToggles {
        let mut toggles = SectionToggles::default();
        for s in &Section::ALL[1..] {
            toggles.toggle(*s);
        }
        toggles
    }

    fn body(view: &PanelView, section: Section) -> Option<&SectionBody> {
        view.sections
            .iter()
            .find(|s| s.section == section)
            .and_then(|s| s.body.as_ref())
    }

    #[test]
    fn test_default_toggles_open_summary_only() {
        let view = render_panel("c1", &explanation(), ExplanationMode::Full, &SectionToggles::default());
        let open: Vec<Section> = view.sections.iter().filter(|s| s.open).map(|s| s.section).collect();
        assert_eq!(open, vec![Section::Summary]);
        assert!(view.sections.iter().filter(|s| !s.open).all(|s| s.body.is_none()));
    }

    #[test]
    fn test_lite_truncates_and_hides_career_path() {
        let view = render_panel("c1", &explanation(), ExplanationMode::Lite, &all_open());
        assert!(view.sections.iter().all(|s| s.section != Section::CareerPath));

        match body(&view, Section::Requirements) {
            Some(SectionBody::Requirements { reasons }) => {
                assert_eq!(reasons.len(), 2);
                assert!(reasons.iter().all(|r| r.evidence.len() == 1));
            }
            other => panic!("unexpected body: {other:?}"),
        }
        match body(&view, Section::Skills) {
            Some(SectionBody::Skills { skills }) => {
                assert_eq!(skills.matched, vec!["A", "B", "C"]);
                assert!(skills.gaps.is_empty());
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn test_full_shows_everything_with_evidence_cap() {
        let view = render_panel("c1", &explanation(), ExplanationMode::Full, &all_open());
        assert_eq!(view.sections.len(), 5);
        match body(&view, Section::Requirements) {
            Some(SectionBody::Requirements { reasons }) => {
                assert_eq!(reasons.len(), 5);
                assert!(reasons.iter().all(|r| r.evidence.len() == 4));
            }
            other => panic!("unexpected body: {other:?}"),
        }
        assert!(matches!(
            body(&view, Section::CareerPath),
            Some(SectionBody::CareerPath { entries }) if entries.len() == 1
        ));
    }

    #[test]
    fn test_panel_state_resets_on_new_explanation_or_mode() {
        let mut panel = PanelState::default();
        panel.present("c1", ExplanationMode::Full);
        panel.toggle(Section::Skills);
        assert!(panel.toggles().is_open(Section::Skills));

        panel.present("c1", ExplanationMode::Full);
        assert!(panel.toggles().is_open(Section::Skills));

        panel.present("c2", ExplanationMode::Full);
        assert_eq!(*panel.toggles(), SectionToggles::default());

        panel.toggle(Section::Summary);
        panel.present("c2", ExplanationMode::Lite);
        assert!(panel.toggles().is_open(Section::Summary));
    }
}
