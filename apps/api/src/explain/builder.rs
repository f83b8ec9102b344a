//! Explanation builder. Pure enrichment of a base explanation.
//!
//! Deterministic and infallible: the same inputs always produce the same
//! `Explanation`, and malformed input degrades to empty fields instead of errors.
//!
//! Precedence:
//! - score: candidate `match` → base score → 0
//! - filters_triggered: always rebuilt from the filter set
//! - skills: filter ∩ candidate (filter order), otherwise top candidate skills
//! - trajectory: base if non-empty, otherwise candidate work history
//! - summary / reasons: base unless generic, then locally derived

use crate::explain::reasons::{build_local_reasons, is_generic_reasons};
use crate::explain::summary::resolve_summary;
use crate::models::candidate::Candidate;
use crate::models::explanation::{BaseExplanation, Explanation, SkillBreakdown};
use crate::models::filters::FilterSet;

/// Candidate skills shown as "matched" when no skills filter is active.
const TOP_CANDIDATE_SKILLS: usize = 8;
/// Work-history entries carried into a derived trajectory.
const MAX_TRAJECTORY: usize = 6;

pub fn build_explanation(
    candidate: &Candidate,
    base: &BaseExplanation,
    filters: &FilterSet,
) -> Explanation {
    let score = candidate.match_score.or(base.score).unwrap_or(0.0);

    let skills = build_skills(candidate, base, filters);

    let trajectory = if base.trajectory.is_empty() {
        candidate
            .work_history
            .iter()
            .take(MAX_TRAJECTORY)
            .cloned()
            .collect()
    } else {
        base.trajectory.clone()
    };

    let summary = resolve_summary(&base.summary, candidate, &skills.matched, filters);

    let reasons = if is_generic_reasons(&base.reasons) {
        build_local_reasons(candidate, filters, &skills)
    } else {
        base.reasons.clone()
    };

    Explanation {
        score,
        summary,
        reasons,
        skills,
        trajectory,
        filters_triggered: filters.filters_triggered(),
    }
}

fn build_skills(candidate: &Candidate, base: &BaseExplanation, filters: &FilterSet) -> SkillBreakdown {
    let wanted = filters.skill_list();

    let (matched, gaps) = if wanted.is_empty() {
        (
            candidate
                .skills
                .iter()
                .take(TOP_CANDIDATE_SKILLS)
                .cloned()
                .collect(),
            Vec::new(),
        )
    } else {
        let have: Vec<String> = candidate.skills.iter().map(|s| s.to_lowercase()).collect();
        wanted
            .into_iter()
            .partition(|skill| have.contains(&skill.to_lowercase()))
    };

    SkillBreakdown {
        matched,
        gaps,
        transferable: base.transferable.clone(),
    }
}
