//! Summary resolution. Keeps a specific upstream summary, regenerates a generic one.

use crate::models::candidate::Candidate;
use crate::models::filters::FilterSet;

/// Substrings that mark a summary as a placeholder. Matched case-insensitively.
const GENERIC_MARKERS: &[&str] = &["candidate", "strong match", "recommended"];

/// At most this many matched skills are named in a generated summary.
const SUMMARY_SKILLS: usize = 4;

pub fn is_generic_summary(summary: &str) -> bool {
    let lower = summary.trim().to_lowercase();
    lower.is_empty() || GENERIC_MARKERS.iter().any(|m| lower.contains(m))
}

/// Returns the summary to display. Never empty.
pub fn resolve_summary(
    base_summary: &str,
    candidate: &Candidate,
    matched_skills: &[String],
    filters: &FilterSet,
) -> String {
    let first_name = candidate.first_name.trim();

    if !is_generic_summary(base_summary) {
        let prefix = format!("{first_name}:");
        if first_name.is_empty() || base_summary.starts_with(&prefix) {
            return base_summary.to_string();
        }
        return format!("{prefix} {base_summary}");
    }

    let subject = if first_name.is_empty() {
        "This candidate"
    } else {
        first_name
    };
    format!(
        "{subject} recommended based on {}.",
        summary_signals(candidate, matched_skills, filters)
    )
}

fn summary_signals(candidate: &Candidate, matched_skills: &[String], filters: &FilterSet) -> String {
    let mut signals = Vec::new();

    let title = candidate.title.trim();
    if !title.is_empty() {
        signals.push(format!("title alignment ({title})"));
    }
    let location = candidate.location.trim();
    if !location.is_empty() {
        signals.push(format!("location fit ({location})"));
    }
    if !matched_skills.is_empty() {
        let shown: Vec<&str> = matched_skills
            .iter()
            .take(SUMMARY_SKILLS)
            .map(String::as_str)
            .collect();
        signals.push(format!("skills overlap ({})", shown.join(", ")));
    }
    let target = filters.job_title.trim();
    if !target.is_empty() {
        signals.push(format!("target role signal ({target})"));
    }

    if signals.is_empty() {
        "available profile signals".to_string()
    } else {
        signals.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jane() -> Candidate {
        Candidate {
            id: "c1".to_string(),
            name: "Jane Doe".to_string(),
            first_name: "Jane".to_string(),
            title: "CSM".to_string(),
            location: "Remote".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_generic_markers_are_case_insensitive() {
        assert!(is_generic_summary(""));
        assert!(is_generic_summary("   "));
        assert!(is_generic_summary("A STRONG MATCH for the team"));
        assert!(is_generic_summary("Recommended"));
        assert!(is_generic_summary("Great candidate"));
        assert!(!is_generic_summary("Scaled onboarding to 40 accounts"));
    }

    #[test]
    fn test_generated_summary_lists_signals_in_order() {
        let filters = FilterSet {
            job_title: "Account Manager".to_string(),
            ..Default::default()
        };
        let skills: Vec<String> = ["A", "B", "C", "D", "E"].iter().map(|s| s.to_string()).collect();
        assert_eq!(
            resolve_summary("", &jane(), &skills, &filters),
            "Jane recommended based on title alignment (CSM), location fit (Remote), \
             skills overlap (A, B, C, D), target role signal (Account Manager)."
        );
    }

    #[test]
    fn test_generated_summary_without_signals() {
        let candidate = Candidate::default();
        assert_eq!(
            resolve_summary("strong match", &candidate, &[], &FilterSet::default()),
            "This candidate recommended based on available profile signals."
        );
    }

    #[test]
    fn test_specific_summary_gets_first_name_prefix_once() {
        let filters = FilterSet::default();
        let once = resolve_summary("Ran renewals for SMB book", &jane(), &[], &filters);
        assert_eq!(once, "Jane: Ran renewals for SMB book");
        assert_eq!(resolve_summary(&once, &jane(), &[], &filters), once);
    }

    #[test]
    fn test_specific_summary_without_name_is_untouched() {
        let candidate = Candidate::default();
        assert_eq!(
            resolve_summary("Ran renewals", &candidate, &[], &FilterSet::default()),
            "Ran renewals"
        );
    }
}
