//! Local reason construction.
//!
//! Runs only when the upstream reasons look like placeholders. The result
//! replaces them wholesale; upstream and local reasons are never merged.

use crate::explain::normalize::contains_ci;
use crate::models::candidate::Candidate;
use crate::models::explanation::{Evidence, Reason, SkillBreakdown};
use crate::models::filters::FilterSet;

/// Cap on the number of reasons an explanation carries.
pub const MAX_REASONS: usize = 10;

const TOP_SKILLS_IN_EVIDENCE: usize = 5;
const EDUCATION_IN_EVIDENCE: usize = 2;

/// True when the base reasons carry no usable content: either there are none,
/// or every one has an empty/"requirement"-like label and no evidence.
pub fn is_generic_reasons(reasons: &[Reason]) -> bool {
    reasons.iter().all(|reason| {
        let requirement = reason.requirement.trim().to_lowercase();
        (requirement.is_empty() || requirement.contains("requirement")) && reason.evidence.is_empty()
    })
}

/// Builds reasons from the filters and candidate profile, in fixed order:
/// role, skills, education, logistics, keywords, languages.
pub fn build_local_reasons(
    candidate: &Candidate,
    filters: &FilterSet,
    skills: &SkillBreakdown,
) -> Vec<Reason> {
    let built = [
        role_alignment(candidate, filters),
        skills_match(candidate, filters, skills),
        education_alignment(candidate, filters),
        logistics_fit(candidate, filters),
        keyword_alignment(candidate, filters),
        language_alignment(candidate, filters),
    ];

    built
        .into_iter()
        .flatten()
        .filter(|reason| !reason.evidence.is_empty())
        .take(MAX_REASONS)
        .collect()
}

fn reason(requirement: &str, evidence: Vec<Evidence>) -> Option<Reason> {
    Some(Reason {
        requirement: requirement.to_string(),
        evidence,
    })
}

fn role_alignment(candidate: &Candidate, filters: &FilterSet) -> Option<Reason> {
    let title = candidate.title.trim();
    let target = filters.job_title.trim();
    if title.is_empty() && target.is_empty() {
        return None;
    }

    let mut evidence = Vec::new();
    if !title.is_empty() {
        evidence.push(Evidence::new(format!("Current title: {title}"), "profile"));
    }
    if !target.is_empty() {
        if contains_ci(title, target) || contains_ci(target, title) {
            evidence.push(Evidence::new(
                format!("Title aligns with target role \"{target}\""),
                "filters",
            ));
        } else {
            evidence.push(Evidence::new(format!("Target role: {target}"), "filters"));
        }
    }
    reason("Role alignment", evidence)
}

fn skills_match(
    candidate: &Candidate,
    filters: &FilterSet,
    skills: &SkillBreakdown,
) -> Option<Reason> {
    let filter_skills = filters.skill_list();
    if filter_skills.is_empty() && candidate.skills.is_empty() {
        return None;
    }

    let mut evidence = Vec::new();
    if filter_skills.is_empty() {
        let top: Vec<&str> = candidate
            .skills
            .iter()
            .take(TOP_SKILLS_IN_EVIDENCE)
            .map(String::as_str)
            .collect();
        evidence.push(Evidence::new(format!("Top skills: {}", top.join(", ")), "profile"));
    } else {
        if !skills.matched.is_empty() {
            evidence.push(Evidence::new(
                format!("Matched skills: {}", skills.matched.join(", ")),
                "skills",
            ));
        }
        if !skills.gaps.is_empty() {
            evidence.push(Evidence::new(
                format!("Not shown on profile: {}", skills.gaps.join(", ")),
                "filters",
            ));
        }
    }
    reason("Skills match", evidence)
}

fn education_alignment(candidate: &Candidate, filters: &FilterSet) -> Option<Reason> {
    let wanted = filters.education_list();
    if wanted.is_empty() && candidate.education.is_empty() {
        return None;
    }

    let matching: Vec<&String> = candidate
        .education
        .iter()
        .filter(|entry| wanted.iter().any(|w| contains_ci(entry, w)))
        .collect();

    let mut evidence: Vec<Evidence> = matching
        .iter()
        .map(|entry| Evidence::new(format!("Education matches filter: {entry}"), "education"))
        .collect();

    if matching.is_empty() {
        if !candidate.education.is_empty() {
            let shown: Vec<&str> = candidate
                .education
                .iter()
                .take(EDUCATION_IN_EVIDENCE)
                .map(String::as_str)
                .collect();
            evidence.push(Evidence::new(format!("Education: {}", shown.join("; ")), "profile"));
        }
        if !wanted.is_empty() {
            evidence.push(Evidence::new(
                format!("Education filter: {}", wanted.join(", ")),
                "filters",
            ));
        }
    }
    reason("Education alignment", evidence)
}

fn logistics_fit(candidate: &Candidate, filters: &FilterSet) -> Option<Reason> {
    let location = candidate.location.trim();
    let wanted = filters.location.trim();
    if location.is_empty() && wanted.is_empty() && filters.work_type.is_none() {
        return None;
    }

    let mut evidence = Vec::new();
    if !location.is_empty() {
        evidence.push(Evidence::new(format!("Based in {location}"), "profile"));
    }
    if !wanted.is_empty() {
        if contains_ci(location, wanted) || contains_ci(wanted, location) {
            evidence.push(Evidence::new(
                format!("Location matches search: {wanted}"),
                "filters",
            ));
        } else {
            evidence.push(Evidence::new(format!("Search location: {wanted}"), "filters"));
        }
    }
    if let Some(work_type) = filters.work_type {
        evidence.push(Evidence::new(
            format!("Preferred work type: {}", work_type.label()),
            "filters",
        ));
    }
    reason("Logistics fit", evidence)
}

fn keyword_alignment(candidate: &Candidate, filters: &FilterSet) -> Option<Reason> {
    let keywords = filters.keyword_list();
    if keywords.is_empty() {
        return None;
    }

    let text = candidate.profile_text();
    let evidence: Vec<Evidence> = keywords
        .iter()
        .filter(|kw| contains_ci(&text, kw))
        .map(|kw| Evidence::new(format!("Summary mentions \"{kw}\""), "summary"))
        .collect();

    if evidence.is_empty() {
        return None;
    }
    reason("Keyword alignment", evidence)
}

fn language_alignment(candidate: &Candidate, filters: &FilterSet) -> Option<Reason> {
    let wanted = filters.language_list();
    if wanted.is_empty() && candidate.languages.is_empty() {
        return None;
    }

    let known: Vec<String> = candidate.languages.iter().map(|l| l.to_lowercase()).collect();
    let spoken: Vec<&String> = wanted
        .iter()
        .filter(|w| known.contains(&w.to_lowercase()))
        .collect();

    let mut evidence = Vec::new();
    if spoken.is_empty() {
        if !candidate.languages.is_empty() {
            evidence.push(Evidence::new(
                format!("Languages: {}", candidate.languages.join(", ")),
                "profile",
            ));
        }
        if !wanted.is_empty() {
            evidence.push(Evidence::new(
                format!("Requested languages: {}", wanted.join(", ")),
                "filters",
            ));
        }
    } else {
        let spoken: Vec<&str> = spoken.iter().map(|s| s.as_str()).collect();
        evidence.push(Evidence::new(
            format!("Speaks requested languages: {}", spoken.join(", ")),
            "languages",
        ));
    }
    reason("Language alignment", evidence)
}
