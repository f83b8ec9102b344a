use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::explain::normalize::{first_text, normalize_list, scalar_text};

/// The record that drives the WHY drawer. Built fresh per request, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub score: f64, // 0 – 100
    pub summary: String,
    pub reasons: Vec<Reason>,
    pub skills: SkillBreakdown,
    pub trajectory: Vec<TrajectoryEntry>,
    pub filters_triggered: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reason {
    pub requirement: String,
    pub evidence: Vec<Evidence>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub text: String,
    pub source: String,
}

impl Evidence {
    pub fn new(text: impl Into<String>, source: &str) -> Self {
        Self {
            text: text.into(),
            source: source.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillBreakdown {
    pub matched: Vec<String>,
    pub gaps: Vec<String>,
    pub transferable: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryEntry {
    pub title: String,
    pub company: String,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl TrajectoryEntry {
    /// Reduces a work-history object to title/company/from/to.
    /// Entries carrying neither a title nor a company are dropped.
    pub fn from_value(value: &Value) -> Option<Self> {
        let title = first_text(value, &["title", "role", "position"]).unwrap_or_default();
        let company =
            first_text(value, &["company", "employer", "organization"]).unwrap_or_default();
        if title.is_empty() && company.is_empty() {
            return None;
        }
        Some(Self {
            title,
            company,
            from: first_text(value, &["from", "start", "startDate", "start_date"]),
            to: first_text(value, &["to", "end", "endDate", "end_date"]),
        })
    }
}

/// Base explanation as returned by the why-service (or the local mock).
///
/// Parsed leniently: anything missing or mistyped simply becomes empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct BaseExplanation {
    pub score: Option<f64>,
    pub summary: String,
    pub reasons: Vec<Reason>,
    pub transferable: Vec<String>,
    pub trajectory: Vec<TrajectoryEntry>,
}

impl From<Value> for BaseExplanation {
    fn from(value: Value) -> Self {
        let reasons = value
            .get("reasons")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(parse_reason).collect())
            .unwrap_or_default();

        let trajectory = value
            .get("trajectory")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(TrajectoryEntry::from_value).collect())
            .unwrap_or_default();

        let transferable = value
            .get("skills")
            .and_then(|s| s.get("transferable"))
            .map(normalize_list)
            .unwrap_or_default();

        BaseExplanation {
            score: value.get("score").and_then(Value::as_f64),
            summary: value
                .get("summary")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            reasons,
            transferable,
            trajectory,
        }
    }
}

fn parse_reason(value: &Value) -> Option<Reason> {
    if !value.is_object() {
        return None;
    }
    let requirement = value
        .get("requirement")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let evidence = value
        .get("evidence")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse_evidence).collect())
        .unwrap_or_default();
    Some(Reason {
        requirement,
        evidence,
    })
}

fn parse_evidence(value: &Value) -> Option<Evidence> {
    match value {
        Value::Object(_) => Some(Evidence {
            text: first_text(value, &["text"]).unwrap_or_default(),
            source: first_text(value, &["source"]).unwrap_or_default(),
        }),
        other => scalar_text(other).map(|text| Evidence {
            text,
            source: String::new(),
        }),
    }
}
