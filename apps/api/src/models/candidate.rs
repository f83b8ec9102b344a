use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::explain::normalize::{first_text, normalize_list, scalar_text};
use crate::models::explanation::TrajectoryEntry;

/// Canonical candidate record.
///
/// Candidates arrive from the search API in several shapes (skills as an array
/// or a delimited string, education as strings or objects, missing fields).
/// `From<Value>` is the single normalization boundary; nothing downstream
/// re-checks types.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", rename_all = "camelCase")]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub first_name: String,
    pub title: String,
    pub headline: String,
    pub location: String,
    pub summary: String,
    pub skills: Vec<String>,
    pub languages: Vec<String>,
    pub education: Vec<String>,
    pub work_history: Vec<TrajectoryEntry>,
    pub tags: Vec<String>,
    pub notes: Vec<String>,
    #[serde(rename = "match")]
    pub match_score: Option<f64>,
}

impl Candidate {
    /// Summary and headline text, used for keyword checks.
    pub fn profile_text(&self) -> String {
        format!("{} {}", self.summary, self.headline)
    }
}

impl From<Value> for Candidate {
    fn from(value: Value) -> Self {
        let name = first_text(&value, &["name", "fullName", "full_name"]).unwrap_or_else(|| {
            [
                first_text(&value, &["firstName", "first_name"]),
                first_text(&value, &["lastName", "last_name"]),
            ]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
        });

        let first_name = first_text(&value, &["firstName", "first_name"]).unwrap_or_else(|| {
            name.split_whitespace()
                .next()
                .unwrap_or_default()
                .to_string()
        });

        let work_history = ["workHistory", "work_history", "experience"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_array))
            .map(|items| items.iter().filter_map(TrajectoryEntry::from_value).collect())
            .unwrap_or_default();

        let education = value
            .get("education")
            .map(normalize_education)
            .unwrap_or_default();

        Candidate {
            id: first_text(&value, &["id", "_id", "candidateId"]).unwrap_or_default(),
            first_name,
            name,
            title: first_text(&value, &["title", "role", "currentTitle"]).unwrap_or_default(),
            headline: first_text(&value, &["headline"]).unwrap_or_default(),
            location: value.get("location").map(location_text).unwrap_or_default(),
            summary: first_text(&value, &["summary", "about", "bio"]).unwrap_or_default(),
            skills: list_field(&value, "skills"),
            languages: list_field(&value, "languages"),
            education,
            work_history,
            tags: list_field(&value, "tags"),
            notes: list_field(&value, "notes"),
            match_score: value.get("match").and_then(Value::as_f64),
        }
    }
}

fn list_field(value: &Value, key: &str) -> Vec<String> {
    value.get(key).map(normalize_list).unwrap_or_default()
}

fn location_text(value: &Value) -> String {
    match value {
        Value::Object(_) => ["city", "state", "country"]
            .iter()
            .filter_map(|key| first_text(value, &[*key]))
            .collect::<Vec<_>>()
            .join(", "),
        other => scalar_text(other).unwrap_or_default(),
    }
}

/// Education entries may be plain strings or `{degree, field, school}` objects.
fn normalize_education(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => {
            let mut out: Vec<String> = Vec::new();
            for item in items {
                let text = if item.is_object() {
                    [
                        first_text(item, &["degree"]),
                        first_text(item, &["field", "fieldOfStudy", "major"]),
                        first_text(item, &["school", "institution", "university"]),
                    ]
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>()
                    .join(", ")
                } else {
                    scalar_text(item).unwrap_or_default()
                };
                if !text.is_empty() && !out.contains(&text) {
                    out.push(text);
                }
            }
            out
        }
        other => normalize_list(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_candidate_normalizes_mixed_shapes() {
        let c: Candidate = serde_json::from_value(json!({
            "_id": 42,
            "firstName": "Jane",
            "lastName": "Doe",
            "role": "Customer Success Manager",
            "location": {"city": "Austin", "state": "TX"},
            "skills": "Salesforce | SQL, Salesforce",
            "languages": [{"name": "English"}, "Spanish"],
            "education": [{"degree": "BA", "field": "Economics", "school": "UT"}, "MBA"],
            "experience": [
                {"position": "CSM", "employer": "Acme", "startDate": "2020"},
                {"from": "2018"}
            ],
            "match": 77.5
        }))
        .unwrap();

        assert_eq!(c.id, "42");
        assert_eq!(c.name, "Jane Doe");
        assert_eq!(c.first_name, "Jane");
        assert_eq!(c.title, "Customer Success Manager");
        assert_eq!(c.location, "Austin, TX");
        assert_eq!(c.skills, vec!["Salesforce", "SQL"]);
        assert_eq!(c.languages, vec!["English", "Spanish"]);
        assert_eq!(c.education, vec!["BA, Economics, UT", "MBA"]);
        assert_eq!(c.work_history.len(), 1);
        assert_eq!(c.work_history[0].company, "Acme");
        assert_eq!(c.match_score, Some(77.5));
    }

    #[test]
    fn test_first_name_falls_back_to_name_token() {
        let c: Candidate = serde_json::from_value(json!({"id": "c1", "name": "Jane Doe"})).unwrap();
        assert_eq!(c.first_name, "Jane");
    }

    #[test]
    fn test_non_numeric_match_is_ignored() {
        let c: Candidate = serde_json::from_value(json!({"match": "90"})).unwrap();
        assert_eq!(c.match_score, None);
    }

    #[test]
    fn test_non_object_input_yields_empty_candidate() {
        let c: Candidate = serde_json::from_value(json!("not a candidate")).unwrap();
        assert_eq!(c, Candidate::default());
    }

    #[test]
    fn test_serialized_form_parses_back_to_same_record() {
        let c: Candidate = serde_json::from_value(json!({
            "id": "c9",
            "name": "Ana Ruiz",
            "skills": ["Go"],
            "workHistory": [{"title": "SRE", "company": "Initech"}],
            "match": 50
        }))
        .unwrap();
        let again: Candidate = serde_json::from_value(serde_json::to_value(&c).unwrap()).unwrap();
        assert_eq!(c, again);
    }
}
