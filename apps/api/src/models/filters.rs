use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::explain::normalize::{normalize_list, scalar_text, split_delimited};
use crate::plan::PlanContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkStatus {
    #[serde(alias = "active", alias = "activelyLooking")]
    ActivelyLooking,
    #[serde(alias = "open", alias = "openToOffers")]
    OpenToOffers,
    #[serde(alias = "passive", alias = "notLooking")]
    NotLooking,
}

impl WorkStatus {
    pub fn label(self) -> &'static str {
        match self {
            WorkStatus::ActivelyLooking => "Actively looking",
            WorkStatus::OpenToOffers => "Open to offers",
            WorkStatus::NotLooking => "Not looking",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkType {
    Remote,
    Hybrid,
    #[serde(alias = "on_site", alias = "on-site", alias = "onSite")]
    Onsite,
}

impl WorkType {
    pub fn label(self) -> &'static str {
        match self {
            WorkType::Remote => "Remote",
            WorkType::Hybrid => "Hybrid",
            WorkType::Onsite => "On-site",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relocation {
    #[serde(alias = "yes", alias = "open")]
    Willing,
    #[serde(alias = "no")]
    NotWilling,
}

impl Relocation {
    pub fn label(self) -> &'static str {
        match self {
            Relocation::Willing => "Willing to relocate",
            Relocation::NotWilling => "Not relocating",
        }
    }
}

/// The recruiter's active search/targeting criteria, snapshotted per request.
///
/// Every field is optional on the wire; `null`, arrays and numbers are folded
/// into text, and unknown enum values (including `"any"`) mean "not set".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterSet {
    #[serde(deserialize_with = "lenient_text")]
    pub query: String,
    #[serde(deserialize_with = "lenient_text")]
    pub location: String,
    /// Enterprise-only boolean query.
    #[serde(deserialize_with = "lenient_text")]
    pub advanced_query: String,
    #[serde(deserialize_with = "lenient_text")]
    pub summary_keywords: String,
    #[serde(deserialize_with = "lenient_text")]
    pub job_title: String,
    #[serde(deserialize_with = "lenient_enum")]
    pub work_status: Option<WorkStatus>,
    #[serde(deserialize_with = "lenient_enum")]
    pub work_type: Option<WorkType>,
    #[serde(deserialize_with = "lenient_enum")]
    pub relocation: Option<Relocation>,
    #[serde(deserialize_with = "lenient_text")]
    pub skills: String,
    #[serde(deserialize_with = "lenient_text")]
    pub languages: String,
    #[serde(deserialize_with = "lenient_text")]
    pub education: String,
}

impl FilterSet {
    /// Strips filters the plan is not entitled to. Advanced query is enterprise-only.
    pub fn for_plan(mut self, plan: &PlanContext) -> Self {
        if !plan.is_enterprise {
            self.advanced_query.clear();
        }
        self
    }

    pub fn skill_list(&self) -> Vec<String> {
        split_delimited(&self.skills)
    }

    pub fn language_list(&self) -> Vec<String> {
        split_delimited(&self.languages)
    }

    pub fn education_list(&self) -> Vec<String> {
        split_delimited(&self.education)
    }

    pub fn keyword_list(&self) -> Vec<String> {
        split_delimited(&self.summary_keywords)
    }

    /// One human-readable label per non-empty field, in fixed field order.
    pub fn filters_triggered(&self) -> Vec<String> {
        let text_fields: [(&str, &str); 5] = [
            ("Search", self.query.trim()),
            ("Location", self.location.trim()),
            ("Advanced query", self.advanced_query.trim()),
            ("Summary keywords", self.summary_keywords.trim()),
            ("Target title", self.job_title.trim()),
        ];
        let enum_fields: [(&str, Option<&str>); 3] = [
            ("Work status", self.work_status.map(WorkStatus::label)),
            ("Work type", self.work_type.map(WorkType::label)),
            ("Relocation", self.relocation.map(Relocation::label)),
        ];
        let list_fields: [(&str, Vec<String>); 3] = [
            ("Skills", self.skill_list()),
            ("Languages", self.language_list()),
            ("Education", self.education_list()),
        ];

        let mut triggered = Vec::new();
        for (label, value) in text_fields {
            if !value.is_empty() {
                if label == "Search" {
                    triggered.push(format!("{label}: \"{value}\""));
                } else {
                    triggered.push(format!("{label}: {value}"));
                }
            }
        }
        for (label, value) in enum_fields {
            if let Some(value) = value {
                triggered.push(format!("{label}: {value}"));
            }
        }
        for (label, values) in list_fields {
            if !values.is_empty() {
                triggered.push(format!("{label}: {}", values.join(", ")));
            }
        }
        triggered
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match &value {
        Value::Array(_) => normalize_list(&value).join(", "),
        other => scalar_text(other).unwrap_or_default(),
    })
}

fn lenient_enum<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}
