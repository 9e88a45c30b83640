use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::enums::CaseStatus;

/// Upstream case identifier. Numeric in current revisions, text in older ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CaseId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for CaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// The case fields shared by the raw and normalized representations.
///
/// Every field is optional because upstream omits them freely. Fields this
/// struct does not know about are kept in `extra` so they survive a
/// fetch-edit-update cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    #[serde(default)]
    pub id: Option<CaseId>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub doctor_acc_no: Option<String>,
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub treating_surgeon: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub weight: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub height: Option<f64>,
    /// "YYYY-MM-DD"
    #[serde(default)]
    pub service_date: Option<String>,
    /// "HH:MM" or "HH:MM:SS"
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub icd10_codes: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub procedure_codes: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub consultations: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub ortho_modifiers: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub procedures: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub modifiers: Option<Vec<String>>,
    #[serde(default)]
    pub bp_start_time: Option<String>,
    #[serde(default)]
    pub bp_end_time: Option<String>,
    #[serde(default)]
    pub hospital_sticker_image_url: Option<String>,
    #[serde(default)]
    pub admission_form_image_url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub birth_weight: Option<f64>,
    #[serde(default)]
    pub primary_assistant: Option<String>,
    #[serde(default)]
    pub secondary_assistant: Option<String>,
    #[serde(default)]
    pub referring_service_provider: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub referred_by_icd10: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub asa_level: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A case exactly as upstream sent it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiCase {
    #[serde(flatten)]
    pub record: CaseRecord,
    /// `""`, `"NEW"`, `"PROCESSED"` or anything else upstream feels like.
    #[serde(default, deserialize_with = "lenient::string")]
    pub case_status: Option<String>,
}

/// A case after normalization, as served to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    #[serde(flatten)]
    pub record: CaseRecord,
    /// Always `NEW` or `PROCESSED`.
    pub status: CaseStatus,
    /// `service_date` + `start_time` as an ISO-8601 instant.
    #[serde(rename = "submittedDateTime")]
    pub submitted_date_time: String,
    /// The upstream `case_status` before normalization (empty when absent).
    pub original_case_status: String,
}

/// Deserializers that accept the shapes upstream has been seen to send.
mod lenient {
    use super::*;

    /// Number, numeric string, or null. Anything else becomes `None`.
    pub fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
    }

    /// String or number rendered as a string.
    pub fn string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
    }

    /// Array of strings/numbers, or a single comma-separated string.
    pub fn string_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Array(items) => Some(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(s) => Some(s),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                    .collect(),
            ),
            Value::String(s) if s.trim().is_empty() => Some(Vec::new()),
            Value::String(s) => Some(s.split(',').map(|part| part.trim().to_string()).collect()),
            _ => None,
        })
    }
}
