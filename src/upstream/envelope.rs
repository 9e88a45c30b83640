//! Response envelope adapters.
//!
//! Upstream has wrapped the same payloads in several shapes across revisions.
//! Each `sniff_*` function picks the shape from the fields present, and each
//! shape has exactly one unwrapping arm. Call sites never branch on shapes.

use serde_json::{Map, Value};

use super::UpstreamError;
use crate::models::{ApiCase, Doctor};

/// Longest non-JSON error body relayed verbatim.
const MAX_PLAIN_ERROR_LEN: usize = 100;

// ═══════════════════════════════════════════════════════════
// Login
// ═══════════════════════════════════════════════════════════

/// Token and optional lifetime extracted from a login response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginGrant {
    pub token: String,
    pub expires_in: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginShape {
    /// `{"status": "success", "token": ..., "expires_in"?: ...}`
    StatusToken,
    /// `{"token": ..., "expires_in"?: ...}`
    BareToken,
    /// `{"data": {"token": ..., "expires_in"?: ...}}`
    DataToken,
}

pub fn sniff_login(body: &Value) -> Option<LoginShape> {
    let obj = body.as_object()?;
    if non_empty_str(obj.get("token")).is_some() {
        return Some(if obj.get("status").and_then(Value::as_str) == Some("success") {
            LoginShape::StatusToken
        } else {
            LoginShape::BareToken
        });
    }
    let data = obj.get("data")?.as_object()?;
    non_empty_str(data.get("token")).map(|_| LoginShape::DataToken)
}

pub fn parse_login(body: &Value) -> Result<LoginGrant, UpstreamError> {
    let malformed = || {
        UpstreamError::Malformed(
            "Authentication failed: Malformed response from authentication server.".into(),
        )
    };
    let shape = sniff_login(body).ok_or_else(malformed)?;
    let source = match shape {
        LoginShape::StatusToken | LoginShape::BareToken => body,
        LoginShape::DataToken => body.get("data").ok_or_else(malformed)?,
    };
    let token = non_empty_str(source.get("token")).ok_or_else(malformed)?;
    Ok(LoginGrant {
        token: token.to_string(),
        expires_in: source.get("expires_in").and_then(as_i64_lenient),
    })
}

// ═══════════════════════════════════════════════════════════
// Doctors
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoctorsShape {
    /// `{"status": "success", "doctors": [...]}` (status may be absent)
    StatusDoctors,
    /// `[...]`
    BareArray,
}

pub fn sniff_doctors(body: &Value) -> Option<DoctorsShape> {
    match body {
        Value::Array(_) => Some(DoctorsShape::BareArray),
        Value::Object(obj) => {
            let status_ok = match obj.get("status") {
                None => true,
                Some(status) => status.as_str() == Some("success"),
            };
            (status_ok && obj.get("doctors").is_some_and(Value::is_array))
                .then_some(DoctorsShape::StatusDoctors)
        }
        _ => None,
    }
}

/// Unwrap the doctor list. Test practices are not filtered here.
pub fn parse_doctors(body: Value) -> Result<Vec<Doctor>, UpstreamError> {
    let shape = sniff_doctors(&body).ok_or_else(|| {
        UpstreamError::Malformed("Received malformed doctor data structure from external API.".into())
    })?;
    let items = match (shape, body) {
        (DoctorsShape::BareArray, Value::Array(items)) => items,
        (DoctorsShape::StatusDoctors, Value::Object(mut obj)) => match obj.remove("doctors") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    Ok(items
        .iter()
        .filter_map(|item| {
            let doctor = doctor_from_value(item);
            if doctor.is_none() {
                tracing::warn!("Skipping doctor record without an identifier");
            }
            doctor
        })
        .collect())
}

/// Map one upstream doctor record. Field names differ between revisions.
fn doctor_from_value(value: &Value) -> Option<Doctor> {
    let obj = value.as_object()?;
    let id = first_string(obj, &["id", "user_id", "doctor_acc_no", "acc_no"])?;
    Some(Doctor {
        id,
        name: first_string(obj, &["name", "doctor_name", "full_name"]).unwrap_or_default(),
        practice_name: first_string(obj, &["practiceName", "practice_name"]).unwrap_or_default(),
        specialty: first_string(obj, &["specialty", "speciality"]).unwrap_or_default(),
    })
}

// ═══════════════════════════════════════════════════════════
// Cases
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasesShape {
    /// `[...]`
    BareArray,
    /// `{"case_submissions": [...]}`
    Submissions,
    /// `{"case_submission": [...]}`
    SubmissionArray,
    /// `{"case_submission": {...}}`
    SingleSubmission,
}

pub fn sniff_cases(body: &Value) -> Option<CasesShape> {
    match body {
        Value::Array(_) => Some(CasesShape::BareArray),
        Value::Object(obj) => {
            if obj.get("case_submissions").is_some_and(Value::is_array) {
                return Some(CasesShape::Submissions);
            }
            match obj.get("case_submission") {
                Some(Value::Array(_)) => Some(CasesShape::SubmissionArray),
                Some(Value::Object(_)) => Some(CasesShape::SingleSubmission),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Unwrap a case list. Items that are not case objects are skipped.
pub fn parse_cases(body: Value) -> Result<Vec<ApiCase>, UpstreamError> {
    let shape = sniff_cases(&body).ok_or_else(|| {
        UpstreamError::Malformed("Received malformed case data from external API.".into())
    })?;
    let items = match (shape, body) {
        (CasesShape::BareArray, Value::Array(items)) => items,
        (CasesShape::Submissions, Value::Object(mut obj)) => take_array(&mut obj, "case_submissions"),
        (CasesShape::SubmissionArray, Value::Object(mut obj)) => take_array(&mut obj, "case_submission"),
        (CasesShape::SingleSubmission, Value::Object(mut obj)) => {
            obj.remove("case_submission").into_iter().collect()
        }
        _ => Vec::new(),
    };

    Ok(items
        .into_iter()
        .filter_map(|item| {
            if !item.is_object() {
                tracing::warn!("Skipping non-object case entry");
                return None;
            }
            match serde_json::from_value::<ApiCase>(item) {
                Ok(case) => Some(case),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unparseable case entry");
                    None
                }
            }
        })
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatedCaseShape {
    /// The case object itself (has `id`).
    BareCase,
    /// `{"case_submission": {...}}`
    Submission,
    /// `{"case_submissions": [{...}, ...]}`, first entry wins.
    SubmissionsFirst,
    /// `{"data": {...}}`
    Data,
}

pub fn sniff_updated_case(body: &Value) -> Option<UpdatedCaseShape> {
    let obj = body.as_object()?;
    if obj.get("case_submission").is_some_and(Value::is_object) {
        return Some(UpdatedCaseShape::Submission);
    }
    if obj
        .get("case_submissions")
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .is_some_and(Value::is_object)
    {
        return Some(UpdatedCaseShape::SubmissionsFirst);
    }
    if obj.get("data").is_some_and(Value::is_object) {
        return Some(UpdatedCaseShape::Data);
    }
    obj.contains_key("id").then_some(UpdatedCaseShape::BareCase)
}

/// Unwrap the case echoed back by an update call.
pub fn parse_updated_case(body: Value) -> Result<ApiCase, UpstreamError> {
    let malformed =
        || UpstreamError::Malformed("Received malformed updated case from external API.".into());
    let shape = sniff_updated_case(&body).ok_or_else(malformed)?;
    let inner = match (shape, body) {
        (UpdatedCaseShape::BareCase, body) => body,
        (UpdatedCaseShape::Submission, Value::Object(mut obj)) => {
            obj.remove("case_submission").ok_or_else(malformed)?
        }
        (UpdatedCaseShape::SubmissionsFirst, Value::Object(mut obj)) => take_array(&mut obj, "case_submissions")
            .into_iter()
            .next()
            .ok_or_else(malformed)?,
        (UpdatedCaseShape::Data, Value::Object(mut obj)) => obj.remove("data").ok_or_else(malformed)?,
        _ => return Err(malformed()),
    };
    serde_json::from_value(inner).map_err(|e| UpstreamError::Malformed(format!("Updated case could not be read: {e}")))
}

// ═══════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════

/// Best-effort message from an upstream error body: JSON `message`, then
/// `detail`, then a short plain-text body, then `fallback`.
pub fn error_message(body: &str, fallback: String) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(json) => non_empty_str(json.get("message"))
            .or_else(|| non_empty_str(json.get("detail")))
            .map(str::to_string)
            .unwrap_or(fallback),
        Err(_) => {
            let trimmed = body.trim();
            if !trimmed.is_empty() && trimmed.chars().count() < MAX_PLAIN_ERROR_LEN {
                trimmed.to_string()
            } else {
                fallback
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn first_string(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn take_array(obj: &mut Map<String, Value>, key: &str) -> Vec<Value> {
    match obj.remove(key) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}

fn as_i64_lenient(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn login_status_token_with_expiry() {
        let body = json!({"status": "success", "token": "t1", "expires_in": 7200});
        assert_eq!(sniff_login(&body), Some(LoginShape::StatusToken));
        let grant = parse_login(&body).unwrap();
        assert_eq!(grant.token, "t1");
        assert_eq!(grant.expires_in, Some(7200));
    }

    #[test]
    fn login_bare_token_without_expiry() {
        let body = json!({"token": "t2"});
        assert_eq!(sniff_login(&body), Some(LoginShape::BareToken));
        assert_eq!(parse_login(&body).unwrap().expires_in, None);
    }

    #[test]
    fn login_nested_data_token() {
        let body = json!({"data": {"token": "t3", "expires_in": "60"}});
        let grant = parse_login(&body).unwrap();
        assert_eq!(grant.token, "t3");
        assert_eq!(grant.expires_in, Some(60));
    }

    #[test]
    fn login_missing_token_is_malformed() {
        for body in [json!({"status": "success"}), json!({"token": ""}), json!([1, 2])] {
            assert!(matches!(parse_login(&body), Err(UpstreamError::Malformed(_))));
        }
    }

    #[test]
    fn doctors_status_envelope() {
        let body = json!({
            "status": "success",
            "doctors": [
                {"user_id": 17, "doctor_name": "Dr. Alice", "practice_name": "Sunshine", "speciality": "Peds"},
                {"id": "doc2", "name": "Dr. Bob", "practiceName": "General Care", "specialty": "GP"}
            ]
        });
        assert_eq!(sniff_doctors(&body), Some(DoctorsShape::StatusDoctors));
        let doctors = parse_doctors(body).unwrap();
        assert_eq!(doctors.len(), 2);
        assert_eq!(doctors[0].id, "17");
        assert_eq!(doctors[0].name, "Dr. Alice");
        assert_eq!(doctors[0].practice_name, "Sunshine");
        assert_eq!(doctors[0].specialty, "Peds");
        assert_eq!(doctors[1].id, "doc2");
    }

    #[test]
    fn doctors_bare_array_skips_records_without_id() {
        let body = json!([{"name": "No Id"}, {"id": "d1", "name": "Has Id"}]);
        let doctors = parse_doctors(body).unwrap();
        assert_eq!(doctors.len(), 1);
        assert_eq!(doctors[0].id, "d1");
    }

    #[test]
    fn doctors_failed_status_is_malformed() {
        let body = json!({"status": "error", "doctors": []});
        assert!(matches!(parse_doctors(body), Err(UpstreamError::Malformed(_))));
        assert!(parse_doctors(json!({"items": []})).is_err());
    }

    #[test]
    fn cases_all_shapes() {
        let case = json!({"id": 1, "doctor_acc_no": "A1", "case_status": "NEW"});
        let shapes = [
            (json!([case.clone()]), CasesShape::BareArray),
            (json!({"case_submissions": [case.clone()]}), CasesShape::Submissions),
            (json!({"case_submission": [case.clone()]}), CasesShape::SubmissionArray),
            (json!({"case_submission": case.clone()}), CasesShape::SingleSubmission),
        ];
        for (body, expected) in shapes {
            assert_eq!(sniff_cases(&body), Some(expected));
            let cases = parse_cases(body).unwrap();
            assert_eq!(cases.len(), 1, "shape {expected:?}");
            assert_eq!(cases[0].record.doctor_acc_no.as_deref(), Some("A1"));
        }
    }

    #[test]
    fn cases_unknown_shape_is_malformed() {
        assert!(matches!(
            parse_cases(json!({"status": "success"})),
            Err(UpstreamError::Malformed(_))
        ));
        assert!(parse_cases(json!("nope")).is_err());
    }

    #[test]
    fn cases_skip_non_objects() {
        let cases = parse_cases(json!([1, "x", {"id": 5}])).unwrap();
        assert_eq!(cases.len(), 1);
    }

    #[test]
    fn updated_case_shapes() {
        let case = json!({"id": 9, "case_status": "PROCESSED"});
        for body in [
            case.clone(),
            json!({"case_submission": case.clone()}),
            json!({"case_submissions": [case.clone()]}),
            json!({"status": "success", "data": case.clone()}),
        ] {
            let parsed = parse_updated_case(body).unwrap();
            assert_eq!(parsed.case_status.as_deref(), Some("PROCESSED"));
        }
    }

    #[test]
    fn updated_case_unrecognized_is_malformed() {
        assert!(parse_updated_case(json!({"status": "success"})).is_err());
        assert!(parse_updated_case(json!([])).is_err());
    }

    #[test]
    fn error_message_prefers_message_then_detail() {
        let fallback = || "fallback".to_string();
        assert_eq!(error_message(r#"{"message":"bad token"}"#, fallback()), "bad token");
        assert_eq!(error_message(r#"{"detail":"not found"}"#, fallback()), "not found");
        assert_eq!(error_message(r#"{"other":1}"#, fallback()), "fallback");
    }

    #[test]
    fn error_message_uses_short_plain_text() {
        assert_eq!(error_message("Bad Gateway", "fallback".into()), "Bad Gateway");
        let long = "x".repeat(150);
        assert_eq!(error_message(&long, "fallback".into()), "fallback");
        assert_eq!(error_message("", "fallback".into()), "fallback");
    }
}
