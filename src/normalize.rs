//! Case normalization and doctor filtering.
//!
//! Pure functions only. Upstream values are never trusted: every case leaves
//! here with a status from the closed `CaseStatus` set and a syntactically
//! valid timestamp, whatever upstream sent.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use regex::Regex;

use crate::models::{ApiCase, Case, CaseStatus, Doctor};

/// Timestamp used when `service_date` is missing or malformed.
pub const SENTINEL_DATE_TIME: &str = "1970-01-01T00:00:00.000Z";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("valid regex"));
static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{2}:[0-9]{2}(:[0-9]{2})?$").expect("valid regex"));

/// Map an upstream `case_status` onto the two-value enum.
///
/// Only the exact literal `"PROCESSED"` counts as processed.
pub fn normalize_status(raw: Option<&str>) -> CaseStatus {
    match raw {
        Some("PROCESSED") => CaseStatus::Processed,
        _ => CaseStatus::New,
    }
}

/// Combine `service_date` ("YYYY-MM-DD") and `start_time` ("HH:MM" or
/// "HH:MM:SS") into `YYYY-MM-DDTHH:MM:SS.000Z`.
///
/// A bad date yields [`SENTINEL_DATE_TIME`]. A good date with a missing or bad
/// time falls back to midnight on that date.
pub fn submitted_date_time(service_date: Option<&str>, start_time: Option<&str>) -> String {
    let Some(date) = service_date.map(str::trim).and_then(parse_date) else {
        return SENTINEL_DATE_TIME.to_string();
    };
    let time = start_time
        .map(str::trim)
        .and_then(parse_time)
        .unwrap_or(NaiveTime::MIN);

    NaiveDateTime::new(date, time)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    if !DATE_RE.is_match(raw) {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    if !TIME_RE.is_match(raw) {
        return None;
    }
    let format = if raw.len() == 5 { "%H:%M" } else { "%H:%M:%S" };
    NaiveTime::parse_from_str(raw, format)
        .ok()
        // chrono accepts ":60" as a leap second; treat it as malformed.
        .filter(|t| t.nanosecond() < 1_000_000_000)
}

const DERIVED_KEYS: [&str; 3] = ["status", "submittedDateTime", "original_case_status"];

/// Derive `status` and `submittedDateTime` for a raw upstream case.
pub fn normalize_case(raw: ApiCase) -> Case {
    let status = normalize_status(raw.case_status.as_deref());
    let submitted_date_time = submitted_date_time(
        raw.record.service_date.as_deref(),
        raw.record.start_time.as_deref(),
    );
    let mut record = raw.record;
    // Derived keys are recomputed; stale copies from upstream must not shadow them.
    for key in DERIVED_KEYS {
        record.extra.remove(key);
    }
    Case {
        record,
        status,
        submitted_date_time,
        original_case_status: raw.case_status.unwrap_or_default(),
    }
}

/// True when a practice name marks a test account ("test" in any case).
pub fn is_test_practice(practice_name: &str) -> bool {
    practice_name.to_lowercase().contains("test")
}

/// Drop test-practice doctors, preserving order.
pub fn filter_test_practices(doctors: Vec<Doctor>) -> Vec<Doctor> {
    doctors
        .into_iter()
        .filter(|doctor| !is_test_practice(&doctor.practice_name))
        .collect()
}
