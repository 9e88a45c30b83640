use std::cmp::Ordering;

use serde::Deserialize;

use super::case::Case;
use super::enums::CaseStatus;

/// Sortable case columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum CaseSort {
    #[default]
    #[serde(rename = "submittedDateTime")]
    SubmittedDateTime,
    #[serde(rename = "patient_name")]
    PatientName,
    #[serde(rename = "status")]
    Status,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Table-style narrowing of a case list: status filter, patient-name search
/// and an optional sort. The default filter leaves the list untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CaseFilter {
    pub status: Option<CaseStatus>,
    pub search: Option<String>,
    pub sort: Option<CaseSort>,
    pub order: Option<SortOrder>,
}

impl CaseFilter {
    pub fn is_noop(&self) -> bool {
        self.status.is_none()
            && self.search.as_deref().map_or(true, |s| s.trim().is_empty())
            && self.sort.is_none()
    }

    pub fn apply(&self, cases: Vec<Case>) -> Vec<Case> {
        if self.is_noop() {
            return cases;
        }

        let needle = self
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let mut kept: Vec<Case> = cases
            .into_iter()
            .filter(|case| self.status.map_or(true, |status| case.status == status))
            .filter(|case| match &needle {
                Some(needle) => case
                    .record
                    .patient_name
                    .as_deref()
                    .is_some_and(|name| name.to_lowercase().contains(needle)),
                None => true,
            })
            .collect();

        if let Some(sort) = self.sort {
            // Stable sort keeps upstream order among equal keys.
            kept.sort_by(|a, b| {
                let ord = compare(sort, a, b);
                match self.order.unwrap_or_default() {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            });
        }

        kept
    }
}

fn compare(sort: CaseSort, a: &Case, b: &Case) -> Ordering {
    match sort {
        // Normalized timestamps share one fixed-width format, so string order
        // is chronological order.
        CaseSort::SubmittedDateTime => a.submitted_date_time.cmp(&b.submitted_date_time),
        CaseSort::PatientName => {
            let left = a.record.patient_name.as_deref().unwrap_or("").to_lowercase();
            let right = b.record.patient_name.as_deref().unwrap_or("").to_lowercase();
            left.cmp(&right)
        }
        CaseSort::Status => a.status.as_str().cmp(b.status.as_str()),
    }
}
