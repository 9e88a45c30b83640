use serde::{Deserialize, Serialize};

/// A doctor as served to the dashboard.
///
/// `id` is the upstream account number (`doctor_acc_no` / `user_id`), used to
/// fetch that doctor's cases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub practice_name: String,
    pub specialty: String,
}
