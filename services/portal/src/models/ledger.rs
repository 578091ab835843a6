//! Present-ledger records

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Attendance mark recorded by the service
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    #[serde(other)]
    Other,
}

/// One row of the present-ledger for an offering
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PresentRecord {
    pub student_id: String,
    pub student_name: String,
    pub status: AttendanceStatus,
    #[serde(deserialize_with = "super::timestamp::deserialize")]
    pub detected_at: DateTime<Utc>,
    #[serde(default)]
    pub confidence: Option<f64>,
}
