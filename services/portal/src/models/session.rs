//! Attendance session and offering payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type OfferingId = i64;
pub type SessionId = i64;

/// Course offering assigned to the signed-in teacher
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Offering {
    pub id: OfferingId,
    pub course_code: String,
    pub course_name: String,
    #[serde(default)]
    pub teacher_name: Option<String>,
    pub term: String,
    #[serde(default)]
    pub room: Option<String>,
    pub active: bool,
}

/// Request for starting a session
#[derive(Debug, Clone, Serialize)]
pub struct StartSessionRequest {
    pub course_offering_id: OfferingId,
}

/// Attendance session as reported by the service
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AttendanceSession {
    pub id: SessionId,
    pub course_offering_id: OfferingId,
    #[serde(default, deserialize_with = "super::timestamp::deserialize_option")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "super::timestamp::deserialize_option")]
    pub end_time: Option<DateTime<Utc>>,
    pub active: bool,
}
