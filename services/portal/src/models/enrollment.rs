//! Biometric enrollment payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Batch of enrollment samples
#[derive(Debug, Clone, Serialize)]
pub struct CaptureRequest {
    pub images: Vec<String>,
}

/// Status of a face update as reported by the service
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum FaceUpdateStatus {
    Pending,
    #[serde(alias = "STORED")]
    Approved,
    Rejected,
}

/// Raw enrollment submission response
#[derive(Debug, Clone, Deserialize)]
pub struct CaptureResponse {
    pub status: FaceUpdateStatus,
    #[serde(default)]
    pub samples: u32,
    #[serde(default)]
    pub message: Option<String>,
}

/// Decoded result of an enrollment submission
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    /// Waiting for an administrator to approve the new samples
    Pending,
    /// Samples accepted immediately
    Stored { samples: u32, message: String },
    /// Samples refused by the service
    Rejected { message: String },
}

impl CaptureResponse {
    pub fn decode(self) -> CaptureOutcome {
        match self.status {
            FaceUpdateStatus::Pending => CaptureOutcome::Pending,
            FaceUpdateStatus::Approved => CaptureOutcome::Stored {
                samples: self.samples,
                message: self
                    .message
                    .unwrap_or_else(|| "Face samples stored.".to_string()),
            },
            FaceUpdateStatus::Rejected => CaptureOutcome::Rejected {
                message: self
                    .message
                    .unwrap_or_else(|| "Face update was rejected.".to_string()),
            },
        }
    }
}

/// Enrollment state of the signed-in student
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
pub struct EnrollmentStatus {
    pub enrolled: bool,
    #[serde(default)]
    pub samples: u32,
}

/// Face update awaiting an administrator decision
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FaceRequest {
    pub id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub user_email: String,
    #[serde(default)]
    pub image_data: Option<String>,
    #[serde(deserialize_with = "super::timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
}
