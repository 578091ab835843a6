//! Wire models for the attendance service
//!
//! Raw response shapes are decoded once here; string-typed statuses become
//! closed enums before any orchestration code looks at them.

pub mod auth;
pub mod enrollment;
pub mod ledger;
pub mod session;
pub mod timestamp;
pub mod verification;

// Re-export for convenience
pub use auth::{ChangePasswordRequest, LoginResponse, MessageResponse};
pub use enrollment::{
    CaptureOutcome, CaptureRequest, CaptureResponse, EnrollmentStatus, FaceRequest,
    FaceUpdateStatus,
};
pub use ledger::{AttendanceStatus, PresentRecord};
pub use session::{AttendanceSession, Offering, OfferingId, SessionId, StartSessionRequest};
pub use verification::{DebugEmbeddings, Verification, VerificationResponse, VerifyFaceRequest};
