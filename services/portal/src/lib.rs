//! Attendance portal client
//!
//! Talks to the attendance service on behalf of a signed-in teacher, student
//! or administrator: session lifecycle and live face verification for
//! teachers, face enrollment for students, and face update approvals for
//! administrators. Every request goes through [`gateway::Gateway`], which
//! signs the user out on the first 401.

pub mod approvals;
pub mod auth;
pub mod busy;
pub mod capture;
pub mod enrollment;
pub mod gateway;
pub mod guard;
pub mod models;
pub mod session;
pub mod status;
pub mod validation;
pub mod verification;

#[cfg(test)]
mod testing;

pub use approvals::{ApprovalAction, FaceApprovals};
pub use auth::{AuthService, LoginForm};
pub use capture::{FileFrameSource, Frame, FrameSource, ScriptedFrameSource};
pub use enrollment::{CaptureQueue, QUORUM};
pub use gateway::{Gateway, HttpTransport, LogoutHook, Transport};
pub use guard::{Access, Workspace, authorize};
pub use session::{DeskView, SessionController, SessionState};
pub use status::{StatusMessage, StatusVariant};
pub use verification::VerificationLoop;
