//! Enrollment capture queue
//!
//! Samples accumulate locally until the quorum is reached and are then sent
//! as one batch. A successful submission clears the queue; a failed one keeps
//! it so the student can retry without recapturing.

use std::sync::{Mutex, MutexGuard};

use tracing::{info, warn};

use common::{ClientError, ClientResult};

use crate::{
    busy::BusyFlag,
    capture::{Frame, FrameSource},
    gateway::Gateway,
    models::{CaptureOutcome, CaptureRequest, CaptureResponse, EnrollmentStatus},
    status::StatusMessage,
};

/// Number of samples required for one enrollment submission
pub const QUORUM: usize = 3;

#[derive(Debug, Default)]
struct QueueState {
    samples: Vec<Frame>,
    status: Option<StatusMessage>,
    enrollment: Option<EnrollmentStatus>,
}

/// Student-side enrollment workflow
pub struct CaptureQueue {
    gateway: Gateway,
    state: Mutex<QueueState>,
    busy: BusyFlag,
}

impl CaptureQueue {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway,
            state: Mutex::new(QueueState::default()),
            busy: BusyFlag::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a sample; ignored once the quorum is reached or while submitting
    ///
    /// Returns the queue length after the call.
    pub fn enqueue(&self, frame: Frame) -> usize {
        let mut state = self.state();

        if self.busy.is_busy() || state.samples.len() >= QUORUM {
            return state.samples.len();
        }

        state.samples.push(frame);
        let len = state.samples.len();
        state.status = Some(StatusMessage::info(format!(
            "Captured sample {}/{}",
            len, QUORUM
        )));
        len
    }

    /// Take one still from `source` and enqueue it
    pub fn capture_from(&self, source: &dyn FrameSource) -> Option<usize> {
        source.capture_frame().map(|frame| self.enqueue(frame))
    }

    pub fn len(&self) -> usize {
        self.state().samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_ready(&self) -> bool {
        self.len() == QUORUM
    }

    /// Progress signal in the form "k/3"
    pub fn progress(&self) -> String {
        format!("{}/{}", self.len(), QUORUM)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    pub fn status(&self) -> Option<StatusMessage> {
        self.state().status.clone()
    }

    /// Last enrollment status fetched from the service
    pub fn enrollment(&self) -> Option<EnrollmentStatus> {
        self.state().enrollment
    }

    /// Submit the full quorum as one batch
    pub async fn submit(&self) -> ClientResult<CaptureOutcome> {
        let images: Vec<String> = {
            let mut state = self.state();
            if state.samples.len() < QUORUM {
                let message = format!("Capture {} samples before saving.", QUORUM);
                state.status = Some(StatusMessage::error(message.clone()));
                return Err(ClientError::Validation(message));
            }
            state
                .samples
                .iter()
                .map(|frame| frame.as_str().to_string())
                .collect()
        };

        let _busy = self.busy.try_acquire().ok_or(ClientError::Busy)?;
        self.state().status = Some(StatusMessage::info("Uploading samples…"));
        info!("Submitting {} enrollment samples", images.len());

        let result: ClientResult<CaptureResponse> = self
            .gateway
            .post_json("/faces/capture", &CaptureRequest { images })
            .await;

        let outcome = match result {
            Ok(response) => response.decode(),
            Err(e) => {
                warn!("Enrollment submission failed: {}", e);
                self.state().status = StatusMessage::from_error(&e);
                return Err(e);
            }
        };

        {
            let mut state = self.state();
            state.samples.clear();
            state.status = Some(match &outcome {
                CaptureOutcome::Pending => {
                    StatusMessage::info("Face update pending admin approval.")
                }
                CaptureOutcome::Stored { samples, message } => {
                    StatusMessage::success(format!("{} ({}/{})", message, samples, QUORUM))
                }
                CaptureOutcome::Rejected { message } => StatusMessage::error(message.clone()),
            });
        }
        info!("Enrollment submission answered {:?}", outcome);

        if let Err(e) = self.refresh_enrollment().await {
            warn!("Failed to refresh enrollment status: {}", e);
        }

        Ok(outcome)
    }

    /// Drop every queued sample
    ///
    /// Returns `false` when there was nothing to clear or a submission is in flight.
    pub fn reset(&self) -> bool {
        let mut state = self.state();

        if self.busy.is_busy() || state.samples.is_empty() {
            return false;
        }

        state.samples.clear();
        state.status = Some(StatusMessage::info("Cleared captured samples."));
        true
    }

    /// Re-read the enrollment status from the service
    pub async fn refresh_enrollment(&self) -> ClientResult<EnrollmentStatus> {
        let status: EnrollmentStatus = self.gateway.get("/faces/me").await?;
        self.state().enrollment = Some(status);
        Ok(status)
    }
}
