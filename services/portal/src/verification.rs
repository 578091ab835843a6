//! Live face verification against the active session
//!
//! One still per round trip. A busy flag keeps at most one round trip in
//! flight, so a ledger refresh never races a second submission. Failed round
//! trips are never retried.

use std::sync::Arc;

use tracing::{debug, info, warn};

use common::{ClientError, ClientResult};

use crate::{
    busy::BusyFlag,
    capture::{Frame, FrameSource},
    gateway::Gateway,
    models::{Verification, VerificationResponse, VerifyFaceRequest},
    session::SessionController,
    status::StatusMessage,
};

const NO_SESSION_GUIDANCE: &str = "Start a session before scanning faces.";

/// Capture/verify loop for the teacher desk
pub struct VerificationLoop {
    gateway: Gateway,
    desk: Arc<SessionController>,
    busy: BusyFlag,
}

impl VerificationLoop {
    pub fn new(gateway: Gateway, desk: Arc<SessionController>) -> Self {
        Self {
            gateway,
            desk,
            busy: BusyFlag::new(),
        }
    }

    /// True while a round trip is in flight; the capture control is disabled
    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    /// Take a still from `source` and verify it
    ///
    /// Returns `Ok(None)` when the source produced no frame.
    pub async fn capture_and_verify(
        &self,
        source: &dyn FrameSource,
    ) -> ClientResult<Option<Verification>> {
        if self.desk.active_context().await.is_none() {
            return Err(self.no_session().await);
        }

        if self.is_busy() {
            return Err(ClientError::Busy);
        }

        match source.capture_frame() {
            Some(frame) => self.verify(frame).await.map(Some),
            None => {
                debug!("Frame source returned nothing");
                Ok(None)
            }
        }
    }

    /// Submit one frame to the verifier for the active session
    pub async fn verify(&self, frame: Frame) -> ClientResult<Verification> {
        let Some((ctx, session_id)) = self.desk.active_context().await else {
            return Err(self.no_session().await);
        };

        let _busy = self.busy.try_acquire().ok_or(ClientError::Busy)?;

        self.desk
            .set_session_feedback(
                ctx,
                session_id,
                StatusMessage::info("Uploading frame for verification…"),
            )
            .await;

        let result = self
            .gateway
            .post_json::<_, VerificationResponse>(
                &format!("/attendance/{}/verify-face", session_id),
                &VerifyFaceRequest {
                    image_data: frame.into_inner(),
                },
            )
            .await
            .and_then(VerificationResponse::decode);

        let verdict = match result {
            Ok((verdict, embeddings)) => {
                self.desk
                    .apply_verification(ctx, session_id, &verdict, embeddings)
                    .await;
                verdict
            }
            Err(e) => {
                warn!("Verification for session {} failed: {}", session_id, e);
                self.desk
                    .apply_verification_failure(ctx, session_id, &e)
                    .await;
                return Err(e);
            }
        };

        match &verdict {
            Verification::Matched {
                student_id,
                confidence,
                ..
            } => info!(
                "Session {} matched {} with confidence {:.2}",
                session_id, student_id, confidence
            ),
            Verification::Unmatched { confidence, .. } => info!(
                "Session {} frame not matched (confidence {:?})",
                session_id, confidence
            ),
        }

        // Refresh either way: the service owns the ledger and its dedup policy
        if let Err(e) = self.desk.refresh_ledger_for(ctx).await {
            warn!("Failed to refresh ledger after verification: {}", e);
        }

        Ok(verdict)
    }

    async fn no_session(&self) -> ClientError {
        self.desk
            .set_feedback(StatusMessage::error(NO_SESSION_GUIDANCE))
            .await;
        ClientError::Validation(NO_SESSION_GUIDANCE.to_string())
    }
}
