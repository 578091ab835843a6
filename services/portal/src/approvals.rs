//! Administrator review of pending face updates

use std::fmt;
use std::sync::{Mutex, MutexGuard};

use tracing::{info, warn};

use common::{ClientError, ClientResult};

use crate::{busy::BusyFlag, gateway::Gateway, models::FaceRequest, status::StatusMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalAction {
    Approve,
    Reject,
}

impl ApprovalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalAction::Approve => "approve",
            ApprovalAction::Reject => "reject",
        }
    }
}

impl fmt::Display for ApprovalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default)]
struct ApprovalState {
    pending: Vec<FaceRequest>,
    status: Option<StatusMessage>,
}

/// Pending face update requests and the decisions taken on them
pub struct FaceApprovals {
    gateway: Gateway,
    state: Mutex<ApprovalState>,
    busy: BusyFlag,
}

impl FaceApprovals {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway,
            state: Mutex::new(ApprovalState::default()),
            busy: BusyFlag::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, ApprovalState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn pending(&self) -> Vec<FaceRequest> {
        self.state().pending.clone()
    }

    pub fn status(&self) -> Option<StatusMessage> {
        self.state().status.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    /// Fetch the pending requests; a failed read keeps the last known list
    pub async fn list_pending(&self) -> ClientResult<Vec<FaceRequest>> {
        match self.gateway.get::<Vec<FaceRequest>>("/admin/face-requests").await {
            Ok(pending) => {
                info!("{} face update request(s) pending", pending.len());
                self.state().pending = pending.clone();
                Ok(pending)
            }
            Err(e) => {
                warn!("Failed to fetch face requests: {}", e);
                Err(e)
            }
        }
    }

    /// Approve or reject one request, then re-read the pending list
    pub async fn decide(&self, request_id: i64, action: ApprovalAction) -> ClientResult<()> {
        let _busy = self.busy.try_acquire().ok_or(ClientError::Busy)?;

        let result = self
            .gateway
            .post_ack(&format!("/admin/face-requests/{}/{}", request_id, action))
            .await;

        match result {
            Ok(()) => {
                info!("Face request {} {}d", request_id, action);
                self.state().status = Some(StatusMessage::success(format!(
                    "Request {}d successfully",
                    action
                )));
            }
            Err(ClientError::Unauthorized) => return Err(ClientError::Unauthorized),
            Err(e) => {
                warn!("Failed to {} face request {}: {}", action, request_id, e);
                self.state().status = Some(StatusMessage::error(format!(
                    "Failed to {} request",
                    action
                )));
                return Err(e);
            }
        }

        if let Err(e) = self.list_pending().await {
            warn!("Failed to re-fetch face requests after decision: {}", e);
        }

        Ok(())
    }
}
