//! Attendance session lifecycle for the teacher desk
//!
//! The desk shows exactly one selected offering. Every selection change runs
//! the same reconciliation: ask the service for the offering's active session
//! and re-read its ledger. Each operation captures the selection epoch before
//! its round trip, and a response arriving after the epoch moved on is dropped.
//! The epoch moves on a selection change and on every confirmed start or end.

use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use common::{ClientError, ClientResult};

use crate::{
    gateway::Gateway,
    models::{
        AttendanceSession, DebugEmbeddings, Offering, OfferingId, PresentRecord, SessionId,
        StartSessionRequest, Verification,
    },
    status::StatusMessage,
};

/// Session state of the selected offering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    NoSession,
    Active(SessionId),
}

impl SessionState {
    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            SessionState::Active(id) => Some(*id),
            SessionState::NoSession => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active(_))
    }
}

/// Snapshot of everything the teacher desk displays
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeskView {
    pub offerings: Vec<Offering>,
    pub selection: Option<OfferingId>,
    pub session: SessionState,
    pub ledger: Vec<PresentRecord>,
    /// Result of the last start/end/resume action
    pub notice: Option<StatusMessage>,
    /// Live verification feedback
    pub feedback: Option<StatusMessage>,
    pub embeddings: DebugEmbeddings,
}

#[derive(Debug, Default)]
struct DeskState {
    epoch: u64,
    view: DeskView,
}

/// Identifies the selection an in-flight operation was issued for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Context {
    epoch: u64,
    offering: OfferingId,
}

impl DeskState {
    fn context(&self) -> Option<Context> {
        self.view.selection.map(|offering| Context {
            epoch: self.epoch,
            offering,
        })
    }

    fn is_current(&self, ctx: Context) -> bool {
        self.epoch == ctx.epoch && self.view.selection == Some(ctx.offering)
    }

    fn is_current_session(&self, ctx: Context, session_id: SessionId) -> bool {
        self.is_current(ctx) && self.view.session == SessionState::Active(session_id)
    }

    /// Move to a server-confirmed session state
    ///
    /// Bumps the epoch so replies issued under the previous state are dropped.
    fn transition(&mut self, ctx: Context, session: SessionState) -> Context {
        self.epoch += 1;
        self.view.session = session;
        Context {
            epoch: self.epoch,
            offering: ctx.offering,
        }
    }

    fn clear_live_feedback(&mut self) {
        self.view.feedback = None;
        self.view.embeddings = DebugEmbeddings::default();
    }
}

/// Starts, resumes and ends the attendance session of the selected offering
pub struct SessionController {
    gateway: Gateway,
    state: Mutex<DeskState>,
}

impl SessionController {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway,
            state: Mutex::new(DeskState::default()),
        }
    }

    async fn lock(&self) -> MutexGuard<'_, DeskState> {
        self.state.lock().await
    }

    pub async fn view(&self) -> DeskView {
        self.lock().await.view.clone()
    }

    pub async fn session_state(&self) -> SessionState {
        self.lock().await.view.session
    }

    pub async fn selection(&self) -> Option<OfferingId> {
        self.lock().await.view.selection
    }

    /// Load the teacher's offerings; the first one is selected on first load
    pub async fn load_offerings(&self) -> ClientResult<Vec<Offering>> {
        let offerings: Vec<Offering> = match self.gateway.get("/teacher/offerings").await {
            Ok(offerings) => offerings,
            Err(e) => {
                warn!("Failed to load offerings: {}", e);
                self.lock().await.view.notice = StatusMessage::from_error(&e);
                return Err(e);
            }
        };
        info!("Loaded {} offering(s)", offerings.len());

        let first = {
            let mut state = self.lock().await;
            state.view.offerings = offerings.clone();
            match state.view.selection {
                None => offerings.first().map(|offering| offering.id),
                Some(_) => None,
            }
        };

        if let Some(offering_id) = first {
            self.resolve_for_selection(offering_id).await;
        }

        Ok(offerings)
    }

    /// Make `offering_id` the selection and reconcile it with the service
    ///
    /// Selecting a different offering discards everything shown for the
    /// previous one before any request is made. Re-running it for the current
    /// selection re-queries without clearing. A not-found answer means no
    /// active session and is not an error; any other failure leaves the desk
    /// in `NoSession` with a visible notice.
    pub async fn resolve_for_selection(&self, offering_id: OfferingId) -> SessionState {
        let ctx = {
            let mut state = self.lock().await;
            if state.view.selection != Some(offering_id) {
                state.epoch += 1;
                let offerings = std::mem::take(&mut state.view.offerings);
                state.view = DeskView {
                    offerings,
                    selection: Some(offering_id),
                    ..DeskView::default()
                };
                debug!("Selected offering {}", offering_id);
            }
            Context {
                epoch: state.epoch,
                offering: offering_id,
            }
        };

        let (session, ledger) = tokio::join!(self.resume(ctx), self.refresh_ledger_for(ctx));
        if let Err(e) = ledger {
            warn!("Failed to fetch ledger for offering {}: {}", offering_id, e);
        }
        session
    }

    async fn resume(&self, ctx: Context) -> SessionState {
        let result: ClientResult<AttendanceSession> = self
            .gateway
            .get(&format!("/teacher/attendance/active/{}", ctx.offering))
            .await;

        let mut state = self.lock().await;
        if !state.is_current(ctx) {
            debug!("Ignoring stale session lookup for offering {}", ctx.offering);
            return state.view.session;
        }

        state.view.session = match result {
            Ok(session) if session.active => {
                info!("Resumed session {} for offering {}", session.id, ctx.offering);
                state.view.feedback = Some(StatusMessage::info(format!(
                    "Resumed session {}",
                    session.id
                )));
                SessionState::Active(session.id)
            }
            Ok(session) => {
                debug!("Session {} reported inactive", session.id);
                SessionState::NoSession
            }
            Err(e) if e.is_not_found() => SessionState::NoSession,
            Err(e) => {
                warn!("Failed to check active session for {}: {}", ctx.offering, e);
                state.view.notice = StatusMessage::from_error(&e);
                SessionState::NoSession
            }
        };

        state.view.session
    }

    /// Re-read the ledger of the selected offering
    pub async fn refresh_ledger(&self) -> ClientResult<Vec<PresentRecord>> {
        let ctx = self.lock().await.context().ok_or_else(|| {
            ClientError::Validation("Select a course offering first.".to_string())
        })?;
        self.refresh_ledger_for(ctx).await
    }

    pub(crate) async fn refresh_ledger_for(
        &self,
        ctx: Context,
    ) -> ClientResult<Vec<PresentRecord>> {
        let records: Vec<PresentRecord> = self
            .gateway
            .get(&format!("/teacher/attendance/{}", ctx.offering))
            .await?;

        let mut state = self.lock().await;
        if state.is_current(ctx) {
            debug!("Ledger for offering {} has {} record(s)", ctx.offering, records.len());
            state.view.ledger = records.clone();
        } else {
            debug!("Ignoring stale ledger for offering {}", ctx.offering);
        }

        Ok(records)
    }

    /// Start a session for the selected offering
    pub async fn start(&self) -> ClientResult<SessionId> {
        let ctx = {
            let mut state = self.lock().await;
            let Some(ctx) = state.context() else {
                let message = "Select a course offering before starting a session.";
                state.view.notice = Some(StatusMessage::error(message));
                return Err(ClientError::Validation(message.to_string()));
            };
            if let SessionState::Active(id) = state.view.session {
                let message = format!("Session {} is already active.", id);
                state.view.notice = Some(StatusMessage::error(message.clone()));
                return Err(ClientError::Validation(message));
            }
            ctx
        };

        info!("Starting session for offering {}", ctx.offering);
        let result: ClientResult<AttendanceSession> = self
            .gateway
            .post_json(
                "/teacher/attendance/start",
                &StartSessionRequest {
                    course_offering_id: ctx.offering,
                },
            )
            .await;

        let (session, ctx) = {
            let mut state = self.lock().await;
            match result {
                Ok(session) if state.is_current(ctx) => {
                    let ctx = state.transition(ctx, SessionState::Active(session.id));
                    state.view.notice = Some(StatusMessage::success(format!(
                        "Session {} started successfully!",
                        session.id
                    )));
                    (session, ctx)
                }
                Ok(session) => {
                    debug!(
                        "Session {} started for offering {} which is no longer selected",
                        session.id, ctx.offering
                    );
                    return Ok(session.id);
                }
                Err(e) => {
                    warn!("Failed to start session for {}: {}", ctx.offering, e);
                    if state.is_current(ctx) {
                        state.view.notice = StatusMessage::from_error(&e);
                    }
                    return Err(e);
                }
            }
        };
        info!("Session {} active", session.id);

        // A resumed session may already hold records
        if let Err(e) = self.refresh_ledger_for(ctx).await {
            warn!("Failed to refresh ledger after start: {}", e);
        }

        Ok(session.id)
    }

    /// End the active session
    pub async fn end(&self) -> ClientResult<SessionId> {
        let (ctx, session_id) = {
            let mut state = self.lock().await;
            match (state.context(), state.view.session) {
                (Some(ctx), SessionState::Active(id)) => (ctx, id),
                _ => {
                    let message = "No active session to end.";
                    state.view.notice = Some(StatusMessage::error(message));
                    return Err(ClientError::Validation(message.to_string()));
                }
            }
        };

        info!("Ending session {}", session_id);
        let result: ClientResult<AttendanceSession> = self
            .gateway
            .post(&format!("/teacher/attendance/{}/end", session_id))
            .await;

        let ctx = {
            let mut state = self.lock().await;
            match result {
                Ok(session) if state.is_current_session(ctx, session_id) => {
                    let ctx = state.transition(ctx, SessionState::NoSession);
                    state.clear_live_feedback();
                    state.view.notice =
                        Some(StatusMessage::info(format!("Session {} closed", session.id)));
                    ctx
                }
                Ok(session) => {
                    debug!("Session {} closed after the desk moved on", session.id);
                    return Ok(session.id);
                }
                Err(e) => {
                    warn!("Failed to end session {}: {}", session_id, e);
                    if state.is_current(ctx) {
                        state.view.notice = StatusMessage::from_error(&e);
                    }
                    return Err(e);
                }
            }
        };

        if let Err(e) = self.refresh_ledger_for(ctx).await {
            warn!("Failed to refresh ledger after end: {}", e);
        }

        Ok(session_id)
    }

    /// Context and session id when a session is active
    pub(crate) async fn active_context(&self) -> Option<(Context, SessionId)> {
        let state = self.lock().await;
        match (state.context(), state.view.session) {
            (Some(ctx), SessionState::Active(id)) => Some((ctx, id)),
            _ => None,
        }
    }

    pub(crate) async fn set_feedback(&self, feedback: StatusMessage) {
        self.lock().await.view.feedback = Some(feedback);
    }

    /// Show feedback for `session_id` unless the desk has moved on
    pub(crate) async fn set_session_feedback(
        &self,
        ctx: Context,
        session_id: SessionId,
        feedback: StatusMessage,
    ) -> bool {
        let mut state = self.lock().await;
        if !state.is_current_session(ctx, session_id) {
            return false;
        }
        state.view.feedback = Some(feedback);
        true
    }

    /// Apply a verification verdict unless the desk has moved on
    pub(crate) async fn apply_verification(
        &self,
        ctx: Context,
        session_id: SessionId,
        verdict: &Verification,
        embeddings: DebugEmbeddings,
    ) -> bool {
        let mut state = self.lock().await;
        if !state.is_current_session(ctx, session_id) {
            debug!("Ignoring verification result for session {}", session_id);
            return false;
        }

        state.view.embeddings = embeddings;
        state.view.feedback = Some(if verdict.is_matched() {
            StatusMessage::success(verdict.feedback())
        } else {
            StatusMessage::error(verdict.feedback())
        });
        true
    }

    /// Surface a failed round trip and drop cached debug embeddings
    pub(crate) async fn apply_verification_failure(
        &self,
        ctx: Context,
        session_id: SessionId,
        err: &ClientError,
    ) -> bool {
        let mut state = self.lock().await;
        if !state.is_current_session(ctx, session_id) {
            return false;
        }

        state.view.embeddings = DebugEmbeddings::default();
        state.view.feedback = StatusMessage::from_error(err);
        true
    }
}
