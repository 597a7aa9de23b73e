//! Per-file upload session and its shared status.
//!
//! The session itself is owned by one caller and passed `&mut` to every
//! workflow step. State and progress live behind a `watch` channel shared
//! with [`CancelHandle`]s and subscribers, so another task can observe or
//! cancel the session while a step is running.

use famlynook_core::models::{ContentRecord, LinkTarget, SessionStatus, UploadGrant, UploadRequest};
use famlynook_core::{UploadError, UploadState};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::source::PreparedUpload;

#[derive(Debug)]
struct SessionShared {
    status: watch::Sender<SessionStatus>,
    cancel: CancellationToken,
}

impl SessionShared {
    /// Move to `next` if the state machine allows it.
    ///
    /// The check and the write happen under the channel's lock, so a
    /// concurrent cancel and a step completion cannot both win.
    fn advance(&self, next: UploadState, operation: &'static str) -> Result<(), UploadError> {
        let mut result = Ok(());
        self.status.send_if_modified(|status| {
            if status.state.can_advance_to(next) {
                status.state = next;
                true
            } else {
                result = Err(UploadError::InvalidState {
                    operation,
                    state: status.state,
                });
                false
            }
        });
        result
    }

    fn state(&self) -> UploadState {
        self.status.borrow().state
    }
}

/// One file moving through grant, transfer, confirm and link.
#[derive(Debug)]
pub struct UploadSession {
    id: Uuid,
    request: UploadRequest,
    link_target: Option<LinkTarget>,
    pub(crate) prepared: Option<PreparedUpload>,
    pub(crate) grant: Option<UploadGrant>,
    pub(crate) confirmation: Option<serde_json::Value>,
    pub(crate) content: Option<ContentRecord>,
    pub(crate) confirm_attempted: bool,
    pub(crate) grant_released: bool,
    shared: Arc<SessionShared>,
}

impl UploadSession {
    pub fn new(request: UploadRequest, link_target: Option<LinkTarget>) -> Self {
        let (status, _) = watch::channel(SessionStatus::default());

        Self {
            id: Uuid::new_v4(),
            request,
            link_target,
            prepared: None,
            grant: None,
            confirmation: None,
            content: None,
            confirm_attempted: false,
            grant_released: false,
            shared: Arc::new(SessionShared {
                status,
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn request(&self) -> &UploadRequest {
        &self.request
    }

    pub fn link_target(&self) -> Option<&LinkTarget> {
        self.link_target.as_ref()
    }

    /// Resolved name, type and size; set once the grant step has started.
    pub fn prepared(&self) -> Option<&PreparedUpload> {
        self.prepared.as_ref()
    }

    pub fn grant(&self) -> Option<&UploadGrant> {
        self.grant.as_ref()
    }

    pub fn confirmation(&self) -> Option<&serde_json::Value> {
        self.confirmation.as_ref()
    }

    pub fn content(&self) -> Option<&ContentRecord> {
        self.content.as_ref()
    }

    pub fn state(&self) -> UploadState {
        self.shared.state()
    }

    pub fn progress_percent(&self) -> u8 {
        self.shared.status.borrow().progress_percent
    }

    pub fn status(&self) -> SessionStatus {
        *self.shared.status.borrow()
    }

    /// Watch state and progress changes from another task.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.shared.status.subscribe()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            session_id: self.id,
            shared: Arc::clone(&self.shared),
        }
    }

    pub(crate) fn cancel_token(&self) -> CancellationToken {
        self.shared.cancel.clone()
    }

    pub(crate) fn advance(
        &self,
        next: UploadState,
        operation: &'static str,
    ) -> Result<(), UploadError> {
        self.shared.advance(next, operation)
    }

    /// Publish `percent` unless it would move progress backwards.
    pub(crate) fn set_progress(&self, percent: u8) {
        self.shared.status.send_if_modified(|status| {
            if percent > status.progress_percent {
                status.progress_percent = percent;
                true
            } else {
                false
            }
        });
    }

    /// Move to `Failed` unless the session already reached a terminal state.
    pub(crate) fn mark_failed(&self) {
        let _ = self.shared.advance(UploadState::Failed, "fail");
    }
}

/// Cancels a session from any task.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    session_id: Uuid,
    shared: Arc<SessionShared>,
}

impl CancelHandle {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn state(&self) -> UploadState {
        self.shared.state()
    }

    /// Move the session to `Canceled` and abort its running step.
    ///
    /// Fails with `InvalidState` once the bytes are stored (`Confirming` or
    /// later) or the session already ended; nothing changes in that case. The
    /// running step, or the next step invoked, notifies the server.
    pub fn cancel(&self) -> Result<(), UploadError> {
        self.shared.advance(UploadState::Canceled, "cancel")?;
        self.shared.cancel.cancel();
        tracing::debug!(session_id = %self.session_id, "Upload session canceled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> UploadSession {
        UploadSession::new(UploadRequest::new("/tmp/photo.jpg"), None)
    }

    #[test]
    fn starts_pending_at_zero() {
        let session = session();
        assert_eq!(session.state(), UploadState::Pending);
        assert_eq!(session.progress_percent(), 0);
        assert!(session.grant().is_none());
    }

    #[test]
    fn advance_rejects_skipped_states() {
        let session = session();
        let err = session
            .advance(UploadState::Confirming, "transfer bytes")
            .unwrap_err();
        assert!(matches!(
            err,
            UploadError::InvalidState {
                operation: "transfer bytes",
                state: UploadState::Pending
            }
        ));
        assert_eq!(session.state(), UploadState::Pending);
    }

    #[test]
    fn progress_never_decreases() {
        let session = session();
        session.set_progress(40);
        session.set_progress(10);
        assert_eq!(session.progress_percent(), 40);
    }

    #[test]
    fn cancel_handle_fires_token_and_is_single_shot() {
        let session = session();
        let handle = session.cancel_handle();
        let token = session.cancel_token();

        handle.cancel().unwrap();
        assert_eq!(session.state(), UploadState::Canceled);
        assert!(token.is_cancelled());

        assert!(matches!(
            handle.cancel(),
            Err(UploadError::InvalidState {
                state: UploadState::Canceled,
                ..
            })
        ));
    }

    #[test]
    fn cancel_refused_once_confirming() {
        let session = session();
        session.advance(UploadState::GrantIssued, "grant").unwrap();
        session.advance(UploadState::Uploading, "transfer").unwrap();
        session.advance(UploadState::Confirming, "transfer").unwrap();

        assert!(session.cancel_handle().cancel().is_err());
        assert_eq!(session.state(), UploadState::Confirming);
        assert!(!session.cancel_token().is_cancelled());
    }

    #[test]
    fn failure_does_not_override_terminal_state() {
        let session = session();
        session.cancel_handle().cancel().unwrap();
        session.mark_failed();
        assert_eq!(session.state(), UploadState::Canceled);
    }

    #[tokio::test]
    async fn subscribers_see_transitions() {
        let session = session();
        let mut rx = session.subscribe();

        session.advance(UploadState::GrantIssued, "grant").unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().state, UploadState::GrantIssued);
    }
}
