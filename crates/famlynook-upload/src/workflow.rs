//! The upload state machine.
//!
//! Every step checks the session state, performs exactly one network call and
//! advances the session. Failures move the session to `Failed`; a cancel seen
//! by any step moves nothing further and releases the grant once.

use anyhow::Context;
use famlynook_api_client::{ApiClient, StorageClient};
use famlynook_core::UploadStep;
use famlynook_core::models::{
    CompletedUpload, ConfirmUploadBody, ContentRecord, LinkMediaBody, LinkTarget,
    PresignedUploadBody, ReleaseUploadBody, UploadGrant, UploadRequest,
};
use famlynook_core::{ClientConfig, ErrorMetadata, LogLevel, UploadError, UploadState};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::progress::ProgressTracker;
use crate::session::UploadSession;
use crate::source;
use crate::traits::{MediaApi, ObjectStore, PutObject};

/// Drives upload sessions against the Application Server and object storage.
///
/// Cheap to clone; sessions never share mutable state through it.
#[derive(Clone)]
pub struct UploadWorkflow {
    api: Arc<dyn MediaApi>,
    store: Arc<dyn ObjectStore>,
    family_id: Option<String>,
}

impl UploadWorkflow {
    pub fn new(api: Arc<dyn MediaApi>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            api,
            store,
            family_id: None,
        }
    }

    /// Family id sent in link bodies.
    pub fn with_family(mut self, family_id: impl Into<String>) -> Self {
        self.family_id = Some(family_id.into());
        self
    }

    /// Build the reqwest-backed workflow from configuration.
    pub fn from_config(config: &ClientConfig) -> anyhow::Result<Self> {
        config.validate().context("Invalid client configuration")?;

        let api = ApiClient::from_config(config)?;
        let store = StorageClient::from_config(config)?;

        let workflow = Self::new(Arc::new(api), Arc::new(store));
        Ok(match &config.family_id {
            Some(family_id) => workflow.with_family(family_id.clone()),
            None => workflow,
        })
    }

    pub fn family_id(&self) -> Option<&str> {
        self.family_id.as_deref()
    }

    /// New `Pending` session for `request`.
    pub fn session(&self, request: UploadRequest, link_target: Option<LinkTarget>) -> UploadSession {
        UploadSession::new(request, link_target)
    }

    /// Resolve the source and obtain a presigned URL.
    ///
    /// `Pending` → `GrantIssued`.
    #[tracing::instrument(skip(self, session), fields(session_id = %session.id()))]
    pub async fn request_grant(
        &self,
        session: &mut UploadSession,
    ) -> Result<UploadGrant, UploadError> {
        const OPERATION: &str = "request a grant";
        self.begin_step(session, UploadState::Pending, OPERATION)
            .await?;

        let prepared = match source::prepare(session.request()).await {
            Ok(prepared) => prepared,
            Err(e) => {
                return Err(self
                    .fail(session, UploadError::at_step(UploadStep::Grant, e))
                    .await)
            }
        };

        let body = PresignedUploadBody {
            file_name: prepared.file_name.clone(),
            content_type: prepared.content_type.clone(),
            file_size: prepared.file_size,
        };
        session.prepared = Some(prepared);

        let token = session.cancel_token();
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(self.abort_canceled(session).await),
            result = self.api.request_upload(&body) => result,
        };

        let grant = match result {
            Ok(grant) => grant,
            Err(e) => {
                return Err(self
                    .fail(session, UploadError::at_step(UploadStep::Grant, e))
                    .await)
            }
        };
        session.grant = Some(grant.clone());

        // A cancel that landed after the server answered still owns the grant
        if let Err(err) = session.advance(UploadState::GrantIssued, OPERATION) {
            return Err(self.fail(session, err).await);
        }

        tracing::info!(
            upload_id = %grant.upload_id,
            key = %grant.object_key,
            "Upload grant issued"
        );

        Ok(grant)
    }

    /// PUT the file bytes to the presigned URL.
    ///
    /// `GrantIssued` → `Uploading` → `Confirming`. `on_progress` receives each
    /// increase of the integer percentage and `100` once storage answered 200
    /// or 201. Any other status is a transfer failure.
    #[tracing::instrument(skip(self, session, on_progress), fields(session_id = %session.id()))]
    pub async fn transfer_bytes<F>(
        &self,
        session: &mut UploadSession,
        mut on_progress: F,
    ) -> Result<(), UploadError>
    where
        F: FnMut(u8) + Send,
    {
        const OPERATION: &str = "transfer bytes";
        self.begin_step(session, UploadState::GrantIssued, OPERATION)
            .await?;

        let (grant, prepared) = match (session.grant.clone(), session.prepared.clone()) {
            (Some(grant), Some(prepared)) => (grant, prepared),
            _ => {
                return Err(UploadError::InvalidState {
                    operation: OPERATION,
                    state: session.state(),
                })
            }
        };

        if let Err(err) = session.advance(UploadState::Uploading, OPERATION) {
            return Err(self.fail(session, err).await);
        }

        let mut tracker = ProgressTracker::new(prepared.total_bytes());
        let token = session.cancel_token();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let object = PutObject {
            url: &grant.presigned_url,
            content_type: &prepared.content_type,
            source: &prepared.source,
            content_length: prepared.content_length,
        };

        // The PUT future is dropped at the end of this block, which aborts
        // the request when the session was canceled.
        let outcome = {
            let put = self.store.put_object(object, tx);
            tokio::pin!(put);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break None,
                    result = &mut put => break Some(result),
                    Some(sent) = rx.recv() => {
                        if let Some(percent) = tracker.update(sent) {
                            tracing::debug!(bytes_sent = sent, percent, "Upload progress");
                            session.set_progress(percent);
                            on_progress(percent);
                        }
                    }
                }
            }
        };

        let status = match outcome {
            None => {
                tracing::debug!("Transfer aborted by cancellation");
                return Err(self.abort_canceled(session).await);
            }
            Some(Ok(status)) => status,
            Some(Err(e)) => {
                return Err(self
                    .fail(session, UploadError::at_step(UploadStep::Transfer, e))
                    .await)
            }
        };

        if status != 200 && status != 201 {
            return Err(self
                .fail(session, UploadError::transfer_status(status))
                .await);
        }

        if let Err(err) = session.advance(UploadState::Confirming, OPERATION) {
            return Err(self.fail(session, err).await);
        }

        if let Some(percent) = tracker.complete() {
            session.set_progress(percent);
            on_progress(percent);
        }

        tracing::info!(
            upload_id = %grant.upload_id,
            status,
            "File bytes stored"
        );

        Ok(())
    }

    /// Tell the server the object is stored.
    ///
    /// Allowed once per session. `Confirming` → `Linking` when the session
    /// has a link target, else `Linked`.
    #[tracing::instrument(skip(self, session), fields(session_id = %session.id()))]
    pub async fn confirm(
        &self,
        session: &mut UploadSession,
    ) -> Result<serde_json::Value, UploadError> {
        const OPERATION: &str = "confirm";
        if session.confirm_attempted {
            return Err(UploadError::InvalidState {
                operation: OPERATION,
                state: session.state(),
            });
        }
        self.begin_step(session, UploadState::Confirming, OPERATION)
            .await?;

        let body = match session.grant() {
            Some(grant) => ConfirmUploadBody::from(grant),
            None => {
                return Err(UploadError::InvalidState {
                    operation: OPERATION,
                    state: session.state(),
                })
            }
        };

        session.confirm_attempted = true;
        let confirmation = match self.api.confirm_upload(&body).await {
            Ok(confirmation) => confirmation,
            Err(e) => {
                return Err(self
                    .fail(session, UploadError::at_step(UploadStep::Confirm, e))
                    .await)
            }
        };

        let next = if session.link_target().is_some() {
            UploadState::Linking
        } else {
            UploadState::Linked
        };
        session.advance(next, OPERATION)?;
        session.confirmation = Some(confirmation.clone());

        tracing::info!(upload_id = %body.upload_id, next = %next, "Upload confirmed");

        Ok(confirmation)
    }

    /// Attach the confirmed upload to the session's memory or post.
    ///
    /// `Linking` → `Linked`.
    #[tracing::instrument(skip(self, session), fields(session_id = %session.id()))]
    pub async fn link_to_entity(
        &self,
        session: &mut UploadSession,
    ) -> Result<ContentRecord, UploadError> {
        const OPERATION: &str = "link to entity";
        self.begin_step(session, UploadState::Linking, OPERATION)
            .await?;

        let (target, body) = match (session.link_target(), session.grant(), session.prepared()) {
            (Some(target), Some(grant), Some(prepared)) => (
                target.clone(),
                LinkMediaBody {
                    upload_id: grant.upload_id.clone(),
                    key: grant.object_key.clone(),
                    file_url: grant.public_url.clone(),
                    content_type: prepared.content_type.clone(),
                    file_name: prepared.file_name.clone(),
                    family_id: self.family_id.clone(),
                },
            ),
            _ => {
                return Err(UploadError::InvalidState {
                    operation: OPERATION,
                    state: session.state(),
                })
            }
        };

        let content = match self.api.link_media(&target, &body).await {
            Ok(content) => content,
            Err(e) => {
                return Err(self
                    .fail(session, UploadError::at_step(UploadStep::Link, e))
                    .await)
            }
        };

        session.advance(UploadState::Linked, OPERATION)?;
        session.content = Some(content.clone());

        tracing::info!(
            entity_kind = target.entity_kind.as_str(),
            entity_id = %target.entity_id,
            content_id = ?content.content_id,
            "Upload linked"
        );

        Ok(content)
    }

    /// Cancel an idle session and release its grant.
    ///
    /// Sessions running in another task are canceled through their
    /// [`CancelHandle`](crate::CancelHandle) instead.
    #[tracing::instrument(skip(self, session), fields(session_id = %session.id()))]
    pub async fn cancel(&self, session: &mut UploadSession) -> Result<(), UploadError> {
        session.cancel_handle().cancel()?;
        self.release_grant(session).await;
        tracing::info!("Upload canceled");
        Ok(())
    }

    /// Grant, transfer, confirm and, with a link target, link.
    pub async fn run<F>(
        &self,
        session: &mut UploadSession,
        mut on_progress: F,
    ) -> Result<CompletedUpload, UploadError>
    where
        F: FnMut(u8) + Send,
    {
        let grant = self.request_grant(session).await?;
        self.transfer_bytes(session, &mut on_progress).await?;
        let confirmation = self.confirm(session).await?;

        let content = if session.state() == UploadState::Linking {
            Some(self.link_to_entity(session).await?)
        } else {
            None
        };

        Ok(CompletedUpload {
            session_id: session.id(),
            grant,
            confirmation,
            content,
        })
    }

    /// Upload a single file without observing the session.
    pub async fn upload(
        &self,
        request: UploadRequest,
        link_target: Option<LinkTarget>,
    ) -> Result<CompletedUpload, UploadError> {
        let mut session = self.session(request, link_target);
        self.run(&mut session, |_| {}).await
    }

    async fn begin_step(
        &self,
        session: &mut UploadSession,
        expected: UploadState,
        operation: &'static str,
    ) -> Result<(), UploadError> {
        match session.state() {
            state if state == expected => Ok(()),
            UploadState::Canceled => Err(self.abort_canceled(session).await),
            state => Err(UploadError::InvalidState { operation, state }),
        }
    }

    /// Record a step failure. A session canceled in the meantime stays
    /// `Canceled`.
    async fn fail(&self, session: &mut UploadSession, err: UploadError) -> UploadError {
        if session.state() == UploadState::Canceled {
            return self.abort_canceled(session).await;
        }

        session.mark_failed();
        log_upload_error(&err);
        err
    }

    async fn abort_canceled(&self, session: &mut UploadSession) -> UploadError {
        self.release_grant(session).await;
        UploadError::Canceled
    }

    /// Best-effort, at most once per session.
    async fn release_grant(&self, session: &mut UploadSession) {
        if session.grant_released {
            return;
        }
        let body = match session.grant() {
            Some(grant) => ReleaseUploadBody::from(grant),
            None => return,
        };
        session.grant_released = true;

        match self.api.release_upload(&body).await {
            Ok(()) => tracing::debug!(upload_id = %body.upload_id, "Upload grant released"),
            Err(e) => tracing::warn!(
                upload_id = %body.upload_id,
                error = %e,
                "Failed to release upload grant"
            ),
        }
    }
}

fn log_upload_error(error: &UploadError) {
    let code = error.error_code();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error.detailed_message(), code, "Upload step failed");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error.detailed_message(), code, "Upload step failed");
        }
        LogLevel::Error => {
            tracing::error!(error = %error.detailed_message(), code, "Upload step failed");
        }
    }
}
