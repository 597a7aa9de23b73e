//! Independent sessions run side by side.

use famlynook_core::models::{CompletedUpload, LinkTarget, UploadRequest};
use famlynook_core::{ClientConfig, UploadError, UploadState};
use futures::stream::{self, StreamExt};
use uuid::Uuid;

use crate::session::{CancelHandle, UploadSession};
use crate::workflow::UploadWorkflow;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOptions {
    /// Sessions in flight at once; `None` runs the whole batch concurrently
    pub max_concurrent: Option<usize>,
}

impl BatchOptions {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            max_concurrent: config.max_concurrent_uploads,
        }
    }

    fn limit(&self, batch_len: usize) -> usize {
        self.max_concurrent.unwrap_or(batch_len).max(1)
    }
}

/// Outcome of one session of a batch.
#[derive(Debug)]
pub struct BatchItemResult {
    /// Position of the session in the batch input
    pub index: usize,
    pub session_id: Uuid,
    pub state: UploadState,
    pub result: Result<CompletedUpload, UploadError>,
}

impl BatchItemResult {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn is_canceled(&self) -> bool {
        matches!(&self.result, Err(err) if err.is_canceled())
    }
}

/// Per-item results in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub items: Vec<BatchItemResult>,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|i| i.is_success()).count()
    }

    /// Items that ended in error, cancellation excluded.
    pub fn failed(&self) -> usize {
        self.items
            .iter()
            .filter(|i| !i.is_success() && !i.is_canceled())
            .count()
    }

    pub fn canceled(&self) -> usize {
        self.items.iter().filter(|i| i.is_canceled()).count()
    }

    pub fn successes(&self) -> impl Iterator<Item = (usize, &CompletedUpload)> {
        self.items
            .iter()
            .filter_map(|i| i.result.as_ref().ok().map(|c| (i.index, c)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (usize, &UploadError)> {
        self.items
            .iter()
            .filter_map(|i| i.result.as_ref().err().map(|e| (i.index, e)))
    }
}

impl UploadWorkflow {
    /// One `Pending` session per request, all sharing `link_target`.
    pub fn sessions<I>(&self, requests: I, link_target: Option<LinkTarget>) -> Vec<UploadSession>
    where
        I: IntoIterator<Item = UploadRequest>,
    {
        requests
            .into_iter()
            .map(|request| self.session(request, link_target.clone()))
            .collect()
    }

    /// Run every session to completion.
    ///
    /// A failing session never stops its siblings. `on_progress` receives
    /// the session's index in `sessions` with each percentage increase.
    #[tracing::instrument(skip_all, fields(batch_size = sessions.len()))]
    pub async fn run_batch<F>(
        &self,
        sessions: &mut [UploadSession],
        options: BatchOptions,
        on_progress: F,
    ) -> BatchReport
    where
        F: Fn(usize, u8) + Send + Sync,
    {
        let limit = options.limit(sessions.len());
        let on_progress = &on_progress;

        let mut items: Vec<BatchItemResult> = stream::iter(sessions.iter_mut().enumerate())
            .map(|(index, session)| async move {
                let result = self
                    .run(session, move |percent| on_progress(index, percent))
                    .await;
                BatchItemResult {
                    index,
                    session_id: session.id(),
                    state: session.state(),
                    result,
                }
            })
            .buffer_unordered(limit)
            .collect()
            .await;
        items.sort_by_key(|item| item.index);

        let report = BatchReport { items };
        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            canceled = report.canceled(),
            "Upload batch finished"
        );
        report
    }
}

/// Cancel every session that still can be; returns how many were canceled.
pub fn cancel_all<'a, I>(handles: I) -> usize
where
    I: IntoIterator<Item = &'a CancelHandle>,
{
    handles
        .into_iter()
        .filter(|handle| handle.cancel().is_ok())
        .count()
}
