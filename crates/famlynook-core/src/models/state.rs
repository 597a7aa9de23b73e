use serde::Serialize;
use std::fmt;

/// Lifecycle of one upload session.
///
/// States only move forward; `Linked`, `Canceled` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadState {
    Pending,
    GrantIssued,
    Uploading,
    Confirming,
    Linking,
    Linked,
    Canceled,
    Failed,
}

impl UploadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadState::Pending => "pending",
            UploadState::GrantIssued => "grant_issued",
            UploadState::Uploading => "uploading",
            UploadState::Confirming => "confirming",
            UploadState::Linking => "linking",
            UploadState::Linked => "linked",
            UploadState::Canceled => "canceled",
            UploadState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UploadState::Linked | UploadState::Canceled | UploadState::Failed
        )
    }

    /// Cancellation is refused once the bytes are durable.
    pub fn is_cancelable(&self) -> bool {
        matches!(
            self,
            UploadState::Pending | UploadState::GrantIssued | UploadState::Uploading
        )
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_advance_to(&self, next: UploadState) -> bool {
        use UploadState::*;

        if self.is_terminal() {
            return false;
        }

        match (self, next) {
            (_, Failed) => true,
            (from, Canceled) => from.is_cancelable(),
            (Pending, GrantIssued) => true,
            (GrantIssued, Uploading) => true,
            (Uploading, Confirming) => true,
            (Confirming, Linking) => true,
            (Confirming, Linked) => true,
            (Linking, Linked) => true,
            _ => false,
        }
    }
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot published to observers of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub state: UploadState,
    pub progress_percent: u8,
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self {
            state: UploadState::Pending,
            progress_percent: 0,
        }
    }
}
