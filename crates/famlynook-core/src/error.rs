//! Error types module
//!
//! `UploadError` is the taxonomy the upload workflow surfaces to its caller.
//! The four step variants say which network step failed and keep the
//! underlying transport error as their source. `ErrorMetadata` describes each
//! error for presentation: a stable code, whether retrying can help, and a
//! client message that never leaks transport detail.

use serde::Serialize;

use crate::models::UploadState;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected outcomes like cancellation or misuse of the API
    Debug,
    /// Recoverable failures
    Warn,
    /// Unexpected failures
    Error,
}

/// Network step of an upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStep {
    Grant,
    Transfer,
    Confirm,
    Link,
}

impl UploadStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStep::Grant => "grant",
            UploadStep::Transfer => "transfer",
            UploadStep::Confirm => "confirm",
            UploadStep::Link => "link",
        }
    }
}

/// Non-2xx response from the Application Server.
///
/// Carried inside `anyhow` chains so the workflow can recover the status code.
#[derive(Debug, Clone, thiserror::Error)]
#[error("API request failed with status {status}: {body}")]
pub struct ApiStatusError {
    pub status: u16,
    pub body: String,
}

/// Find the HTTP status of the first `ApiStatusError` in an error chain.
pub fn response_status(err: &anyhow::Error) -> Option<u16> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ApiStatusError>())
        .map(|e| e.status)
}

/// Metadata describing how an error should be presented to the user
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "UPLOAD_TRANSFER_FAILED")
    fn error_code(&self) -> &'static str;

    /// Step that failed, if the error came from a network step
    fn step(&self) -> Option<UploadStep>;

    /// Whether retrying (the session or the failed step) can succeed
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the caller
    fn suggested_action(&self) -> Option<&'static str>;

    /// User-facing message without transport detail
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Grant request failed: {message}")]
    Grant {
        message: String,
        status: Option<u16>,
        #[source]
        source: anyhow::Error,
    },

    #[error("Transfer failed: {message}")]
    Transfer {
        message: String,
        status: Option<u16>,
        #[source]
        source: anyhow::Error,
    },

    #[error("Confirmation failed: {message}")]
    Confirm {
        message: String,
        status: Option<u16>,
        #[source]
        source: anyhow::Error,
    },

    #[error("Linking failed: {message}")]
    Link {
        message: String,
        status: Option<u16>,
        #[source]
        source: anyhow::Error,
    },

    #[error("Invalid state: cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: UploadState,
    },

    #[error("Upload canceled")]
    Canceled,
}

impl UploadError {
    /// Wrap a collaborator failure as the error of `step`.
    pub fn at_step(step: UploadStep, source: anyhow::Error) -> Self {
        let status = response_status(&source);
        let message = source.to_string();
        match step {
            UploadStep::Grant => UploadError::Grant {
                message,
                status,
                source,
            },
            UploadStep::Transfer => UploadError::Transfer {
                message,
                status,
                source,
            },
            UploadStep::Confirm => UploadError::Confirm {
                message,
                status,
                source,
            },
            UploadStep::Link => UploadError::Link {
                message,
                status,
                source,
            },
        }
    }

    /// Storage answered the PUT with something other than 200/201.
    pub fn transfer_status(status: u16) -> Self {
        let message = format!("storage responded with status {}", status);
        UploadError::Transfer {
            source: anyhow::anyhow!(message.clone()),
            message,
            status: Some(status),
        }
    }

    /// HTTP status attached to the failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            UploadError::Grant { status, .. }
            | UploadError::Transfer { status, .. }
            | UploadError::Confirm { status, .. }
            | UploadError::Link { status, .. } => *status,
            UploadError::InvalidState { .. } | UploadError::Canceled => None,
        }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, UploadError::Canceled)
    }

    /// Get the error type name for detailed error reports
    pub fn error_type(&self) -> &'static str {
        match self {
            UploadError::Grant { .. } => "GrantError",
            UploadError::Transfer { .. } => "TransferError",
            UploadError::Confirm { .. } => "ConfirmError",
            UploadError::Link { .. } => "LinkError",
            UploadError::InvalidState { .. } => "InvalidStateError",
            UploadError::Canceled => "Canceled",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

/// Static metadata for each variant: (error_code, suggested_action, log_level).
fn upload_error_static_metadata(
    err: &UploadError,
) -> (&'static str, Option<&'static str>, LogLevel) {
    match err {
        UploadError::Grant { .. } => (
            "UPLOAD_GRANT_FAILED",
            Some("Check your connection and start the upload again"),
            LogLevel::Warn,
        ),
        UploadError::Transfer { .. } => (
            "UPLOAD_TRANSFER_FAILED",
            Some("Start the upload again"),
            LogLevel::Warn,
        ),
        UploadError::Confirm { .. } => (
            "UPLOAD_CONFIRM_FAILED",
            Some("Retry confirmation; the file is already stored"),
            LogLevel::Error,
        ),
        UploadError::Link { .. } => (
            "UPLOAD_LINK_FAILED",
            Some("Retry linking without uploading the file again"),
            LogLevel::Error,
        ),
        UploadError::InvalidState { .. } => ("INVALID_UPLOAD_STATE", None, LogLevel::Debug),
        UploadError::Canceled => ("UPLOAD_CANCELED", None, LogLevel::Debug),
    }
}

/// Client errors other than timeouts and throttling will fail again.
fn status_is_retryable(status: Option<u16>) -> bool {
    match status {
        None => true,
        Some(408) | Some(429) => true,
        Some(code) => !(400..500).contains(&code),
    }
}

impl ErrorMetadata for UploadError {
    fn error_code(&self) -> &'static str {
        upload_error_static_metadata(self).0
    }

    fn step(&self) -> Option<UploadStep> {
        match self {
            UploadError::Grant { .. } => Some(UploadStep::Grant),
            UploadError::Transfer { .. } => Some(UploadStep::Transfer),
            UploadError::Confirm { .. } => Some(UploadStep::Confirm),
            UploadError::Link { .. } => Some(UploadStep::Link),
            UploadError::InvalidState { .. } | UploadError::Canceled => None,
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            UploadError::Grant { status, .. } => status_is_retryable(*status),
            // A fresh session gets a fresh presigned URL
            UploadError::Transfer { .. } => true,
            UploadError::Confirm { status, .. } | UploadError::Link { status, .. } => {
                status_is_retryable(*status)
            }
            UploadError::InvalidState { .. } | UploadError::Canceled => false,
        }
    }

    fn suggested_action(&self) -> Option<&'static str> {
        upload_error_static_metadata(self).1
    }

    fn log_level(&self) -> LogLevel {
        upload_error_static_metadata(self).2
    }

    fn client_message(&self) -> String {
        match self {
            UploadError::Grant {
                status: Some(401) | Some(403),
                ..
            } => "You are not allowed to upload here. Please sign in again.".to_string(),
            UploadError::Grant { .. } | UploadError::Transfer { .. } => {
                "Upload failed, try again.".to_string()
            }
            UploadError::Confirm { .. } => {
                "Upload could not be completed, try again.".to_string()
            }
            UploadError::Link { .. } => {
                "Your file was uploaded but could not be added, try again.".to_string()
            }
            UploadError::InvalidState { .. } => "This upload can no longer be changed.".to_string(),
            UploadError::Canceled => "Upload canceled.".to_string(),
        }
    }
}
