//! FamlyNook Core Library
//!
//! Domain models, the upload error taxonomy and client configuration shared by
//! the API client, the upload workflow and the command-line harness.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

pub use config::ClientConfig;
pub use error::{response_status, ApiStatusError, ErrorMetadata, LogLevel, UploadError, UploadStep};
pub use models::{
    CompletedUpload, ConfirmUploadBody, ContentRecord, EntityKind, LinkMediaBody, LinkTarget,
    PresignedUploadBody, ReleaseUploadBody, SessionStatus, UploadGrant, UploadRequest,
    UploadState,
};
