//! FamlyNook media upload workflow.
//!
//! Drives one local file through the three-call handshake with the
//! Application Server and the object store:
//!
//! 1. request a presigned URL (the *grant*),
//! 2. PUT the bytes directly to storage,
//! 3. confirm the upload, then optionally link it to a memory or post.
//!
//! Each file gets its own [`UploadSession`]. Sessions report progress through
//! a callback and a watch channel, can be canceled from any task through a
//! [`CancelHandle`], and move through [`UploadState`] monotonically. Batches
//! run independent sessions and report per-item results.

pub mod batch;
pub mod clients;
pub mod progress;
pub mod session;
pub mod source;
pub mod traits;
pub mod workflow;

#[cfg(test)]
pub mod test_helpers;

pub use batch::{cancel_all, BatchItemResult, BatchOptions, BatchReport};
pub use session::{CancelHandle, UploadSession};
pub use source::PreparedUpload;
pub use traits::{MediaApi, ObjectStore, PutObject};
pub use workflow::UploadWorkflow;

pub use famlynook_core::{
    CompletedUpload, ContentRecord, EntityKind, ErrorMetadata, LinkTarget, SessionStatus,
    UploadError, UploadGrant, UploadRequest, UploadState,
};
