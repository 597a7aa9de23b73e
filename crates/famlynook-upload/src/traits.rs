//! Seams to the two collaborators of the workflow
//!
//! The workflow only talks to the Application Server through [`MediaApi`] and
//! to object storage through [`ObjectStore`]. Production implementations wrap
//! the reqwest clients (see `clients`); tests use in-memory mocks.

use async_trait::async_trait;
use famlynook_core::models::{
    ConfirmUploadBody, ContentRecord, LinkMediaBody, LinkTarget, PresignedUploadBody,
    ReleaseUploadBody, UploadGrant,
};
use std::path::Path;
use tokio::sync::mpsc::UnboundedSender;

/// Upload endpoints of the Application Server
#[async_trait]
pub trait MediaApi: Send + Sync {
    /// Obtain a presigned PUT URL for one file
    async fn request_upload(&self, body: &PresignedUploadBody) -> anyhow::Result<UploadGrant>;

    /// Report that the object was written; returns the server's opaque payload
    async fn confirm_upload(&self, body: &ConfirmUploadBody) -> anyhow::Result<serde_json::Value>;

    /// Attach a confirmed object to a memory or post
    async fn link_media(
        &self,
        target: &LinkTarget,
        body: &LinkMediaBody,
    ) -> anyhow::Result<ContentRecord>;

    /// Release a grant that will not be used
    async fn release_upload(&self, body: &ReleaseUploadBody) -> anyhow::Result<()>;
}

/// One PUT of a local file to a presigned URL.
#[derive(Debug, Clone, Copy)]
pub struct PutObject<'a> {
    pub url: &'a str,
    pub content_type: &'a str,
    pub source: &'a Path,
    /// Measured size of `source`, sent as `Content-Length` when known
    pub content_length: Option<u64>,
}

/// Object storage reached through presigned URLs
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload the file and return the HTTP status storage answered with.
    ///
    /// Cumulative bytes sent are reported on `progress`. Only transport
    /// failures are errors; the caller decides which statuses count as
    /// success. Dropping the future must abort the transfer.
    async fn put_object(
        &self,
        object: PutObject<'_>,
        progress: UnboundedSender<u64>,
    ) -> anyhow::Result<u16>;
}
