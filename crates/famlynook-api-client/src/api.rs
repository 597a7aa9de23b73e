//! Media upload endpoints of the Application Server.

use crate::ApiClient;
use anyhow::{Context, Result};
use famlynook_core::constants::{CANCEL_UPLOAD_PATH, CONFIRM_UPLOAD_PATH, PRESIGNED_UPLOAD_PATH};
use famlynook_core::models::{
    ConfirmUploadBody, ContentRecord, LinkMediaBody, LinkTarget, PresignedUploadBody,
    ReleaseUploadBody, UploadGrant,
};
use validator::Validate;

impl ApiClient {
    /// Ask the server for a presigned PUT URL for one file.
    pub async fn request_presigned_upload(&self, body: &PresignedUploadBody) -> Result<UploadGrant> {
        body.validate()
            .map_err(|e| anyhow::anyhow!("Invalid upload request: {}", e))?;

        let grant: UploadGrant = self
            .post_json(PRESIGNED_UPLOAD_PATH, body)
            .await
            .context("Failed to request presigned upload")?;

        grant
            .validate()
            .map_err(|e| anyhow::anyhow!("Server returned an incomplete grant: {}", e))?;

        tracing::debug!(
            upload_id = %grant.upload_id,
            key = %grant.object_key,
            "Received presigned upload grant"
        );

        Ok(grant)
    }

    /// Tell the server the object behind `body.key` has been written.
    pub async fn confirm_upload(&self, body: &ConfirmUploadBody) -> Result<serde_json::Value> {
        self.post_json_value(CONFIRM_UPLOAD_PATH, body)
            .await
            .context("Failed to confirm upload")
    }

    /// Attach a confirmed object to a memory or post.
    ///
    /// Any 2xx answer means the object is linked, whatever its body looks like.
    pub async fn link_media(
        &self,
        target: &LinkTarget,
        body: &LinkMediaBody,
    ) -> Result<ContentRecord> {
        self.post_json_value(&target.media_path(), body)
            .await
            .map(ContentRecord::from_response)
            .with_context(|| {
                format!(
                    "Failed to link upload to {} {}",
                    target.entity_kind.as_str(),
                    target.entity_id
                )
            })
    }

    /// Let the server garbage-collect a grant that will never be used.
    pub async fn release_upload(&self, body: &ReleaseUploadBody) -> Result<()> {
        self.post_ignore_body(CANCEL_UPLOAD_PATH, body)
            .await
            .context("Failed to release upload grant")
    }
}
