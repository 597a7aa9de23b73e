//! `MediaApi` and `ObjectStore` over the reqwest clients.

use async_trait::async_trait;
use famlynook_api_client::{ApiClient, StorageClient};
use famlynook_core::models::{
    ConfirmUploadBody, ContentRecord, LinkMediaBody, LinkTarget, PresignedUploadBody,
    ReleaseUploadBody, UploadGrant,
};
use tokio::sync::mpsc::UnboundedSender;

use crate::traits::{MediaApi, ObjectStore, PutObject};

#[async_trait]
impl MediaApi for ApiClient {
    async fn request_upload(&self, body: &PresignedUploadBody) -> anyhow::Result<UploadGrant> {
        self.request_presigned_upload(body).await
    }

    async fn confirm_upload(&self, body: &ConfirmUploadBody) -> anyhow::Result<serde_json::Value> {
        ApiClient::confirm_upload(self, body).await
    }

    async fn link_media(
        &self,
        target: &LinkTarget,
        body: &LinkMediaBody,
    ) -> anyhow::Result<ContentRecord> {
        ApiClient::link_media(self, target, body).await
    }

    async fn release_upload(&self, body: &ReleaseUploadBody) -> anyhow::Result<()> {
        ApiClient::release_upload(self, body).await
    }
}

#[async_trait]
impl ObjectStore for StorageClient {
    async fn put_object(
        &self,
        object: PutObject<'_>,
        progress: UnboundedSender<u64>,
    ) -> anyhow::Result<u16> {
        let status = self
            .put_file(
                object.url,
                object.content_type,
                object.source,
                object.content_length,
                progress,
            )
            .await?;
        Ok(status.as_u16())
    }
}
