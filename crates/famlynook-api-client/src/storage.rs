//! Direct upload of file bytes to a presigned storage URL.

use anyhow::{Context, Result};
use famlynook_core::ClientConfig;
use futures::StreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::io::ReaderStream;

/// HTTP client for presigned PUTs.
///
/// The presigned URL embeds its own credentials, so no auth header is sent.
/// Uses a separate client from `ApiClient` because transfers need a much
/// longer timeout than metadata calls.
#[derive(Clone, Debug)]
pub struct StorageClient {
    client: Client,
}

impl StorageClient {
    pub fn new(timeout: Duration, connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()
            .context("Failed to create storage HTTP client")?;

        Ok(Self { client })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(config.transfer_timeout(), config.connect_timeout())
    }

    /// Stream the file at `source` to `url` with a PUT.
    ///
    /// Cumulative bytes handed to the connection are sent on `progress` as
    /// they are read. Returns the storage response status without judging it;
    /// only transport failures are errors. Dropping the returned future aborts
    /// the request.
    pub async fn put_file(
        &self,
        url: &str,
        content_type: &str,
        source: &Path,
        content_length: Option<u64>,
        progress: UnboundedSender<u64>,
    ) -> Result<StatusCode> {
        let file = tokio::fs::File::open(source)
            .await
            .with_context(|| format!("Failed to open file: {}", source.display()))?;

        let mut sent: u64 = 0;
        let stream = ReaderStream::new(file).map(move |chunk| {
            if let Ok(bytes) = &chunk {
                sent += bytes.len() as u64;
                // Receiver gone means nobody is watching anymore.
                let _ = progress.send(sent);
            }
            chunk
        });

        let mut request = self
            .client
            .put(url)
            .header(CONTENT_TYPE, content_type)
            .body(reqwest::Body::wrap_stream(stream));
        if let Some(length) = content_length {
            request = request.header(CONTENT_LENGTH, length);
        }

        let response = request
            .send()
            .await
            .context("Failed to send file to storage")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(status = %status, body = %body, "Storage rejected upload");
        }

        Ok(status)
    }
}
