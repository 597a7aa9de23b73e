//! HTTP clients for the FamlyNook upload workflow.
//!
//! `ApiClient` talks to the Application Server (grant, confirm, link, cancel)
//! with optional Bearer auth and the selected family attached to every call.
//! `StorageClient` performs the direct PUT of file bytes to a presigned URL.

pub mod api;
pub mod storage;

use anyhow::{Context, Result};
use famlynook_core::constants::FAMILY_ID_HEADER;
use famlynook_core::{ApiStatusError, ClientConfig};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub use storage::StorageClient;

/// Authentication strategy for the API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Auth {
    /// `Authorization: Bearer {token}`
    Bearer(String),
    /// No credentials
    Anonymous,
}

/// HTTP client for the Application Server.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: Auth,
    family_id: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: String, auth: Auth) -> Result<Self> {
        Self::with_timeouts(
            base_url,
            auth,
            Duration::from_secs(famlynook_core::constants::DEFAULT_REQUEST_TIMEOUT_SECS),
            Duration::from_secs(famlynook_core::constants::DEFAULT_CONNECT_TIMEOUT_SECS),
        )
    }

    fn with_timeouts(
        base_url: String,
        auth: Auth,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            family_id: None,
        })
    }

    /// Build from validated configuration: URL, token, family and timeouts.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let auth = match &config.auth_token {
            Some(token) => Auth::Bearer(token.clone()),
            None => Auth::Anonymous,
        };

        let client = Self::with_timeouts(
            config.api_url.clone(),
            auth,
            config.request_timeout(),
            config.connect_timeout(),
        )?;

        Ok(match &config.family_id {
            Some(family_id) => client.with_family(family_id.clone()),
            None => client,
        })
    }

    /// Create client from environment (see `ClientConfig::from_env`).
    pub fn from_env() -> Result<Self> {
        let config = ClientConfig::from_env().context("Invalid client configuration")?;
        Self::from_config(&config)
    }

    /// Scope every request to `family_id`.
    pub fn with_family(mut self, family_id: String) -> Self {
        self.family_id = Some(family_id);
        self
    }

    pub fn family_id(&self) -> Option<&str> {
        self.family_id.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = match &self.auth {
            Auth::Bearer(token) => request.header("Authorization", format!("Bearer {}", token)),
            Auth::Anonymous => request,
        };
        match &self.family_id {
            Some(family_id) => request.header(FAMILY_ID_HEADER, family_id.as_str()),
            None => request,
        }
    }

    /// Send a JSON POST and fail with `ApiStatusError` on non-2xx.
    async fn send_json<B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response> {
        let url = self.build_url(path);
        let request = self.apply_auth(self.client.post(&url).json(body));

        let response = request.send().await.context("Failed to send request")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiStatusError {
                status: status.as_u16(),
                body: error_text,
            }
            .into());
        }

        Ok(response)
    }

    /// POST JSON body and deserialize response.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.send_json(path, body).await?;

        let body: T = response
            .json()
            .await
            .context("Failed to parse response as JSON")?;

        Ok(body)
    }

    /// POST JSON body and return the response as an untyped value.
    ///
    /// An empty body is returned as `Value::Null` and a body that is not JSON
    /// as `Value::String`; the status already decided success.
    pub async fn post_json_value<B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<serde_json::Value> {
        let response = self.send_json(path, body).await?;

        let text = response
            .text()
            .await
            .context("Failed to read response body")?;
        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }

        match serde_json::from_str(&text) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::debug!(error = %e, "Response body is not JSON, keeping it as text");
                Ok(serde_json::Value::String(text))
            }
        }
    }

    /// POST JSON body, ignoring whatever the server answers on success.
    pub async fn post_ignore_body<B: serde::Serialize>(&self, path: &str, body: &B) -> Result<()> {
        self.send_json(path, body).await?;
        Ok(())
    }
}

// Re-export the domain types the client speaks.
pub use famlynook_core::models::{
    ConfirmUploadBody, ContentRecord, LinkMediaBody, LinkTarget, PresignedUploadBody,
    ReleaseUploadBody, UploadGrant,
};
