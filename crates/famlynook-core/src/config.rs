//! Configuration module
//!
//! Client settings for talking to the Application Server and the storage
//! service. The selected family is part of the configuration so that every
//! upload carries it explicitly instead of reading it from ambient state.

use std::env;
use std::time::Duration;

use crate::constants::{
    DEFAULT_API_URL, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_TRANSFER_TIMEOUT_SECS,
};

/// Upload client configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Application Server base URL, without trailing slash
    pub api_url: String,
    /// Bearer token; `None` sends anonymous requests
    pub auth_token: Option<String>,
    /// Family the uploads belong to
    pub family_id: Option<String>,
    /// Timeout for metadata calls (grant, confirm, link, cancel)
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Timeout for the whole storage PUT
    pub transfer_timeout_secs: u64,
    /// Cap on concurrently running sessions of one batch
    pub max_concurrent_uploads: Option<usize>,
    pub environment: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            auth_token: None,
            family_id: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            transfer_timeout_secs: DEFAULT_TRANSFER_TIMEOUT_SECS,
            max_concurrent_uploads: None,
            environment: "development".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load from the process environment (and `.env` when present).
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_url = non_empty("FAMLYNOOK_API_URL")
            .or_else(|| non_empty("API_URL"))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let environment = non_empty("ENVIRONMENT")
            .or_else(|| non_empty("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let max_concurrent_uploads = match non_empty("FAMLYNOOK_MAX_CONCURRENT_UPLOADS") {
            Some(raw) => Some(raw.trim().parse::<usize>().map_err(|e| {
                anyhow::anyhow!("FAMLYNOOK_MAX_CONCURRENT_UPLOADS must be a number: {}", e)
            })?),
            None => None,
        };

        let config = Self {
            api_url,
            auth_token: non_empty("FAMLYNOOK_AUTH_TOKEN"),
            family_id: non_empty("FAMLYNOOK_FAMILY_ID"),
            request_timeout_secs: parse_secs(
                non_empty("FAMLYNOOK_REQUEST_TIMEOUT_SECS"),
                DEFAULT_REQUEST_TIMEOUT_SECS,
            ),
            connect_timeout_secs: parse_secs(
                non_empty("FAMLYNOOK_CONNECT_TIMEOUT_SECS"),
                DEFAULT_CONNECT_TIMEOUT_SECS,
            ),
            transfer_timeout_secs: parse_secs(
                non_empty("FAMLYNOOK_TRANSFER_TIMEOUT_SECS"),
                DEFAULT_TRANSFER_TIMEOUT_SECS,
            ),
            max_concurrent_uploads,
            environment,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "FAMLYNOOK_API_URL must start with http:// or https://"
            ));
        }

        if self.request_timeout_secs == 0
            || self.connect_timeout_secs == 0
            || self.transfer_timeout_secs == 0
        {
            return Err(anyhow::anyhow!("Timeouts must be greater than zero"));
        }

        if self.max_concurrent_uploads == Some(0) {
            return Err(anyhow::anyhow!(
                "FAMLYNOOK_MAX_CONCURRENT_UPLOADS must be at least 1"
            ));
        }

        if self.is_production() {
            if !self.api_url.starts_with("https://") {
                return Err(anyhow::anyhow!(
                    "FAMLYNOOK_API_URL must use https in production"
                ));
            }
            if self.auth_token.is_none() {
                return Err(anyhow::anyhow!(
                    "FAMLYNOOK_AUTH_TOKEN must be set in production"
                ));
            }
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.transfer_timeout_secs)
    }
}

fn parse_secs(raw: Option<String>, default: u64) -> u64 {
    match raw {
        Some(value) => value.trim().parse::<u64>().unwrap_or_else(|_| {
            tracing::warn!(value = %value, default, "Invalid timeout value, using default");
            default
        }),
        None => default,
    }
}
