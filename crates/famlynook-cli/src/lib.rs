//! Helpers shared by the `famlynook` binary.

use famlynook_core::models::LinkTarget;
use famlynook_core::ErrorMetadata;
use famlynook_upload::{BatchItemResult, BatchReport};
use serde::Serialize;
use std::path::PathBuf;

/// Memory wins over post when both are given; clap rejects that anyway.
pub fn link_target(memory: Option<String>, post: Option<String>) -> Option<LinkTarget> {
    memory
        .map(LinkTarget::memory)
        .or_else(|| post.map(LinkTarget::post))
}

#[derive(Debug, Serialize)]
pub struct ItemReport {
    pub index: usize,
    pub file: String,
    pub session_id: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ItemError>,
}

#[derive(Debug, Serialize)]
pub struct ItemError {
    pub code: &'static str,
    pub message: String,
    pub details: String,
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub succeeded: usize,
    pub failed: usize,
    pub canceled: usize,
    pub items: Vec<ItemReport>,
}

fn item_report(item: &BatchItemResult, file: String) -> ItemReport {
    let mut report = ItemReport {
        index: item.index,
        file,
        session_id: item.session_id.to_string(),
        state: item.state.to_string(),
        upload_id: None,
        file_url: None,
        content_id: None,
        error: None,
    };

    match &item.result {
        Ok(completed) => {
            report.upload_id = Some(completed.grant.upload_id.clone());
            report.file_url = Some(completed.grant.public_url.clone());
            report.content_id = completed.content.as_ref().and_then(|c| c.content_id.clone());
        }
        Err(err) => {
            report.error = Some(ItemError {
                code: err.error_code(),
                message: err.client_message(),
                details: err.detailed_message(),
                recoverable: err.is_recoverable(),
                suggested_action: err.suggested_action(),
            });
        }
    }

    report
}

/// Printable summary of a batch; `files` are the inputs in batch order.
pub fn run_report(report: &BatchReport, files: &[PathBuf]) -> RunReport {
    RunReport {
        succeeded: report.succeeded(),
        failed: report.failed(),
        canceled: report.canceled(),
        items: report
            .items
            .iter()
            .map(|item| {
                let file = files
                    .get(item.index)
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                item_report(item, file)
            })
            .collect(),
    }
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
