//! Resolution of an `UploadRequest` against the local file.
//!
//! The source must open as a regular file. Everything else is best-effort:
//! name, content type and size fall back to derived or default values and an
//! unmeasurable size never aborts the upload.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use famlynook_core::constants::{DEFAULT_CONTENT_TYPE, GENERATED_FILE_PREFIX};
use famlynook_core::UploadRequest;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

/// Bytes read from the head of the file for magic-byte detection.
const SNIFF_LEN: usize = 8192;

/// An `UploadRequest` with every field resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreparedUpload {
    pub file_name: String,
    pub content_type: String,
    /// Size reported to the server: measured, else the caller's hint
    pub file_size: Option<u64>,
    /// Measured size of the local file
    pub content_length: Option<u64>,
    pub source: PathBuf,
}

impl PreparedUpload {
    /// Total used for progress computation.
    pub fn total_bytes(&self) -> Option<u64> {
        self.content_length.or(self.file_size)
    }
}

/// Open the source and resolve name, content type and size.
pub async fn prepare(request: &UploadRequest) -> Result<PreparedUpload> {
    let mut file = tokio::fs::File::open(&request.source)
        .await
        .with_context(|| format!("Source file is not readable: {}", request.source.display()))?;

    let metadata = match file.metadata().await {
        Ok(metadata) => Some(metadata),
        Err(e) => {
            tracing::warn!(
                source = %request.source.display(),
                error = %e,
                "Could not stat upload source, continuing with unknown size"
            );
            None
        }
    };

    if let Some(metadata) = &metadata {
        if !metadata.is_file() {
            return Err(anyhow::anyhow!(
                "Source is not a regular file: {}",
                request.source.display()
            ));
        }
    }

    let content_length = metadata.as_ref().map(|m| m.len());
    let file_size = content_length.or(request.file_size_bytes);
    let file_name = resolve_file_name(request, Utc::now());

    let content_type = match non_empty(request.content_type.as_deref()) {
        Some(content_type) => content_type.to_string(),
        None => match content_type_for_path(Path::new(&file_name))
            .or_else(|| content_type_for_path(&request.source))
        {
            Some(content_type) => content_type.to_string(),
            None => sniff_content_type(&mut file).await,
        },
    };

    tracing::debug!(
        file_name = %file_name,
        content_type = %content_type,
        file_size = ?file_size,
        "Resolved upload source"
    );

    Ok(PreparedUpload {
        file_name,
        content_type,
        file_size,
        content_length,
        source: request.source.clone(),
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Explicit name, else the source's base name, else `file-<unix-millis>`.
pub fn resolve_file_name(request: &UploadRequest, now: DateTime<Utc>) -> String {
    if let Some(name) = non_empty(request.file_name.as_deref()) {
        return name.to_string();
    }

    request
        .source
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| non_empty(Some(n)))
        .map(str::to_string)
        .unwrap_or_else(|| generated_file_name(now))
}

pub fn generated_file_name(now: DateTime<Utc>) -> String {
    format!("{}-{}", GENERATED_FILE_PREFIX, now.timestamp_millis())
}

/// MIME type implied by the file extension, for formats family members
/// typically share from a phone.
pub fn content_type_for_path(path: &Path) -> Option<&'static str> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())?;

    let content_type = match extension.as_str() {
        // Images
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "avif" => "image/avif",
        "bmp" => "image/bmp",
        // Videos
        "mp4" => "video/mp4",
        "m4v" => "video/x-m4v",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "3gp" => "video/3gpp",
        "mkv" => "video/x-matroska",
        // Audio
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "aac" => "audio/aac",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        // Documents
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        _ => return None,
    };

    Some(content_type)
}

/// Detect the type from magic bytes; falls back to `application/octet-stream`.
async fn sniff_content_type(file: &mut tokio::fs::File) -> String {
    let mut head = vec![0u8; SNIFF_LEN];
    let mut filled = 0;
    while filled < head.len() {
        match file.read(&mut head[filled..]).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) => {
                tracing::debug!(error = %e, "Could not read file head for type detection");
                break;
            }
        }
    }

    infer::get(&head[..filled])
        .map(|kind| kind.mime_type().to_string())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
}
