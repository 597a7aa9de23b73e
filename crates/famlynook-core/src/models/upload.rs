use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::Validate;

use crate::constants::API_BASE;

/// Media the caller wants uploaded.
///
/// Only `source` is required; everything else is resolved from the file when
/// absent (see `famlynook_upload::source`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    /// Best-effort size hint in bytes
    pub file_size_bytes: Option<u64>,
    /// Local file holding the bytes
    pub source: PathBuf,
}

impl UploadRequest {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            file_name: None,
            content_type: None,
            file_size_bytes: None,
            source: source.into(),
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_file_size(mut self, file_size_bytes: u64) -> Self {
        self.file_size_bytes = Some(file_size_bytes);
        self
    }
}

/// Write credential issued by the Application Server for one upload.
///
/// Single-use: a grant belongs to exactly one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct UploadGrant {
    /// Time-limited URL accepting a PUT of the file bytes
    #[serde(rename = "presignedUrl")]
    #[validate(length(min = 1, message = "Grant is missing its presigned URL"))]
    pub presigned_url: String,
    /// Server-side correlation id for confirm/cancel
    #[serde(rename = "uploadId")]
    #[validate(length(min = 1, message = "Grant is missing its upload id"))]
    pub upload_id: String,
    /// Final storage key of the object
    #[serde(rename = "key")]
    #[validate(length(min = 1, message = "Grant is missing its object key"))]
    pub object_key: String,
    /// Read URL once the upload is complete
    #[serde(rename = "fileUrl")]
    pub public_url: String,
}

/// Kind of domain entity an upload can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Memory,
    Post,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Memory => "memory",
            EntityKind::Post => "post",
        }
    }

    fn collection(&self) -> &'static str {
        match self {
            EntityKind::Memory => "memories",
            EntityKind::Post => "posts",
        }
    }
}

/// Memory or post a confirmed upload should be linked to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkTarget {
    pub entity_kind: EntityKind,
    pub entity_id: String,
}

impl LinkTarget {
    pub fn memory(entity_id: impl Into<String>) -> Self {
        Self {
            entity_kind: EntityKind::Memory,
            entity_id: entity_id.into(),
        }
    }

    pub fn post(entity_id: impl Into<String>) -> Self {
        Self {
            entity_kind: EntityKind::Post,
            entity_id: entity_id.into(),
        }
    }

    /// Linking endpoint, e.g. `/api/memories/m1/media`. The id is
    /// percent-encoded so it always stays one path segment.
    pub fn media_path(&self) -> String {
        format!(
            "{}/{}/{}/media",
            API_BASE,
            self.entity_kind.collection(),
            urlencoding::encode(&self.entity_id)
        )
    }
}

/// Body of `POST /api/media/presigned-upload`
#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUploadBody {
    #[serde(rename = "filename")]
    #[validate(length(
        min = 1,
        max = 255,
        message = "Filename must be between 1 and 255 characters"
    ))]
    pub file_name: String,
    #[validate(length(
        min = 1,
        max = 255,
        message = "Content type must be between 1 and 255 characters"
    ))]
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

/// Body of `POST /api/media/confirm-upload`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmUploadBody {
    pub upload_id: String,
    pub key: String,
}

impl From<&UploadGrant> for ConfirmUploadBody {
    fn from(grant: &UploadGrant) -> Self {
        Self {
            upload_id: grant.upload_id.clone(),
            key: grant.object_key.clone(),
        }
    }
}

/// Body of `POST /api/media/cancel-upload`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseUploadBody {
    pub upload_id: String,
    pub key: String,
}

impl From<&UploadGrant> for ReleaseUploadBody {
    fn from(grant: &UploadGrant) -> Self {
        Self {
            upload_id: grant.upload_id.clone(),
            key: grant.object_key.clone(),
        }
    }
}

/// Body of the memory/post media linking endpoints
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkMediaBody {
    pub upload_id: String,
    pub key: String,
    pub file_url: String,
    pub content_type: String,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_id: Option<String>,
}
