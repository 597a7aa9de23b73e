//! API paths and client defaults

/// API base path prefix
pub const API_BASE: &str = "/api";

pub const PRESIGNED_UPLOAD_PATH: &str = "/api/media/presigned-upload";
pub const CONFIRM_UPLOAD_PATH: &str = "/api/media/confirm-upload";
pub const CANCEL_UPLOAD_PATH: &str = "/api/media/cancel-upload";

/// Header carrying the selected family on every Application Server call.
pub const FAMILY_ID_HEADER: &str = "X-Family-Id";

/// Fallback MIME type when nothing better can be determined.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Prefix of generated file names (`file-<unix-millis>`).
pub const GENERATED_FILE_PREFIX: &str = "file";

pub const DEFAULT_API_URL: &str = "http://localhost:3000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_TRANSFER_TIMEOUT_SECS: u64 = 30 * 60;
