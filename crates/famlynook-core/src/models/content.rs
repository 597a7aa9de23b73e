use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::UploadGrant;

/// Content record returned by the server after linking an upload to a
/// memory or post. The record belongs to the server: ids may be strings or
/// numbers, any field may be missing, and fields the client does not know
/// about are kept in `extra` and handed back to the caller untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    #[serde(
        default,
        alias = "contentId",
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub content_id: Option<String>,
    #[serde(
        default,
        alias = "filePath",
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub file_path: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ContentRecord {
    /// Interpret a successful linking response of any shape.
    ///
    /// A JSON object becomes a record; any other non-null body is kept under
    /// `extra["body"]`.
    pub fn from_response(body: serde_json::Value) -> Self {
        match body {
            serde_json::Value::Object(map) => {
                let raw = serde_json::Value::Object(map);
                match serde_json::from_value(raw.clone()) {
                    Ok(record) => record,
                    Err(_) => Self::wrapping(raw),
                }
            }
            serde_json::Value::Null => Self::default(),
            other => Self::wrapping(other),
        }
    }

    fn wrapping(body: serde_json::Value) -> Self {
        let mut extra = serde_json::Map::new();
        extra.insert("body".to_string(), body);
        Self {
            extra,
            ..Self::default()
        }
    }
}

/// Strings as-is, numbers and booleans rendered, `null` as `None`.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Result of a session that reached `Linked`.
#[derive(Debug, Clone, Serialize)]
pub struct CompletedUpload {
    pub session_id: Uuid,
    pub grant: UploadGrant,
    /// Opaque confirmation payload (`null` when the server sent no body)
    pub confirmation: serde_json::Value,
    pub content: Option<ContentRecord>,
}
