use serde::{Deserialize, Serialize};

use super::ServerId;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// The person chatting.
    #[serde(rename = "user")]
    User,
    /// The assistant.  The backend stores this role as `model`.
    #[serde(rename = "model", alias = "assistant")]
    Assistant,
}

/// Metadata about a file attached to a user message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Original file name.
    pub filename: String,
    /// MIME type reported at upload.
    #[serde(rename = "type", default)]
    pub mime_type: String,
}

impl FileInfo {
    /// Returns true if the attachment is an image.
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// A message as returned by `GET /get_chat/:id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Author role.
    pub role: Role,
    /// Text parts; only the first is displayed.
    #[serde(default)]
    pub parts: Vec<String>,
    /// Server-assigned id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ServerId>,
    /// Attached file, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileInfo>,
    /// Inline image source (`data:` URL) for image attachments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl StoredMessage {
    /// Returns the displayed text of the message.
    pub fn text(&self) -> &str {
        self.parts.first().map(String::as_str).unwrap_or("")
    }
}
