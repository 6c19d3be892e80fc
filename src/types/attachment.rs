use std::path::Path;

use base64::Engine;

use crate::error::{Error, Result};

use super::FileInfo;

/// A file picked in the compose area, held in memory until it is sent.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name sent as the multipart file name.
    pub filename: String,
    /// MIME type guessed from the extension.
    pub mime_type: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Attachment {
    /// Create an attachment from bytes already in memory.
    pub fn new(
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read an attachment from disk, guessing its MIME type from the extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                Error::validation(
                    format!("not a file path: {}", path.display()),
                    Some("path".to_string()),
                )
            })?
            .to_string();
        let bytes = std::fs::read(path)
            .map_err(|err| Error::io(format!("could not read {}", path.display()), err))?;
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();
        Ok(Self {
            filename,
            mime_type,
            bytes,
        })
    }

    /// Returns true if the attachment is an image.
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    /// The inline `data:` URL used to preview images.  `None` for other files.
    pub fn data_url(&self) -> Option<String> {
        if !self.is_image() {
            return None;
        }
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.bytes);
        Some(format!("data:{};base64,{}", self.mime_type, encoded))
    }

    /// The file reference shown on the optimistic user message.
    pub fn file_info(&self) -> FileInfo {
        FileInfo {
            filename: self.filename.clone(),
            mime_type: self.mime_type.clone(),
        }
    }
}
