use std::path::Path;

use bytes::Bytes;

use crate::error::{Error, Result};

/// Audio returned by `POST /translate_voice`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedAudio {
    /// The audio payload.
    pub bytes: Bytes,
    /// The `Content-Type` reported by the server.
    pub content_type: String,
}

impl TranslatedAudio {
    /// Create a new translated audio payload.
    pub fn new(bytes: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }

    /// The conventional file extension for the content type.
    pub fn extension(&self) -> &'static str {
        match self.content_type.split(';').next().map(str::trim) {
            Some("audio/mpeg") | Some("audio/mp3") => "mp3",
            Some("audio/wav") | Some("audio/x-wav") | Some("audio/wave") => "wav",
            Some("audio/ogg") => "ogg",
            Some("audio/webm") => "webm",
            _ => "bin",
        }
    }

    /// Write the audio to `path`.
    pub async fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        tokio::fs::write(path, &self.bytes)
            .await
            .map_err(|err| Error::io(format!("could not write {}", path.display()), err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_follows_content_type() {
        assert_eq!(TranslatedAudio::new(vec![], "audio/mpeg").extension(), "mp3");
        assert_eq!(
            TranslatedAudio::new(vec![], "audio/wav; charset=binary").extension(),
            "wav"
        );
        assert_eq!(
            TranslatedAudio::new(vec![], "application/octet-stream").extension(),
            "bin"
        );
    }

    #[tokio::test]
    async fn save_writes_bytes() {
        let path = std::env::temp_dir().join(format!("luna-audio-{}.mp3", std::process::id()));
        let audio = TranslatedAudio::new(vec![1u8, 2, 3], "audio/mpeg");
        audio.save_to(&path).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), vec![1u8, 2, 3]);
        std::fs::remove_file(&path).unwrap();
    }
}
