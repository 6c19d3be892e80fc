//! The voice translation widget.
//!
//! Audio comes from an [`AudioSource`].  While recording, chunks are pulled
//! with [`VoiceTranslator::pump`] (or fed with [`VoiceTranslator::push_chunk`]);
//! stopping uploads the concatenated recording and exposes the translated
//! speech.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};

use crate::client::Backend;
use crate::error::{Error, Result};
use crate::types::TranslatedAudio;

pub const LABEL_START: &str = "Start Recording";
pub const LABEL_STOP: &str = "Stop Recording";
pub const LABEL_UNSUPPORTED: &str = "Voice not supported";
pub const STATUS_PROCESSING: &str = "Processing... This may take up to a minute.";
pub const MICROPHONE_DENIED: &str = "Could not access microphone. Please grant permission.";

/// Something that can record audio.
#[async_trait]
pub trait AudioSource: Send {
    /// False when no capture device exists at all.
    fn is_supported(&self) -> bool {
        true
    }

    /// Acquire the device.  Fails if access is denied.
    async fn open(&mut self) -> Result<Box<dyn AudioCapture>>;
}

/// An open recording.
#[async_trait]
pub trait AudioCapture: Send {
    /// The next chunk of audio, or `None` when the device has nothing more.
    async fn read_chunk(&mut self) -> Result<Option<Bytes>>;

    /// Release the device.
    fn release(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslatorState {
    Idle,
    Recording,
    Uploading,
    Unsupported,
}

pub struct VoiceTranslator {
    source: Box<dyn AudioSource>,
    capture: Option<Box<dyn AudioCapture>>,
    chunks: Vec<Bytes>,
    state: TranslatorState,
    language: String,
    error: Option<String>,
    result: Option<TranslatedAudio>,
}

impl VoiceTranslator {
    pub fn new(source: Box<dyn AudioSource>, language: impl Into<String>) -> Self {
        let state = if source.is_supported() {
            TranslatorState::Idle
        } else {
            TranslatorState::Unsupported
        };
        Self {
            source,
            capture: None,
            chunks: Vec::new(),
            state,
            language: language.into(),
            error: None,
            result: None,
        }
    }

    pub fn state(&self) -> TranslatorState {
        self.state
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn set_language(&mut self, language: impl Into<String>) {
        self.language = language.into();
    }

    pub fn button_label(&self) -> &'static str {
        match self.state {
            TranslatorState::Recording => LABEL_STOP,
            TranslatorState::Unsupported => LABEL_UNSUPPORTED,
            TranslatorState::Idle | TranslatorState::Uploading => LABEL_START,
        }
    }

    pub fn button_enabled(&self) -> bool {
        matches!(
            self.state,
            TranslatorState::Idle | TranslatorState::Recording
        )
    }

    /// The progress line shown while uploading.
    pub fn status_text(&self) -> Option<&'static str> {
        (self.state == TranslatorState::Uploading).then_some(STATUS_PROCESSING)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn result(&self) -> Option<&TranslatedAudio> {
        self.result.as_ref()
    }

    /// Start or stop recording.  Stopping uploads the recording.
    pub async fn toggle(&mut self, backend: &dyn Backend) -> Result<()> {
        match self.state {
            TranslatorState::Idle => self.start().await,
            TranslatorState::Recording => self.stop_and_upload(backend).await,
            TranslatorState::Uploading | TranslatorState::Unsupported => Ok(()),
        }
    }

    async fn start(&mut self) -> Result<()> {
        match self.source.open().await {
            Ok(capture) => {
                self.capture = Some(capture);
                self.chunks.clear();
                self.result = None;
                self.error = None;
                self.state = TranslatorState::Recording;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not open audio source");
                self.error = Some(MICROPHONE_DENIED.to_string());
                Err(err)
            }
        }
    }

    /// Read one chunk from the device into the recording.  Returns false when
    /// not recording or the device has nothing more.
    pub async fn pump(&mut self) -> Result<bool> {
        let Some(capture) = self.capture.as_mut() else {
            return Ok(false);
        };
        match capture.read_chunk().await? {
            Some(chunk) => {
                self.chunks.push(chunk);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Add a chunk delivered by the device.  Ignored unless recording.
    pub fn push_chunk(&mut self, chunk: Bytes) {
        if self.state == TranslatorState::Recording {
            self.chunks.push(chunk);
        }
    }

    async fn stop_and_upload(&mut self, backend: &dyn Backend) -> Result<()> {
        if let Some(mut capture) = self.capture.take() {
            capture.release();
        }
        let mut recording = BytesMut::new();
        for chunk in self.chunks.drain(..) {
            recording.extend_from_slice(&chunk);
        }

        self.state = TranslatorState::Uploading;
        let result = backend
            .translate_voice(recording.freeze(), &self.language)
            .await;
        self.state = TranslatorState::Idle;
        match result {
            Ok(audio) => {
                self.error = None;
                self.result = Some(audio);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "translation failed");
                self.error = Some(format!("Translation failed: {}", err.message()));
                self.result = None;
                Err(err)
            }
        }
    }
}

/// Plays back a WAV file as if it were being recorded.
#[derive(Debug, Clone)]
pub struct FileAudioSource {
    path: PathBuf,
    chunk_size: usize,
}

impl FileAudioSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            chunk_size: 16 * 1024,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

#[async_trait]
impl AudioSource for FileAudioSource {
    async fn open(&mut self) -> Result<Box<dyn AudioCapture>> {
        let data = tokio::fs::read(&self.path).await.map_err(|err| {
            Error::device(format!("could not open {}: {err}", self.path.display()))
        })?;
        Ok(Box::new(FileCapture {
            data: Bytes::from(data),
            chunk_size: self.chunk_size,
        }))
    }
}

struct FileCapture {
    data: Bytes,
    chunk_size: usize,
}

#[async_trait]
impl AudioCapture for FileCapture {
    async fn read_chunk(&mut self) -> Result<Option<Bytes>> {
        if self.data.is_empty() {
            return Ok(None);
        }
        let len = self.chunk_size.min(self.data.len());
        Ok(Some(self.data.split_to(len)))
    }

    fn release(&mut self) {
        self.data.clear();
    }
}
