//! The compose area: the text being typed and the attached file.

use crate::types::Attachment;

/// A key pressed in the compose area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeKey {
    Enter,
    Backspace,
    Char(char),
}

/// What a key press did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeAction {
    /// The compose contents should be sent.
    Submit,
    /// The text changed, or nothing happened.
    Edited,
}

/// What is about to be sent.
#[derive(Debug, Clone, Default)]
pub struct ComposeState {
    text: String,
    attachment: Option<Attachment>,
}

impl ComposeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    /// Attach a file, replacing any previous attachment.
    pub fn attach(&mut self, attachment: Attachment) {
        self.attachment = Some(attachment);
    }

    /// Remove the attachment.
    pub fn detach(&mut self) -> Option<Attachment> {
        self.attachment.take()
    }

    /// Handle a key press.  Enter submits unless shift is held, in which case
    /// it inserts a newline.
    pub fn key(&mut self, key: ComposeKey, shift: bool) -> ComposeAction {
        match key {
            ComposeKey::Enter if !shift => return ComposeAction::Submit,
            ComposeKey::Enter => self.text.push('\n'),
            ComposeKey::Backspace => {
                self.text.pop();
            }
            ComposeKey::Char(c) => self.text.push(c),
        }
        ComposeAction::Edited
    }

    /// True if submitting now would send nothing.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty() && self.attachment.is_none()
    }

    /// Empty the compose area and return the trimmed text and the attachment.
    pub fn take(&mut self) -> (String, Option<Attachment>) {
        let text = std::mem::take(&mut self.text).trim().to_string();
        (text, self.attachment.take())
    }
}
