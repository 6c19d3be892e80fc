//! Headless view model of the chat log.
//!
//! A front end draws [`ChatView`] however it likes; the session only mutates
//! it.

use rand::Rng;

use crate::markdown::code_blocks;
use crate::types::{MessageId, Role};

/// Prompts shown in the welcome state.
pub const PROMPT_SUGGESTIONS: &[&str] = &[
    "What are you working on?",
    "Ready when you are.",
    "What’s on the agenda today?",
    "Explain a complex topic simply.",
    "Let's brainstorm some ideas.",
    "Help me write a Python script.",
    "What's a fun fact you know?",
    "How can I be more productive?",
];

/// Pick a welcome prompt at random.
pub fn random_prompt() -> &'static str {
    random_prompt_with(&mut rand::thread_rng())
}

/// Pick a welcome prompt using `rng`.
pub fn random_prompt_with<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    PROMPT_SUGGESTIONS[rng.gen_range(0..PROMPT_SUGGESTIONS.len())]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
}

impl From<Role> for Sender {
    fn from(role: Role) -> Self {
        match role {
            Role::User => Sender::User,
            Role::Assistant => Sender::Assistant,
        }
    }
}

/// A copy button attached to a settled assistant message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Affordance {
    /// Copies the contents of the `index`th fenced code block.
    CopyCode { index: usize, code: String },
    /// Copies the whole message.
    CopyMessage { text: String },
}

impl Affordance {
    /// The text placed on the clipboard.
    pub fn clipboard_text(&self) -> &str {
        match self {
            Affordance::CopyCode { code, .. } => code,
            Affordance::CopyMessage { text } => text,
        }
    }
}

/// One `CopyCode` per fenced block, or a single `CopyMessage` when the text
/// has no fences.
pub fn affordances_for(text: &str) -> Vec<Affordance> {
    let blocks = code_blocks(text);
    if blocks.is_empty() {
        return vec![Affordance::CopyMessage {
            text: text.to_string(),
        }];
    }
    blocks
        .into_iter()
        .enumerate()
        .map(|(index, block)| Affordance::CopyCode {
            index,
            code: block.code,
        })
        .collect()
}

/// A file shown on a user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileView {
    pub filename: String,
    pub mime_type: String,
    /// Inline preview for images.
    pub image: Option<String>,
}

/// A message as displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub id: MessageId,
    pub sender: Sender,
    /// Source text.
    pub text: String,
    /// Display text; includes the cursor while streaming.
    pub rendered: String,
    pub file: Option<FileView>,
    pub affordances: Vec<Affordance>,
    /// The most recent settled assistant reply.
    pub latest: bool,
    pub streaming: bool,
}

impl RenderedMessage {
    pub fn new(id: MessageId, sender: Sender, text: impl Into<String>, rendered: impl Into<String>) -> Self {
        Self {
            id,
            sender,
            text: text.into(),
            rendered: rendered.into(),
            file: None,
            affordances: Vec::new(),
            latest: false,
            streaming: false,
        }
    }

    pub fn with_file(mut self, file: Option<FileView>) -> Self {
        self.file = file;
        self
    }

    /// User messages with a server id can be edited.
    pub fn is_editable(&self) -> bool {
        self.sender == Sender::User && self.id.server_id().is_some()
    }
}

/// The chat log, or the welcome state when it is empty.
#[derive(Debug, Clone, Default)]
pub struct ChatView {
    messages: Vec<RenderedMessage>,
    welcome: Option<&'static str>,
}

impl ChatView {
    /// An empty log showing the welcome state.
    pub fn welcome(prompt: &'static str) -> Self {
        Self {
            messages: Vec::new(),
            welcome: Some(prompt),
        }
    }

    /// Clear the log and show the welcome state.
    pub fn show_welcome(&mut self, prompt: &'static str) {
        self.messages.clear();
        self.welcome = Some(prompt);
    }

    /// Clear the log without showing the welcome state.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.welcome = None;
    }

    pub fn is_welcome(&self) -> bool {
        self.welcome.is_some()
    }

    pub fn welcome_prompt(&self) -> Option<&'static str> {
        self.welcome
    }

    pub fn messages(&self) -> &[RenderedMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&RenderedMessage> {
        self.messages.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut RenderedMessage> {
        self.messages.get_mut(index)
    }

    /// Append a message, leaving the welcome state.  Returns its index.
    pub fn push(&mut self, message: RenderedMessage) -> usize {
        self.welcome = None;
        self.messages.push(message);
        self.messages.len() - 1
    }

    /// Index of the first message with `id`.
    pub fn find(&self, id: &MessageId) -> Option<usize> {
        self.messages.iter().position(|m| &m.id == id)
    }

    /// Replace the placeholder id of the user message at `index` with the id
    /// the server assigned.  Returns false if that message has no placeholder.
    pub fn assign_id(&mut self, index: usize, to: MessageId) -> bool {
        match self.messages.get_mut(index) {
            Some(message) if message.id == MessageId::TempUser => {
                message.id = to;
                true
            }
            _ => false,
        }
    }

    /// Remove every message after `index`.
    pub fn truncate_after(&mut self, index: usize) {
        self.messages.truncate(index + 1);
    }

    /// Flag the message at `index` as latest and clear the flag elsewhere.
    pub fn mark_latest(&mut self, index: usize) {
        for (i, message) in self.messages.iter_mut().enumerate() {
            message.latest = i == index;
        }
    }

    /// Index of the last assistant message.
    pub fn last_assistant(&self) -> Option<usize> {
        self.messages
            .iter()
            .rposition(|m| m.sender == Sender::Assistant)
    }
}
