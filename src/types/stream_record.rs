use serde::{Deserialize, Serialize};

use super::ServerId;

/// One `data:` record of a streamed chat or edit response.
///
/// A record may carry several fields at once; consumers handle them in the
/// order `error`, `chat_id`, `chunk`, `is_new_chat`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamRecord {
    /// A server-side failure.  Terminates the exchange.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Id of the conversation the exchange belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    /// Id assigned to the user message that started the exchange.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_message_id: Option<ServerId>,
    /// A piece of assistant text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk: Option<String>,
    /// Set once when the exchange created a brand-new conversation.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_new_chat: bool,
}

impl StreamRecord {
    /// A record carrying only a text chunk.
    pub fn chunk(text: impl Into<String>) -> Self {
        Self {
            chunk: Some(text.into()),
            ..Self::default()
        }
    }

    /// A record carrying only an error.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    /// A record announcing the conversation and user-message ids.
    pub fn ids(chat_id: impl Into<String>, user_message_id: ServerId) -> Self {
        Self {
            chat_id: Some(chat_id.into()),
            user_message_id: Some(user_message_id),
            ..Self::default()
        }
    }

    /// A record flagging a newly created conversation.
    pub fn new_chat() -> Self {
        Self {
            is_new_chat: true,
            ..Self::default()
        }
    }

    /// The error message, ignoring empty strings.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.is_empty())
    }

    /// The conversation id, ignoring empty strings.
    pub fn chat_id(&self) -> Option<&str> {
        self.chat_id.as_deref().filter(|id| !id.is_empty())
    }

    /// The text chunk, ignoring empty strings.
    pub fn text(&self) -> Option<&str> {
        self.chunk.as_deref().filter(|c| !c.is_empty())
    }
}
