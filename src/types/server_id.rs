use std::fmt;

use serde::{Deserialize, Serialize};

/// An identifier assigned by the backend.
///
/// The backend stamps messages with millisecond timestamps, so ids usually
/// arrive as JSON integers; conversation ids are UUID strings.  The original
/// JSON type is preserved so the id can be echoed back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerId {
    /// An integer id.
    Number(i64),
    /// A string id.
    Text(String),
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerId::Number(n) => write!(f, "{n}"),
            ServerId::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for ServerId {
    fn from(value: i64) -> Self {
        ServerId::Number(value)
    }
}

impl From<&str> for ServerId {
    fn from(value: &str) -> Self {
        ServerId::Text(value.to_string())
    }
}

/// The identity of a rendered message.
///
/// Messages appended optimistically carry a placeholder until the stream
/// delivers the server-assigned id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageId {
    /// Placeholder for the user message of an in-flight exchange.
    TempUser,
    /// Placeholder for the assistant message of an in-flight exchange.
    TempAssistant,
    /// A locally generated error bubble; never sent to the server.
    Error,
    /// An id assigned by the server.
    Assigned(ServerId),
}

impl MessageId {
    /// Returns true for the placeholder variants.
    pub fn is_provisional(&self) -> bool {
        matches!(self, MessageId::TempUser | MessageId::TempAssistant)
    }

    /// Returns the server id, if one has been assigned.
    pub fn server_id(&self) -> Option<&ServerId> {
        match self {
            MessageId::Assigned(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::TempUser => write!(f, "temp-user-id"),
            MessageId::TempAssistant => write!(f, "temp-luna-id"),
            MessageId::Error => write!(f, "error-id"),
            MessageId::Assigned(id) => write!(f, "{id}"),
        }
    }
}
