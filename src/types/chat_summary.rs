use serde::{Deserialize, Serialize};

fn untitled() -> String {
    "Untitled Chat".to_string()
}

/// One entry of the conversation list returned by `GET /history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummary {
    /// Conversation id.
    pub id: String,
    /// Display title.
    #[serde(default = "untitled")]
    pub title: String,
    /// Whether the conversation is pinned to the top of the list.
    #[serde(default)]
    pub pinned: bool,
    /// Last modification time in milliseconds since the Unix epoch.
    #[serde(default)]
    pub last_updated: i64,
}

impl ChatSummary {
    /// Create a new summary.
    pub fn new(id: impl Into<String>, title: impl Into<String>, pinned: bool) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            pinned,
            last_updated: 0,
        }
    }

    /// Set the last-updated timestamp.
    pub fn with_last_updated(mut self, last_updated: i64) -> Self {
        self.last_updated = last_updated;
        self
    }

    /// Format the last-updated timestamp as RFC 3339, if it is set and valid.
    pub fn last_updated_rfc3339(&self) -> Option<String> {
        if self.last_updated <= 0 {
            return None;
        }
        let nanos = i128::from(self.last_updated) * 1_000_000;
        let datetime = time::OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()?;
        datetime
            .format(&time::format_description::well_known::Rfc3339)
            .ok()
    }
}
