use serde::{Deserialize, Serialize};

/// The default personality choice.
pub const DEFAULT_PERSONALITY: &str = "Default";

/// User preferences stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Assistant personality.
    pub personality: String,
    /// Free-text instructions appended to every conversation.
    pub custom_instructions: String,
    /// What the assistant should call the user.
    pub nickname: String,
    /// The user's occupation.
    pub occupation: String,
    /// The user's interests.
    pub interests: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            personality: DEFAULT_PERSONALITY.to_string(),
            custom_instructions: String::new(),
            nickname: String::new(),
            occupation: String::new(),
            interests: String::new(),
        }
    }
}

impl Settings {
    /// Returns a copy with free-text fields trimmed.  The personality is a
    /// fixed choice and is left untouched.
    pub fn trimmed(&self) -> Self {
        Self {
            personality: self.personality.clone(),
            custom_instructions: self.custom_instructions.trim().to_string(),
            nickname: self.nickname.trim().to_string(),
            occupation: self.occupation.trim().to_string(),
            interests: self.interests.trim().to_string(),
        }
    }

    /// Replaces an empty personality with the default.
    pub fn normalized(mut self) -> Self {
        if self.personality.is_empty() {
            self.personality = DEFAULT_PERSONALITY.to_string();
        }
        self
    }
}

/// Response body of `POST /save_settings`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveStatus {
    /// `"success"` when the record was stored.
    #[serde(default)]
    pub status: Option<String>,
}

impl SaveStatus {
    /// Returns true if the backend reported success.
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }
}
