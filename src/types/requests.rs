use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::{Attachment, ServerId};

/// Body of `POST /session_login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionLoginRequest {
    /// Identity token issued by the provider.
    #[serde(rename = "idToken")]
    pub id_token: String,
}

/// A new user turn for `POST /chat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    /// The trimmed compose text.  May be empty when a file is attached.
    pub message: String,
    /// The active conversation, if any.
    pub chat_id: Option<String>,
    /// The attached file, if any.
    pub file: Option<Attachment>,
}

impl ChatRequest {
    /// Create a request for a message with no conversation and no file.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            chat_id: None,
            file: None,
        }
    }

    /// Continue an existing conversation.
    pub fn with_chat_id(mut self, chat_id: impl Into<String>) -> Self {
        self.chat_id = Some(chat_id.into());
        self
    }

    /// Attach a file.
    pub fn with_file(mut self, file: Attachment) -> Self {
        self.file = Some(file);
        self
    }

    /// Build the multipart body.  `chat_id` and `file` parts are only present
    /// when set.
    pub fn into_form(self) -> Result<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new().text("message", self.message);
        if let Some(chat_id) = self.chat_id {
            form = form.text("chat_id", chat_id);
        }
        if let Some(file) = self.file {
            let part = reqwest::multipart::Part::bytes(file.bytes)
                .file_name(file.filename)
                .mime_str(&file.mime_type)?;
            form = form.part("file", part);
        }
        Ok(form)
    }
}

/// Body of `POST /edit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRequest {
    /// Conversation holding the message.
    pub chat_id: String,
    /// Server id of the edited user message, echoed back as received.
    pub message_id: ServerId,
    /// Replacement text.
    pub new_text: String,
}

/// Body of `POST /generate_title`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleRequest {
    pub chat_id: String,
}

/// Response of `POST /generate_title`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub title: Option<String>,
}

impl TitleResponse {
    /// The generated title, when generation succeeded.
    pub fn generated_title(&self) -> Option<&str> {
        if self.success {
            self.title.as_deref().filter(|t| !t.is_empty())
        } else {
            None
        }
    }
}

/// Body of `POST /rename_chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameRequest {
    pub chat_id: String,
    pub new_title: String,
}

/// Body of `POST /delete_chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub chat_id: String,
}

/// Body of `POST /pin_chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinRequest {
    pub chat_id: String,
    /// The desired pinned state.
    pub pin_status: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn session_login_uses_camel_case_token() {
        let request = SessionLoginRequest {
            id_token: "tok".to_string(),
        };
        assert_eq!(to_value(&request).unwrap(), json!({"idToken": "tok"}));
    }

    #[test]
    fn edit_echoes_numeric_message_id() {
        let request = EditRequest {
            chat_id: "c1".to_string(),
            message_id: ServerId::Number(1712),
            new_text: "fixed".to_string(),
        };
        assert_eq!(
            to_value(&request).unwrap(),
            json!({"chat_id": "c1", "message_id": 1712, "new_text": "fixed"})
        );
    }

    #[test]
    fn pin_request_shape() {
        let request = PinRequest {
            chat_id: "c1".to_string(),
            pin_status: true,
        };
        assert_eq!(
            to_value(&request).unwrap(),
            json!({"chat_id": "c1", "pin_status": true})
        );
    }

    #[test]
    fn failed_title_generation_has_no_title() {
        let response: TitleResponse =
            serde_json::from_value(json!({"success": false, "error": "nope"})).unwrap();
        assert_eq!(response.generated_title(), None);
        let response: TitleResponse =
            serde_json::from_value(json!({"success": true, "title": "Trip plans"})).unwrap();
        assert_eq!(response.generated_title(), Some("Trip plans"));
    }

    #[test]
    fn chat_request_builder() {
        let request = ChatRequest::new("Hello").with_chat_id("c1");
        assert_eq!(request.chat_id.as_deref(), Some("c1"));
        assert!(request.file.is_none());
        assert!(request.into_form().is_ok());
    }
}
