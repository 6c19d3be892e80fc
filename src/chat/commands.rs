//! Slash command parsing for the chat application.
//!
//! Input starting with `/` drives the sidebar, settings, and account flows
//! instead of being sent as a message.  Conversation and message numbers are
//! 1-based, as printed by `/history` and `/messages`.

use crate::settings::SettingsField;

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Start a new conversation.
    New,
    /// List conversations.
    History,
    /// Open the nth conversation.
    Open(usize),
    /// Rename the nth conversation.
    Rename(usize, String),
    /// Delete the nth conversation.
    Delete(usize),
    /// Pin or unpin the nth conversation.
    Pin(usize),
    /// Replace the text of the nth message and regenerate the reply.
    Edit(usize, String),
    /// Attach a file to the next message.
    Attach(String),
    /// Drop the pending attachment.
    Detach,
    /// Show the settings form.
    Settings,
    /// Change one settings field in the form.
    Set(SettingsField, String),
    /// Save the settings form.
    Save,
    /// Translate a recording into a language.
    Translate { language: String, path: String },
    /// Sign in with email and password.
    Login { email: String, password: String },
    /// Create an account.
    Signup { email: String, password: String },
    /// Reprint the conversation.
    Messages,
    /// Display help information.
    Help,
    /// Exit the chat application.
    Quit,
    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be sent as a message.
///
/// ```
/// # use luna::chat::{ChatCommand, parse_command};
/// assert_eq!(parse_command("/open 2"), Some(ChatCommand::Open(2)));
/// assert!(parse_command("Hello, LUNA!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;
    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());
    let result = match command.as_str() {
        "new" => ChatCommand::New,
        "history" | "chats" => ChatCommand::History,
        "open" => parse_index(argument, "/open").map_or_else(|e| e, ChatCommand::Open),
        "delete" => parse_index(argument, "/delete").map_or_else(|e| e, ChatCommand::Delete),
        "pin" => parse_index(argument, "/pin").map_or_else(|e| e, ChatCommand::Pin),
        "rename" => match parse_index_and_text(argument, "/rename", "a title") {
            Ok((index, title)) => ChatCommand::Rename(index, title),
            Err(err) => err,
        },
        "edit" => match parse_index_and_text(argument, "/edit", "new text") {
            Ok((index, text)) => ChatCommand::Edit(index, text),
            Err(err) => err,
        },
        "attach" => match argument {
            Some(path) => ChatCommand::Attach(path.to_string()),
            None => ChatCommand::Invalid("/attach requires a file path".to_string()),
        },
        "detach" => ChatCommand::Detach,
        "settings" => ChatCommand::Settings,
        "set" => parse_set(argument),
        "save" => ChatCommand::Save,
        "translate" => match split_pair(argument) {
            Some((language, path)) => ChatCommand::Translate {
                language: language.to_string(),
                path: path.to_string(),
            },
            None => ChatCommand::Invalid("/translate requires a language and a file".to_string()),
        },
        "login" => match split_pair(argument) {
            Some((email, password)) => ChatCommand::Login {
                email: email.to_string(),
                password: password.to_string(),
            },
            None => ChatCommand::Invalid("/login requires an email and a password".to_string()),
        },
        "signup" => match split_pair(argument) {
            Some((email, password)) => ChatCommand::Signup {
                email: email.to_string(),
                password: password.to_string(),
            },
            None => ChatCommand::Invalid("/signup requires an email and a password".to_string()),
        },
        "messages" => ChatCommand::Messages,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };
    Some(result)
}

fn parse_index(argument: Option<&str>, name: &str) -> Result<usize, ChatCommand> {
    let Some(arg) = argument else {
        return Err(ChatCommand::Invalid(format!("{name} requires a number")));
    };
    match arg.parse::<usize>() {
        Ok(index) if index > 0 => Ok(index),
        _ => Err(ChatCommand::Invalid(format!(
            "{name} expects a positive integer"
        ))),
    }
}

fn parse_index_and_text(
    argument: Option<&str>,
    name: &str,
    what: &str,
) -> Result<(usize, String), ChatCommand> {
    let mut parts = argument.unwrap_or_default().splitn(2, ' ');
    let index = parse_index(parts.next().filter(|s| !s.is_empty()), name)?;
    match parts.next().map(str::trim).filter(|s| !s.is_empty()) {
        Some(text) => Ok((index, text.to_string())),
        None => Err(ChatCommand::Invalid(format!("{name} requires {what}"))),
    }
}

fn split_pair(argument: Option<&str>) -> Option<(&str, &str)> {
    let (first, second) = argument?.split_once(' ')?;
    let second = second.trim();
    if second.is_empty() {
        None
    } else {
        Some((first, second))
    }
}

fn parse_set(argument: Option<&str>) -> ChatCommand {
    let Some(arg) = argument else {
        return ChatCommand::Invalid("/set requires a field and a value".to_string());
    };
    let (field, value) = match arg.split_once(' ') {
        Some((field, value)) => (field, value.trim()),
        None => (arg, ""),
    };
    match field.parse::<SettingsField>() {
        Ok(field) => ChatCommand::Set(field, value.to_string()),
        Err(_) => ChatCommand::Invalid(format!(
            "Unknown settings field '{field}' (use {})",
            SettingsField::ALL
                .iter()
                .map(|f| f.name())
                .collect::<Vec<_>>()
                .join(", ")
        )),
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /new                       Start a new chat
  /history                   List chats (pinned first)
  /open <n>                  Open chat n
  /rename <n> <title>        Rename chat n
  /delete <n>                Delete chat n
  /pin <n>                   Pin or unpin chat n
  /edit <n> <text>           Edit your message n and regenerate the reply
  /attach <path>             Attach a file to the next message
  /detach                    Drop the pending attachment
  /settings                  Show your settings
  /set <field> <value>       Change a setting (personality, custom-instructions,
                             nickname, occupation, interests)
  /save                      Save your settings
  /translate <lang> <wav>    Translate a recording
  /login <email> <password>  Sign in
  /signup <email> <password> Create an account
  /messages                  Show the conversation
  /help                      Show this help message
  /quit                      Exit the chat"#
}
