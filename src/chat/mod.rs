//! Chat application module for interactive conversations with LUNA.
//!
//! This module provides the conversation controller and the pieces the
//! `luna-chat` REPL is built from:
//!
//! - [`session`]: the active conversation, its exchanges, and the sidebar
//! - [`compose`]: the compose area and its pending attachment
//! - [`commands`]: slash command parsing
//! - [`config`]: CLI argument parsing and layered configuration

mod commands;
mod compose;
mod config;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use compose::{ComposeAction, ComposeKey, ComposeState};
pub use config::{BASE_URL_ENV, ChatArgs, ConfigFile, FIREBASE_API_KEY_ENV, LunaConfig};
pub use session::{
    ChatSession, EDIT_FAILED, ExchangeOutcome, ExchangeState, SEND_FAILED, SendOutcome,
    TitleUpdate,
};
