//! Client library for the LUNA chat assistant.
//!
//! [`LunaClient`] speaks the backend's HTTP interface and decodes its
//! streamed replies.  The [`chat`] module builds a conversation controller on
//! top of any [`Backend`]; the remaining modules hold the sidebar, settings,
//! sign-in, voice translation, and navigation state that a front end drives.

// Public modules
pub mod auth;
pub mod chat;
pub mod client;
pub mod error;
pub mod history;
pub mod identity;
pub mod markdown;
pub mod nav;
pub mod observability;
pub mod render;
pub mod settings;
pub mod sse;
pub mod store;
pub mod translator;
pub mod types;
pub mod view;

#[cfg(test)]
mod testing;

// Re-exports
pub use client::{Backend, LunaClient, RecordStream};
pub use error::{Error, Result};
pub use identity::{FirebaseIdentity, IdentityProvider};
pub use observability::register_biometrics;
pub use types::*;
