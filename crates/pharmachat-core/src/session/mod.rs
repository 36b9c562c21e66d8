//! Conversation session domain module.
//!
//! - `message`: chat message model and its structured payload
//! - `preferences`: per-session user preferences
//! - `repository`: trait for durable session storage

mod message;
mod preferences;
mod repository;

pub use message::{ChatMessage, MessagePayload, MessageRole};
pub use preferences::SessionPreferences;
pub use repository::SessionStore;
