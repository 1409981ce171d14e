//! Domain layer for Imagine Chat.
//!
//! A human role-plays in a group chat with character agents drawn from a
//! show or a movie. This crate holds the turn-taking engine
//! ([`session::TurnScheduler`]), the conversation ([`session::ChatSession`])
//! and the narrow traits through which it reaches text generation, display
//! and storage.

pub mod agent;
pub mod config;
pub mod error;
pub mod persona;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

// Re-export common error type
pub use error::{ImagineError, Result};
