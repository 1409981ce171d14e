//! Application layer for Imagine Chat.
//!
//! This crate provides use case implementations that coordinate between
//! the domain and the collaborator implementations: live session
//! management, chat setup and transcript sharing.

pub mod chat_setup_service;
pub mod session;
pub mod share_service;

#[cfg(test)]
pub(crate) mod testing;

pub use chat_setup_service::{ChatSetup, ChatSetupService};
pub use session::{SessionHandle, SessionRegistry};
pub use share_service::{ShareReceipt, ShareService};
