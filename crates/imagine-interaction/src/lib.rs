//! OpenAI-backed collaborators for group chats.
//!
//! [`OpenAiChatClient`] answers both reply generation and character
//! suggestion requests.

pub mod openai_chat_client;

pub use openai_chat_client::OpenAiChatClient;
