//! Conversation entry types.
//!
//! This module contains the append-only record of a chat (`ChatEntry`) and
//! the speaker/text view handed to collaborators (`TranscriptLine`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single utterance in a group chat.
///
/// Entries are immutable once created. An empty speaker marks a system
/// announcement (e.g. "📢 Elaine has joined the chat.").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    speaker: String,
    text: String,
    at: DateTime<Utc>,
}

impl ChatEntry {
    /// Creates an entry spoken by `speaker`, stamped with the current time.
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self::at(speaker, text, Utc::now())
    }

    /// Creates an entry with an explicit timestamp.
    pub fn at(speaker: impl Into<String>, text: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
            at,
        }
    }

    /// Creates a system announcement (empty speaker).
    pub fn announcement(text: impl Into<String>) -> Self {
        Self::new(String::new(), text)
    }

    pub fn speaker(&self) -> &str {
        &self.speaker
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.at
    }

    /// Returns true for system announcements.
    pub fn is_announcement(&self) -> bool {
        self.speaker.is_empty()
    }

    /// Returns the speaker/text view of this entry.
    pub fn to_line(&self) -> TranscriptLine {
        TranscriptLine {
            speaker: self.speaker.clone(),
            text: self.text.clone(),
        }
    }
}

/// Speaker and text of one transcript entry, without timing information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptLine {
    pub speaker: String,
    pub text: String,
}

impl TranscriptLine {
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
        }
    }

    /// Formats the line as `speaker: text`.
    pub fn render(&self) -> String {
        format!("{}: {}", self.speaker, self.text)
    }
}
