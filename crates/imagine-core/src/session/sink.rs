use serde::{Deserialize, Serialize};

/// Non-fatal events reported to whoever owns a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionNotice {
    /// An agent's turn was skipped for this round.
    TurnSkipped { agent: String, reason: String },
    /// A reply arrived after the session was closed and was dropped.
    ReplyDiscarded { agent: String },
    /// A transcript could not be saved.
    PersistenceFailed { reason: String },
}

/// Display surface for a chat.
///
/// The session calls [`emit`](OutputSink::emit) once per appended entry,
/// in append order. Announcements are emitted with an empty speaker.
pub trait OutputSink: Send + Sync {
    fn emit(&self, speaker: &str, text: &str);

    fn notify(&self, _notice: &SessionNotice) {}
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn emit(&self, _speaker: &str, _text: &str) {}
}
