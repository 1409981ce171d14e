use super::message::TranscriptLine;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where a saved transcript ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptLocation {
    /// File written on disk.
    pub file: PathBuf,
    /// Path under the public site root, e.g. `static/4f2a9c0d1e3b.html`.
    pub public_path: String,
}

/// Saves a transcript on explicit user request.
///
/// Failures are reported as `Persistence` errors; callers log them and keep
/// the conversation running.
#[async_trait]
pub trait TranscriptPersister: Send + Sync {
    async fn save(
        &self,
        session_id: &str,
        transcript: &[TranscriptLine],
    ) -> Result<TranscriptLocation>;
}
