//! Character agents.
//!
//! An [`Agent`] is a named, non-human participant bound to a persona
//! prompt. It owns no history: every reply is generated from the session's
//! transcript at the moment it is asked to respond.

mod generator;
mod persona;

pub use generator::ResponseGenerator;
pub use persona::PersonaPrompt;

use crate::error::{ImagineError, Result};
use crate::session::{ChatEntry, TranscriptLine};
use std::sync::Arc;
use std::time::Duration;

/// A named participant that delegates its replies to a [`ResponseGenerator`].
#[derive(Clone)]
pub struct Agent {
    name: String,
    persona: PersonaPrompt,
    generator: Arc<dyn ResponseGenerator>,
    timeout: Option<Duration>,
}

impl Agent {
    /// Creates an agent.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error if `name` is blank.
    pub fn new(
        name: impl Into<String>,
        persona: PersonaPrompt,
        generator: Arc<dyn ResponseGenerator>,
    ) -> Result<Self> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(ImagineError::config("Agent name must not be empty"));
        }

        Ok(Self {
            name,
            persona,
            generator,
            timeout: None,
        })
    }

    /// Bounds every generation call; an elapsed call fails with a
    /// `Generation` error.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn persona(&self) -> &PersonaPrompt {
        &self.persona
    }

    /// Whitespace-separated tokens of the agent's name.
    pub fn name_tokens(&self) -> impl Iterator<Item = &str> {
        self.name.split_whitespace()
    }

    /// Returns true if any name token occurs in `text` (case-sensitive).
    pub fn is_mentioned_in(&self, text: &str) -> bool {
        self.name_tokens().any(|token| text.contains(token))
    }

    /// Generates this agent's next utterance from `history`.
    ///
    /// The generator receives the persona prompt and one `speaker: text`
    /// line per entry, in transcript order. The first candidate is returned
    /// trimmed.
    ///
    /// # Errors
    ///
    /// Returns a `Generation` error if the call fails, times out, returns no
    /// candidates, or returns only whitespace.
    pub async fn respond(&self, history: &[ChatEntry]) -> Result<String> {
        let transcript: Vec<TranscriptLine> = history.iter().map(ChatEntry::to_line).collect();
        let call = self.generator.generate(self.persona.as_str(), &transcript);

        let candidates = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                ImagineError::generation(format!(
                    "{} did not answer within {}s",
                    self.name,
                    limit.as_secs()
                ))
            })??,
            None => call.await?,
        };

        let reply = candidates
            .into_iter()
            .next()
            .map(|text| text.trim().to_string())
            .ok_or_else(|| {
                ImagineError::generation(format!("No candidates returned for {}", self.name))
            })?;

        if reply.is_empty() {
            return Err(ImagineError::generation(format!(
                "Empty reply returned for {}",
                self.name
            )));
        }

        Ok(reply)
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
