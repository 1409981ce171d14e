use crate::error::Result;
use crate::session::TranscriptLine;
use async_trait::async_trait;

/// Text-generation backend consumed by [`Agent`](super::Agent).
///
/// Implementations turn a persona's system prompt plus the ordered
/// transcript into candidate replies, best first. Implementations must fail
/// rather than hang once their request timeout has passed.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        transcript: &[TranscriptLine],
    ) -> Result<Vec<String>>;
}
