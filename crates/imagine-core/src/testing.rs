//! Test doubles shared by the unit tests of this crate.

use crate::agent::ResponseGenerator;
use crate::error::{ImagineError, Result};
use crate::session::{OutputSink, SessionNotice, TranscriptLine};
use async_trait::async_trait;
use rand::RngCore;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
pub(crate) struct GeneratorCall {
    pub system_prompt: String,
    pub transcript: Vec<TranscriptLine>,
}

enum Outcome {
    Candidates(Vec<String>),
    Fail(String),
}

/// Generator returning a fixed outcome and recording every call.
pub(crate) struct RecordingGenerator {
    outcome: Outcome,
    delay: Option<Duration>,
    calls: Mutex<Vec<GeneratorCall>>,
}

impl RecordingGenerator {
    pub fn replying(reply: &str) -> Self {
        Self::with_candidates(vec![reply.to_string()])
    }

    pub fn with_candidates(candidates: Vec<String>) -> Self {
        Self {
            outcome: Outcome::Candidates(candidates),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Outcome::Fail(message.to_string()),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<GeneratorCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResponseGenerator for RecordingGenerator {
    async fn generate(
        &self,
        system_prompt: &str,
        transcript: &[TranscriptLine],
    ) -> Result<Vec<String>> {
        self.calls.lock().unwrap().push(GeneratorCall {
            system_prompt: system_prompt.to_string(),
            transcript: transcript.to_vec(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.outcome {
            Outcome::Candidates(candidates) => Ok(candidates.clone()),
            Outcome::Fail(message) => Err(ImagineError::generation(message.clone())),
        }
    }
}

/// Sink collecting emitted lines and notices.
#[derive(Default)]
pub(crate) struct CollectingSink {
    lines: Mutex<Vec<(String, String)>>,
    notices: Mutex<Vec<SessionNotice>>,
}

impl CollectingSink {
    pub fn lines(&self) -> Vec<(String, String)> {
        self.lines.lock().unwrap().clone()
    }

    pub fn notices(&self) -> Vec<SessionNotice> {
        self.notices.lock().unwrap().clone()
    }
}

impl OutputSink for CollectingSink {
    fn emit(&self, speaker: &str, text: &str) {
        self.lines
            .lock()
            .unwrap()
            .push((speaker.to_string(), text.to_string()));
    }

    fn notify(&self, notice: &SessionNotice) {
        self.notices.lock().unwrap().push(notice.clone());
    }
}

/// Random source replaying scripted `u64` values; the last one repeats.
///
/// `0` draws as `0.0` and `u64::MAX` draws just below `1.0`.
pub(crate) struct ScriptedRng {
    values: VecDeque<u64>,
    last: u64,
}

impl ScriptedRng {
    pub fn new(values: Vec<u64>) -> Self {
        let last = values.last().copied().unwrap_or(u64::MAX);
        Self {
            values: values.into(),
            last,
        }
    }
}

impl RngCore for ScriptedRng {
    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.values.pop_front().unwrap_or(self.last)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
