//! Test doubles shared by the unit tests of this crate.

use async_trait::async_trait;
use imagine_core::agent::{Agent, PersonaPrompt, ResponseGenerator};
use imagine_core::error::{ImagineError, Result};
use imagine_core::persona::CharacterSuggestionService;
use imagine_core::session::{OutputSink, TranscriptLine};
use std::sync::{Arc, Mutex};

/// Replies `"<system prompt> heard <n> lines"`.
#[derive(Default)]
pub(crate) struct EchoGenerator;

#[async_trait]
impl ResponseGenerator for EchoGenerator {
    async fn generate(
        &self,
        system_prompt: &str,
        transcript: &[TranscriptLine],
    ) -> Result<Vec<String>> {
        let speaker = system_prompt
            .strip_prefix("Your name is ")
            .and_then(|rest| rest.split('.').next())
            .unwrap_or(system_prompt);
        Ok(vec![format!("{speaker} heard {} lines", transcript.len())])
    }
}

/// Agent whose persona prompt is its bare name.
pub(crate) fn agent(name: &str, generator: Arc<dyn ResponseGenerator>) -> Agent {
    Agent::new(name, PersonaPrompt::custom(name), generator).unwrap()
}

pub(crate) struct FixedSuggestions(pub Result<Vec<String>>);

#[async_trait]
impl CharacterSuggestionService for FixedSuggestions {
    async fn suggest(&self, _context: &str) -> Result<Vec<String>> {
        self.0.clone()
    }
}

impl FixedSuggestions {
    pub fn failing(message: &str) -> Self {
        Self(Err(ImagineError::suggestion(message)))
    }
}

#[derive(Default)]
pub(crate) struct CollectingSink {
    lines: Mutex<Vec<(String, String)>>,
}

impl CollectingSink {
    pub fn lines(&self) -> Vec<(String, String)> {
        self.lines.lock().unwrap().clone()
    }
}

impl OutputSink for CollectingSink {
    fn emit(&self, speaker: &str, text: &str) {
        self.lines
            .lock()
            .unwrap()
            .push((speaker.to_string(), text.to_string()));
    }
}
