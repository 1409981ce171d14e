//! Chat Setup Service
//!
//! Turns a context ("seinfeld", "the office"...) and a character selection
//! into a live group chat: one agent per selected character, the human
//! playing one of them.

use crate::session::{SessionHandle, SessionRegistry};
use imagine_core::agent::{Agent, PersonaPrompt, ResponseGenerator};
use imagine_core::config::SchedulerConfig;
use imagine_core::error::{ImagineError, Result};
use imagine_core::persona::CharacterSuggestionService;
use imagine_core::session::{ChatSession, OutputSink, TurnScheduler};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

const SESSION_ID_LEN: usize = 12;

/// What the user picked during setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSetup {
    /// Show, movie or book the characters come from
    pub context: String,
    /// Selected characters, in the order they join
    pub characters: Vec<String>,
    /// Character played by the human
    pub human_name: String,
}

/// Service for starting group chats
pub struct ChatSetupService {
    suggestions: Arc<dyn CharacterSuggestionService>,
    generator: Arc<dyn ResponseGenerator>,
    registry: Arc<SessionRegistry>,
    scheduler: SchedulerConfig,
    reply_timeout: Option<Duration>,
}

impl ChatSetupService {
    /// Create a new ChatSetupService
    pub fn new(
        suggestions: Arc<dyn CharacterSuggestionService>,
        generator: Arc<dyn ResponseGenerator>,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            suggestions,
            generator,
            registry,
            scheduler: SchedulerConfig::default(),
            reply_timeout: None,
        }
    }

    /// Applies the sweep cap and seed to every new session.
    pub fn with_scheduler_config(mut self, scheduler: SchedulerConfig) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Bounds every agent reply.
    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = Some(timeout);
        self
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Suggests characters for `context`.
    ///
    /// # Errors
    ///
    /// Returns a `Suggestion` error if the context is blank or the
    /// suggestion service fails.
    pub async fn suggest_characters(&self, context: &str) -> Result<Vec<String>> {
        let context = context.trim();
        if context.is_empty() {
            return Err(ImagineError::suggestion("Context must not be empty"));
        }

        let characters = self.suggestions.suggest(context).await?;
        debug!(context, count = characters.len(), "Characters suggested");
        Ok(characters)
    }

    /// Creates and registers a chat for `setup`.
    ///
    /// The human's arrival is announced first, then every other selected
    /// character joins as an agent, in selection order.
    ///
    /// # Errors
    ///
    /// - `Config` if the context or the human name is blank
    /// - `DuplicateSession` if the generated id is already live
    pub async fn start_chat(
        &self,
        setup: ChatSetup,
        sink: Arc<dyn OutputSink>,
    ) -> Result<SessionHandle> {
        let context = setup.context.trim();
        let human_name = setup.human_name.trim();
        if context.is_empty() {
            return Err(ImagineError::config("Context must not be empty"));
        }
        if human_name.is_empty() {
            return Err(ImagineError::config("Pick the character you'll be playing"));
        }

        let session_id = new_session_id();
        let mut session = ChatSession::create(&session_id, context, human_name, sink)
            .with_scheduler(self.build_scheduler());
        session.announce(format!("📢 {human_name} has joined the chat."))?;

        for character in setup.characters.iter().map(|c| c.trim()) {
            if character.is_empty()
                || character == human_name
                || session.roster().iter().any(|a| a.name() == character)
            {
                continue;
            }

            let mut agent = Agent::new(
                character,
                PersonaPrompt::for_character(character, context),
                self.generator.clone(),
            )?;
            if let Some(timeout) = self.reply_timeout {
                agent = agent.with_timeout(timeout);
            }
            session.join(agent)?;
        }

        let agents = session.roster().len();
        let handle = self.registry.create(session).await?;
        info!(context, session_id = %session_id, agents, "New group chat created");

        Ok(handle)
    }

    fn build_scheduler(&self) -> TurnScheduler {
        let scheduler = match self.scheduler.seed {
            Some(seed) => TurnScheduler::seeded(seed),
            None => TurnScheduler::new(),
        };
        scheduler.with_max_sweeps(self.scheduler.max_sweeps)
    }
}

/// Short random hex id, e.g. `4f2a9c0d1e3b`.
fn new_session_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(SESSION_ID_LEN);
    id
}
