use super::message::{ChatEntry, TranscriptLine};
use super::scheduler::{RoundPlan, TurnScheduler};
use super::sink::{OutputSink, SessionNotice};
use crate::agent::Agent;
use crate::error::{ImagineError, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// An agent turn that produced nothing this round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTurn {
    pub agent: String,
    pub reason: String,
}

/// Outcome of one [`ChatSession::receive`] round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundReport {
    /// Agents whose replies were appended, in append order.
    pub replied: Vec<String>,
    /// Agents whose generation failed.
    pub skipped: Vec<SkippedTurn>,
    /// Probabilistic sweeps drawn by the scheduler.
    pub sweeps: u32,
    /// True if the session was closed mid-round and the rest was dropped.
    pub discarded: bool,
}

/// One multi-party conversation between a human and character agents.
///
/// The session owns the transcript and the roster. History only grows:
/// existing entries are never altered, reordered or removed. All mutation
/// goes through `&mut self`, so one message is fully processed before the
/// next one starts.
pub struct ChatSession {
    id: String,
    context_label: String,
    human_name: String,
    started_at: DateTime<Utc>,
    history: Vec<ChatEntry>,
    roster: Vec<Agent>,
    scheduler: TurnScheduler,
    sink: Arc<dyn OutputSink>,
    closed: CancellationToken,
}

impl ChatSession {
    /// Creates an open session with an empty history and roster.
    pub fn create(
        id: impl Into<String>,
        context_label: impl Into<String>,
        human_name: impl Into<String>,
        sink: Arc<dyn OutputSink>,
    ) -> Self {
        let session = Self {
            id: id.into(),
            context_label: context_label.into(),
            human_name: human_name.into().trim().to_string(),
            started_at: Utc::now(),
            history: Vec::new(),
            roster: Vec::new(),
            scheduler: TurnScheduler::new(),
            sink,
            closed: CancellationToken::new(),
        };

        info!(
            session_id = %session.id,
            context = %session.context_label,
            human = %session.human_name,
            "Chat session started"
        );
        session
    }

    /// Replaces the turn scheduler.
    pub fn with_scheduler(mut self, scheduler: TurnScheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn context_label(&self) -> &str {
        &self.context_label
    }

    pub fn human_name(&self) -> &str {
        &self.human_name
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Full history, announcements included.
    pub fn history(&self) -> &[ChatEntry] {
        &self.history
    }

    /// Agents in join order.
    pub fn roster(&self) -> &[Agent] {
        &self.roster
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Token cancelled when the session closes.
    ///
    /// Lets an owner close the session while a round is in flight.
    pub fn close_token(&self) -> CancellationToken {
        self.closed.clone()
    }

    /// Adds an agent to the roster and announces it.
    ///
    /// # Errors
    ///
    /// - `DuplicateAgent` if the name is taken by another agent or by the human
    /// - `SessionClosed` if the session is closed
    pub fn join(&mut self, agent: Agent) -> Result<()> {
        self.ensure_open()?;

        let name = agent.name().to_string();
        if name == self.human_name || self.roster.iter().any(|a| a.name() == name) {
            return Err(ImagineError::duplicate_agent(name));
        }

        self.roster.push(agent);
        debug!(session_id = %self.id, agent = %name, "Agent joined");
        self.announce(format!("📢 {name} has joined the chat."))
    }

    /// Appends and emits a system announcement.
    ///
    /// # Errors
    ///
    /// Returns `SessionClosed` if the session is closed.
    pub fn announce(&mut self, text: impl Into<String>) -> Result<()> {
        self.ensure_open()?;
        self.append(ChatEntry::announcement(text));
        Ok(())
    }

    /// Records a message and lets the scheduled agents answer it.
    ///
    /// Each reply is appended (and emitted) before the next scheduled agent
    /// generates, so later agents see earlier replies. A failed generation
    /// skips that agent for the round and appends nothing. If the session is
    /// closed while a reply is in flight, that reply and the rest of the
    /// round are dropped.
    ///
    /// # Errors
    ///
    /// Returns `SessionClosed` if the session was closed before the call.
    pub async fn receive(&mut self, speaker: &str, text: &str) -> Result<RoundReport> {
        self.ensure_open()?;

        let index = self.append(ChatEntry::new(speaker, text));
        let plan: RoundPlan = self.scheduler.schedule(&self.history, &self.roster, index);

        let mut report = RoundReport {
            sweeps: plan.sweeps,
            ..RoundReport::default()
        };

        for turn in plan.turns {
            let agent = self.roster[turn.roster_index].clone();
            let outcome = agent.respond(&self.history).await;

            if self.closed.is_cancelled() {
                info!(session_id = %self.id, agent = agent.name(), "Session closed mid-round, dropping reply");
                self.sink.notify(&SessionNotice::ReplyDiscarded {
                    agent: agent.name().to_string(),
                });
                report.discarded = true;
                break;
            }

            match outcome {
                Ok(reply) => {
                    self.append(ChatEntry::new(agent.name(), reply));
                    report.replied.push(agent.name().to_string());
                }
                Err(err) => {
                    warn!(session_id = %self.id, agent = agent.name(), error = %err, "Skipping agent turn");
                    let skipped = SkippedTurn {
                        agent: agent.name().to_string(),
                        reason: err.to_string(),
                    };
                    self.sink.notify(&SessionNotice::TurnSkipped {
                        agent: skipped.agent.clone(),
                        reason: skipped.reason.clone(),
                    });
                    report.skipped.push(skipped);
                }
            }
        }

        Ok(report)
    }

    /// Snapshot of the spoken lines, announcements excluded.
    pub fn export_transcript(&self) -> Vec<TranscriptLine> {
        self.history
            .iter()
            .filter(|entry| !entry.is_announcement())
            .map(ChatEntry::to_line)
            .collect()
    }

    /// Stops the session from receiving. Idempotent.
    pub fn close(&self) {
        if !self.closed.is_cancelled() {
            info!(session_id = %self.id, entries = self.history.len(), "Chat session closed");
        }
        self.closed.cancel();
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.is_cancelled() {
            return Err(ImagineError::session_closed(&self.id));
        }
        Ok(())
    }

    fn append(&mut self, entry: ChatEntry) -> usize {
        self.sink.emit(entry.speaker(), entry.text());
        self.history.push(entry);
        self.history.len() - 1
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("id", &self.id)
            .field("context_label", &self.context_label)
            .field("human_name", &self.human_name)
            .field("entries", &self.history.len())
            .field("roster", &self.roster.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
