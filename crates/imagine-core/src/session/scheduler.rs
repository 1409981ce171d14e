//! Turn-taking for a group chat.
//!
//! After every new message the [`TurnScheduler`] decides which agents answer
//! and in which order:
//!
//! 1. **Mention pass**: every agent with a name token occurring in the
//!    message (case-sensitive substring) answers, in roster order.
//! 2. **Probabilistic pass**: only when nobody was mentioned. Each sweep
//!    draws `u ∈ [0, 1)` per agent in roster order and selects the agent if
//!    `u < 1/n`. Sweeps repeat until one selects at least one agent.
//!
//! An empty roster returns an empty plan without drawing.

use super::message::ChatEntry;
use crate::agent::Agent;
use rand::distributions::Standard;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use tracing::debug;

/// Phase that selected an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Mention,
    Probabilistic,
}

/// One agent scheduled to answer, identified by its roster position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTurn {
    pub roster_index: usize,
    pub phase: TurnPhase,
}

/// Ordered outcome of scheduling one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundPlan {
    pub turns: Vec<ScheduledTurn>,
    /// Number of probabilistic sweeps drawn (0 when the mention pass hit).
    pub sweeps: u32,
    /// True when the sweep cap was reached and one agent was picked directly.
    pub forced: bool,
}

impl RoundPlan {
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Roster indices in answering order.
    pub fn roster_indices(&self) -> Vec<usize> {
        self.turns.iter().map(|turn| turn.roster_index).collect()
    }
}

/// Decides who answers a message.
pub struct TurnScheduler {
    rng: Box<dyn RngCore + Send>,
    max_sweeps: Option<u32>,
}

impl TurnScheduler {
    /// Creates a scheduler drawing from an entropy-seeded generator.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Creates a scheduler with reproducible draws.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    /// Creates a scheduler drawing from `rng`.
    pub fn with_rng(rng: impl RngCore + Send + 'static) -> Self {
        Self {
            rng: Box::new(rng),
            max_sweeps: None,
        }
    }

    /// Caps the number of probabilistic sweeps.
    ///
    /// When the cap is reached without a selection one agent is picked
    /// uniformly, so every message is still answered. `None` means sweeps
    /// repeat until one selects.
    pub fn with_max_sweeps(mut self, max_sweeps: Option<u32>) -> Self {
        self.max_sweeps = max_sweeps;
        self
    }

    /// Plans the agents answering `history[new_entry_index]`.
    pub fn schedule(
        &mut self,
        history: &[ChatEntry],
        roster: &[Agent],
        new_entry_index: usize,
    ) -> RoundPlan {
        if roster.is_empty() {
            debug!("Empty roster, nobody to schedule");
            return RoundPlan::default();
        }

        let message = history
            .get(new_entry_index)
            .map(ChatEntry::text)
            .unwrap_or_default();

        let mentioned: Vec<ScheduledTurn> = roster
            .iter()
            .enumerate()
            .filter(|(_, agent)| agent.is_mentioned_in(message))
            .map(|(roster_index, _)| ScheduledTurn {
                roster_index,
                phase: TurnPhase::Mention,
            })
            .collect();

        if !mentioned.is_empty() {
            debug!(count = mentioned.len(), "Mention pass selected agents");
            return RoundPlan {
                turns: mentioned,
                sweeps: 0,
                forced: false,
            };
        }

        self.probabilistic_pass(roster.len())
    }

    fn probabilistic_pass(&mut self, roster_size: usize) -> RoundPlan {
        let probability = 1.0 / roster_size as f64;
        let mut sweeps = 0;

        loop {
            if self.max_sweeps.is_some_and(|cap| sweeps >= cap) {
                let roster_index = ((self.draw() * roster_size as f64) as usize).min(roster_size - 1);
                debug!(sweeps, roster_index, "Sweep cap reached, picking one agent");
                return RoundPlan {
                    turns: vec![ScheduledTurn {
                        roster_index,
                        phase: TurnPhase::Probabilistic,
                    }],
                    sweeps,
                    forced: true,
                };
            }

            sweeps += 1;
            let mut turns = Vec::new();
            for roster_index in 0..roster_size {
                if self.draw() < probability {
                    turns.push(ScheduledTurn {
                        roster_index,
                        phase: TurnPhase::Probabilistic,
                    });
                }
            }

            if !turns.is_empty() {
                debug!(sweeps, count = turns.len(), "Probabilistic pass selected agents");
                return RoundPlan {
                    turns,
                    sweeps,
                    forced: false,
                };
            }
        }
    }

    /// Uniform draw in `[0, 1)`.
    fn draw(&mut self) -> f64 {
        self.rng.sample(Standard)
    }
}

impl Default for TurnScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TurnScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnScheduler")
            .field("max_sweeps", &self.max_sweeps)
            .finish_non_exhaustive()
    }
}
