//! Session domain module.
//!
//! # Module Structure
//!
//! - `message`: Transcript records (`ChatEntry`, `TranscriptLine`)
//! - `scheduler`: Turn-taking (`TurnScheduler`, `RoundPlan`)
//! - `model`: The conversation itself (`ChatSession`, `RoundReport`)
//! - `sink`: Display surface (`OutputSink`, `SessionNotice`)
//! - `persister`: Transcript saving (`TranscriptPersister`)
//!
//! # Usage
//!
//! ```ignore
//! use imagine_core::session::{ChatSession, ChatEntry, TurnScheduler};
//! use imagine_core::session::{OutputSink, TranscriptPersister};
//! ```

mod message;
mod model;
mod persister;
mod scheduler;
mod sink;

// Re-export public API
pub use message::{ChatEntry, TranscriptLine};
pub use model::{ChatSession, RoundReport, SkippedTurn};
pub use persister::{TranscriptLocation, TranscriptPersister};
pub use scheduler::{RoundPlan, ScheduledTurn, TurnPhase, TurnScheduler};
pub use sink::{NullSink, OutputSink, SessionNotice};
