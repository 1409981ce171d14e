use super::registry::SessionMap;
use imagine_core::agent::Agent;
use imagine_core::error::Result;
use imagine_core::session::{ChatSession, RoundReport, TranscriptLine};
use std::sync::Weak;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// Requests queued for a session task.
pub(crate) enum SessionCommand {
    Receive {
        speaker: String,
        text: String,
        reply: oneshot::Sender<Result<RoundReport>>,
    },
    Join {
        agent: Agent,
        reply: oneshot::Sender<Result<()>>,
    },
    Announce {
        text: String,
        reply: oneshot::Sender<Result<()>>,
    },
    Export {
        reply: oneshot::Sender<Vec<TranscriptLine>>,
    },
}

/// Owns one [`ChatSession`] and applies queued commands one at a time.
///
/// The task removes its registry entry once the session closes (explicitly
/// or after the idle timeout) and exits when every handle is dropped.
pub(crate) struct SessionTask {
    pub session: ChatSession,
    pub commands: mpsc::Receiver<SessionCommand>,
    pub idle_timeout: Option<Duration>,
    pub registry: Weak<SessionMap>,
}

impl SessionTask {
    pub async fn run(self) {
        let SessionTask {
            mut session,
            mut commands,
            idle_timeout,
            registry,
        } = self;
        let closed = session.close_token();
        let session_id = session.id().to_string();
        let mut deregistered = false;

        loop {
            let idle = idle_timeout.filter(|_| !closed.is_cancelled());

            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => Self::apply(&mut session, command).await,
                    None => break,
                },
                _ = closed.cancelled(), if !deregistered => {
                    deregister(&registry, &session_id).await;
                    deregistered = true;
                }
                _ = tokio::time::sleep(idle.unwrap_or_default()), if idle.is_some() => {
                    info!(session_id = %session_id, "Closing idle session");
                    session.close();
                }
            }
        }

        debug!(session_id = %session_id, "Session task finished");
    }

    async fn apply(session: &mut ChatSession, command: SessionCommand) {
        // A dropped reply channel only means the caller stopped waiting.
        match command {
            SessionCommand::Receive {
                speaker,
                text,
                reply,
            } => {
                let _ = reply.send(session.receive(&speaker, &text).await);
            }
            SessionCommand::Join { agent, reply } => {
                let _ = reply.send(session.join(agent));
            }
            SessionCommand::Announce { text, reply } => {
                let _ = reply.send(session.announce(text));
            }
            SessionCommand::Export { reply } => {
                let _ = reply.send(session.export_transcript());
            }
        }
    }
}

async fn deregister(registry: &Weak<SessionMap>, session_id: &str) {
    let Some(sessions) = registry.upgrade() else {
        return;
    };

    let mut sessions = sessions.write().await;
    // A new session may already have reused the id.
    if sessions
        .get(session_id)
        .is_some_and(|handle| handle.is_closed())
    {
        sessions.remove(session_id);
        debug!(session_id = %session_id, "Session deregistered");
    }
}
