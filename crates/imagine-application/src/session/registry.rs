use super::task::{SessionCommand, SessionTask};
use imagine_core::agent::Agent;
use imagine_core::error::{ImagineError, Result};
use imagine_core::session::{ChatSession, RoundReport, TranscriptLine};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::info;

pub(crate) type SessionMap = RwLock<HashMap<String, SessionHandle>>;

const COMMAND_QUEUE_CAPACITY: usize = 32;

/// Client side of a live session.
///
/// Cloning is cheap. Every call is queued to the session's task, so calls
/// from any number of handles are applied one at a time in arrival order.
#[derive(Clone)]
pub struct SessionHandle {
    id: String,
    context_label: String,
    human_name: String,
    commands: mpsc::Sender<SessionCommand>,
    closed: CancellationToken,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn context_label(&self) -> &str {
        &self.context_label
    }

    pub fn human_name(&self) -> &str {
        &self.human_name
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Sends a message into the chat and waits for the round to finish.
    ///
    /// # Errors
    ///
    /// Returns `SessionClosed` if the session is closed.
    pub async fn receive(&self, speaker: &str, text: &str) -> Result<RoundReport> {
        self.ensure_open()?;
        let (reply, response) = oneshot::channel();
        self.request(
            SessionCommand::Receive {
                speaker: speaker.to_string(),
                text: text.to_string(),
                reply,
            },
            response,
        )
        .await?
    }

    /// Adds an agent to the roster.
    ///
    /// # Errors
    ///
    /// - `DuplicateAgent` if the name is already taken
    /// - `SessionClosed` if the session is closed
    pub async fn join(&self, agent: Agent) -> Result<()> {
        self.ensure_open()?;
        let (reply, response) = oneshot::channel();
        self.request(SessionCommand::Join { agent, reply }, response)
            .await?
    }

    /// Appends a system announcement.
    pub async fn announce(&self, text: impl Into<String>) -> Result<()> {
        self.ensure_open()?;
        let (reply, response) = oneshot::channel();
        self.request(
            SessionCommand::Announce {
                text: text.into(),
                reply,
            },
            response,
        )
        .await?
    }

    /// Snapshot of the spoken lines. Still available after closing.
    pub async fn export_transcript(&self) -> Result<Vec<TranscriptLine>> {
        let (reply, response) = oneshot::channel();
        self.request(SessionCommand::Export { reply }, response)
            .await
    }

    /// Stops the session from receiving.
    ///
    /// An in-flight generation is not aborted; its result is dropped.
    pub fn close(&self) {
        self.closed.cancel();
    }

    async fn request<T>(
        &self,
        command: SessionCommand,
        response: oneshot::Receiver<T>,
    ) -> Result<T> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ImagineError::session_closed(&self.id))?;
        response
            .await
            .map_err(|_| ImagineError::session_closed(&self.id))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(ImagineError::session_closed(&self.id));
        }
        Ok(())
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Maps session ids to live sessions.
///
/// `SessionRegistry` is responsible for:
/// - Spawning one task per session
/// - Rejecting duplicate ids
/// - Looking sessions up for inbound messages
/// - Closing sessions explicitly or after an idle timeout
pub struct SessionRegistry {
    /// Live sessions by id
    sessions: Arc<SessionMap>,
    /// Idle period after which a session closes itself
    idle_timeout: Option<Duration>,
}

impl SessionRegistry {
    /// Creates an empty registry whose sessions never expire.
    pub fn new() -> Self {
        Self::with_idle_timeout(None)
    }

    /// Creates an empty registry closing sessions idle for `idle_timeout`.
    pub fn with_idle_timeout(idle_timeout: Option<Duration>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout,
        }
    }

    /// Registers `session` and spawns its task.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateSession` if a live session already uses the id.
    pub async fn create(&self, session: ChatSession) -> Result<SessionHandle> {
        let mut sessions = self.sessions.write().await;

        if sessions
            .get(session.id())
            .is_some_and(|existing| !existing.is_closed())
        {
            return Err(ImagineError::duplicate_session(session.id()));
        }

        let (commands, receiver) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let handle = SessionHandle {
            id: session.id().to_string(),
            context_label: session.context_label().to_string(),
            human_name: session.human_name().to_string(),
            commands,
            closed: session.close_token(),
        };

        let task = SessionTask {
            session,
            commands: receiver,
            idle_timeout: self.idle_timeout,
            registry: Arc::downgrade(&self.sessions),
        };
        tokio::spawn(task.run());

        sessions.insert(handle.id.clone(), handle.clone());
        info!(session_id = %handle.id, live = sessions.len(), "Session registered");

        Ok(handle)
    }

    /// Returns the live session registered under `session_id`.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` if no live session uses the id.
    pub async fn get(&self, session_id: &str) -> Result<SessionHandle> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .filter(|handle| !handle.is_closed())
            .cloned()
            .ok_or_else(|| ImagineError::session_not_found(session_id))
    }

    /// Dispatches a message to the session owning `session_id`.
    pub async fn dispatch(&self, session_id: &str, speaker: &str, text: &str) -> Result<RoundReport> {
        self.get(session_id).await?.receive(speaker, text).await
    }

    /// Closes and removes a session.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` if no session uses the id.
    pub async fn close(&self, session_id: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let handle = sessions
            .remove(session_id)
            .ok_or_else(|| ImagineError::session_not_found(session_id))?;
        handle.close();
        info!(session_id = %session_id, "Session closed");
        Ok(())
    }

    /// Closes every session.
    pub async fn close_all(&self) {
        let mut sessions = self.sessions.write().await;
        for (_, handle) in sessions.drain() {
            handle.close();
        }
    }

    /// Ids of the live sessions.
    pub async fn session_ids(&self) -> Vec<String> {
        let sessions = self.sessions.read().await;
        sessions
            .values()
            .filter(|handle| !handle.is_closed())
            .map(|handle| handle.id.clone())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.session_ids().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{EchoGenerator, agent};
    use imagine_core::session::NullSink;

    fn session(id: &str) -> ChatSession {
        ChatSession::create(id, "seinfeld", "Jerry", Arc::new(NullSink))
    }

    #[tokio::test]
    async fn test_create_and_dispatch() {
        let registry = SessionRegistry::new();
        let handle = registry.create(session("s1")).await.unwrap();
        handle
            .join(agent("Elaine", Arc::new(EchoGenerator::default())))
            .await
            .unwrap();

        let report = registry
            .dispatch("s1", "Jerry", "Elaine, what do you think?")
            .await
            .unwrap();
        assert_eq!(report.replied, vec!["Elaine"]);

        let transcript = handle.export_transcript().await.unwrap();
        assert_eq!(
            transcript,
            vec![
                TranscriptLine::new("Jerry", "Elaine, what do you think?"),
                TranscriptLine::new("Elaine", "Elaine heard 2 lines"),
            ]
        );
    }

    #[tokio::test]
    async fn test_duplicate_id_is_rejected() {
        let registry = SessionRegistry::new();
        registry.create(session("dup")).await.unwrap();

        let err = registry.create(session("dup")).await.unwrap_err();
        assert_eq!(err, ImagineError::duplicate_session("dup"));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_close_removes_and_rejects() {
        let registry = SessionRegistry::new();
        let handle = registry.create(session("s2")).await.unwrap();
        handle.receive("Jerry", "hello").await.unwrap();

        registry.close("s2").await.unwrap();

        assert!(registry.get("s2").await.unwrap_err().is_not_found());
        assert!(handle.receive("Jerry", "hello?").await.unwrap_err().is_closed());
        assert_eq!(handle.export_transcript().await.unwrap().len(), 1);
        assert!(registry.close("s2").await.unwrap_err().is_not_found());

        // The id is free again.
        registry.create(session("s2")).await.unwrap();
    }

    #[tokio::test]
    async fn test_handle_close_deregisters() {
        let registry = SessionRegistry::new();
        let handle = registry.create(session("s3")).await.unwrap();

        handle.close();
        // Wait until the task has processed the close.
        for _ in 0..100 {
            if registry.sessions.read().await.is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert!(registry.sessions.read().await.is_empty());
        assert!(registry.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_session_expires() {
        let registry = SessionRegistry::with_idle_timeout(Some(Duration::from_secs(600)));
        let handle = registry.create(session("idle")).await.unwrap();
        handle.receive("Jerry", "anyone?").await.unwrap();

        tokio::time::sleep(Duration::from_secs(601)).await;
        for _ in 0..100 {
            tokio::task::yield_now().await;
        }

        assert!(handle.is_closed());
        assert!(registry.get("idle").await.unwrap_err().is_not_found());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_sessions_run_independently() {
        let registry = Arc::new(SessionRegistry::new());
        let mut tasks = Vec::new();

        for i in 0..8 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                let id = format!("parallel-{i}");
                let handle = registry.create(session(&id)).await.unwrap();
                handle
                    .join(agent("George", Arc::new(EchoGenerator::default())))
                    .await
                    .unwrap();
                for _ in 0..5 {
                    registry.dispatch(&id, "Jerry", "George!").await.unwrap();
                }
                handle.export_transcript().await.unwrap().len()
            }));
        }

        for task in tasks {
            assert_eq!(task.await.unwrap(), 10);
        }
        assert_eq!(registry.len().await, 8);
    }

    #[tokio::test]
    async fn test_queued_messages_are_serialized() {
        let registry = SessionRegistry::new();
        let handle = registry.create(session("queue")).await.unwrap();
        handle
            .join(agent("Kramer", Arc::new(EchoGenerator::default())))
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            handle.receive("Jerry", "Kramer, one"),
            handle.receive("George", "Kramer, two"),
        );
        a.unwrap();
        b.unwrap();

        let transcript = handle.export_transcript().await.unwrap();
        assert_eq!(transcript.len(), 4);
        // Each message is directly followed by its own reply.
        assert_eq!(transcript[1].speaker, "Kramer");
        assert_eq!(transcript[3].speaker, "Kramer");
        assert_eq!(transcript[3].text, "Kramer heard 4 lines");
    }
}
