//! Share Service
//!
//! Saves a chat transcript on request and builds the links a user can pass
//! around. Saving never touches the conversation itself: a failure is
//! logged and returned to the caller as a notice.

use crate::session::SessionHandle;
use imagine_core::config::ShareConfig;
use imagine_core::error::{ImagineError, Result};
use imagine_core::session::{TranscriptLocation, TranscriptPersister};
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

const TWEET_INTENT_URL: &str = "https://twitter.com/intent/tweet";

/// Result of a successful share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareReceipt {
    pub location: TranscriptLocation,
    /// Public address of the saved page
    pub page_url: String,
    /// Tweet-intent link announcing the page
    pub share_link: String,
}

pub struct ShareService {
    persister: Arc<dyn TranscriptPersister>,
    public_base_url: String,
    hashtags: String,
}

impl ShareService {
    pub fn new(persister: Arc<dyn TranscriptPersister>, config: &ShareConfig) -> Self {
        Self {
            persister,
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
            hashtags: config.hashtags.clone(),
        }
    }

    /// Saves the session's transcript and returns where it can be found.
    ///
    /// # Errors
    ///
    /// Returns a `Persistence` error if the transcript cannot be exported
    /// or saved. The session keeps running either way.
    pub async fn share(&self, session: &SessionHandle) -> Result<ShareReceipt> {
        let transcript = session.export_transcript().await.map_err(|err| {
            warn!(session_id = session.id(), error = %err, "Failed to export transcript");
            ImagineError::persistence(err.to_string())
        })?;

        let location = self
            .persister
            .save(session.id(), &transcript)
            .await
            .map_err(|err| {
                warn!(session_id = session.id(), error = %err, "Failed to save transcript");
                match err {
                    ImagineError::Persistence(_) => err,
                    other => ImagineError::persistence(other.to_string()),
                }
            })?;

        let page_url = format!("{}/{}", self.public_base_url, location.public_path);
        let share_link = self.share_link(session.context_label(), &page_url)?;
        info!(session_id = session.id(), file = %location.file.display(), "Transcript saved");

        Ok(ShareReceipt {
            location,
            page_url,
            share_link,
        })
    }

    fn share_link(&self, context: &str, page_url: &str) -> Result<String> {
        let message = format!(
            "I just chatted with my {context} favorite characters using {}/\n\nCheckout my conversation {page_url}\n\n{}",
            self.public_base_url, self.hashtags
        );

        Url::parse_with_params(TWEET_INTENT_URL, &[("text", message)])
            .map(String::from)
            .map_err(|err| ImagineError::internal(format!("Invalid share link: {err}")))
    }
}
