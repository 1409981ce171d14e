//! Transcript persister writing static HTML pages.
//!
//! Each shared chat becomes `<dir>/<session id>.html`, one
//! `speaker: text<br/>` line per entry, served by the site under `static/`.

use async_trait::async_trait;
use imagine_core::error::{ImagineError, Result};
use imagine_core::session::{TranscriptLine, TranscriptLocation, TranscriptPersister};
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

const PUBLIC_PREFIX: &str = "static";

pub struct HtmlTranscriptPersister {
    dir: PathBuf,
}

impl HtmlTranscriptPersister {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }
}

#[async_trait]
impl TranscriptPersister for HtmlTranscriptPersister {
    async fn save(
        &self,
        session_id: &str,
        transcript: &[TranscriptLine],
    ) -> Result<TranscriptLocation> {
        if session_id.is_empty() || !session_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(ImagineError::persistence(format!(
                "Refusing to save transcript for session id '{session_id}'"
            )));
        }

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ImagineError::persistence(format!("{}: {e}", self.dir.display())))?;

        let file_name = format!("{session_id}.html");
        let file = self.dir.join(&file_name);
        fs::write(&file, render_html(transcript))
            .await
            .map_err(|e| ImagineError::persistence(format!("{}: {e}", file.display())))?;

        debug!(file = %file.display(), lines = transcript.len(), "Transcript written");
        Ok(TranscriptLocation {
            file,
            public_path: format!("{PUBLIC_PREFIX}/{file_name}"),
        })
    }
}

fn render_html(transcript: &[TranscriptLine]) -> String {
    let mut html = String::new();
    for line in transcript {
        html.push_str(&escape_html(&line.speaker));
        html.push_str(": ");
        html.push_str(&escape_html(&line.text));
        html.push_str("<br/>\n");
    }
    html
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
