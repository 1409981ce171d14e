pub mod html_transcript_persister;
pub mod paths;
pub mod storage;

pub use crate::html_transcript_persister::HtmlTranscriptPersister;
pub use crate::paths::ImaginePaths;
pub use crate::storage::{ConfigStorage, SecretStorage};
