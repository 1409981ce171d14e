use serde::{Deserialize, Serialize};

/// System instruction that keeps a generator in character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaPrompt(String);

impl PersonaPrompt {
    /// Builds the role-play instruction for `name` from `context`
    /// (a show, a movie, a book...).
    pub fn for_character(name: &str, context: &str) -> Self {
        Self(format!(
            "Your name is {name}.\n\
             You will respond only as {name} from {context}.\n\
             Each message you send will be exactly as this character.\n\
             Do not add anything beyond your own response."
        ))
    }

    /// Wraps a hand-written instruction.
    pub fn custom(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PersonaPrompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
