//! Character suggestion.
//!
//! Session setup asks a [`CharacterSuggestionService`] for the characters of
//! a context before any agent exists. The scheduler never touches it.

use crate::error::Result;
use async_trait::async_trait;

/// Suggests candidate character names for a context (a show, a movie...).
#[async_trait]
pub trait CharacterSuggestionService: Send + Sync {
    async fn suggest(&self, context: &str) -> Result<Vec<String>>;
}

/// Parses a `;`-separated list of names.
///
/// Names are trimmed; empty entries and repeats are dropped while the
/// original order is kept.
pub fn parse_character_list(raw: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in raw.split(';').map(str::trim) {
        if !name.is_empty() && !names.iter().any(|existing| existing == name) {
            names.push(name.to_string());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_character_list() {
        let names = parse_character_list(" Jerry Seinfeld; Elaine Benes ;George Costanza; ");
        assert_eq!(names, vec!["Jerry Seinfeld", "Elaine Benes", "George Costanza"]);
    }

    #[test]
    fn test_parse_drops_repeats_and_blanks() {
        let names = parse_character_list("Kramer;;Newman; Kramer");
        assert_eq!(names, vec!["Kramer", "Newman"]);
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_character_list("").is_empty());
        assert!(parse_character_list(" ; ; ").is_empty());
    }
}
