pub mod openai;

pub use openai::OpenAiTranslator;

use crate::error::Result;
use async_trait::async_trait;

/// Languages offered for dubbing, as (display name, synthesis language code).
pub const LANGUAGES: [(&str, &str); 10] = [
    ("Telugu", "te-IN"),
    ("Kannada", "kn-IN"),
    ("Malayalam", "ml-IN"),
    ("Punjabi", "pa-IN"),
    ("Gujarati", "gu-IN"),
    ("Marathi", "mr-IN"),
    ("Bengali", "bn-IN"),
    ("Tamil", "ta"),
    ("Hindi", "hi"),
    ("English", "en"),
];

/// Synthesis language code for a display name, case-insensitively.
pub fn language_code(name: &str) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name.trim()))
        .map(|(_, code)| *code)
}

/// Display name for a synthesis language code, case-insensitively.
pub fn language_name(code: &str) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .find(|(_, c)| c.eq_ignore_ascii_case(code.trim()))
        .map(|(name, _)| *name)
}

#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` into the language called `language` (e.g. "Bengali").
    async fn translate(&self, text: &str, language: &str) -> Result<String>;
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_lookup() {
        assert_eq!(language_code("Telugu"), Some("te-IN"));
        assert_eq!(language_code("hindi"), Some("hi"));
        assert_eq!(language_code("Klingon"), None);
        assert_eq!(language_name("BN-in"), Some("Bengali"));
        assert_eq!(language_name("en"), Some("English"));
    }
}
