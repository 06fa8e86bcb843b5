//! Flashcard generation through an external generative API.
//!
//! [`ContentGenerator`] is the seam the `generate.*` procedures call. The
//! production implementation is [`GeminiGenerator`]; tests point it at a
//! local server through `generation.base_url`.

pub mod gemini;
pub mod parse;

pub use gemini::GeminiGenerator;
pub use parse::{parse_flashcards, strip_code_fences};

use async_trait::async_trait;

use crate::domain::Difficulty;
use crate::error::ApiError;

/// One validated card from a model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFlashcard {
    pub front: String,
    pub back: String,
    pub difficulty: Option<Difficulty>,
}

/// Generation failure. The message text decides how it is reported to the
/// caller, see [`From<GenerationError> for ApiError`](ApiError).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// Non-success upstream status, already mapped to a user-facing message.
    #[error("{0}")]
    Upstream(String),
    #[error("Failed to reach Gemini API: {0}")]
    Transport(String),
    #[error("No content received from Gemini API")]
    EmptyResponse,
    #[error("Failed to parse flashcards from API response: {0}")]
    Malformed(String),
    #[error("API response is not an array of flashcards")]
    NotAnArray,
    #[error("Invalid flashcard format: missing front or back")]
    MissingSide,
    #[error("Invalid flashcard format: front and back must be strings")]
    NonStringSide,
    #[error("Invalid difficulty level: {0}")]
    InvalidDifficulty(String),
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        let message = err.to_string();
        if message.contains("API key") || message.contains("permission") {
            Self::Unauthorized(message)
        } else if message.contains("rate limit") {
            Self::TooManyRequests(message)
        } else {
            Self::Internal(message)
        }
    }
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Make exactly one upstream call and return the validated cards.
    async fn generate_flashcards(
        &self,
        api_key: &str,
        model: &str,
        content: &str,
    ) -> Result<Vec<GeneratedFlashcard>, GenerationError>;
}

/// Prompt asking for a bare JSON array of cards.
pub fn flashcard_prompt(content: &str) -> String {
    format!(
        r#"Generate flashcards from the following topic content. Return ONLY a valid JSON array of flashcards, where each flashcard has:
- "front": the question or prompt (string)
- "back": the answer or explanation (string)
- "difficulty": optional difficulty level ("easy", "medium", or "hard")

Topic content:
{content}

Return format (JSON array only, no markdown, no code blocks):
[
  {{
    "front": "Question here",
    "back": "Answer here",
    "difficulty": "easy"
  }}
]"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let cases = [
            (
                GenerationError::Upstream("Invalid API key or request format".into()),
                "UNAUTHORIZED",
            ),
            (
                GenerationError::Upstream(
                    "API key does not have permission to access Gemini API".into(),
                ),
                "UNAUTHORIZED",
            ),
            (
                GenerationError::Upstream("API rate limit exceeded. Please try again later.".into()),
                "TOO_MANY_REQUESTS",
            ),
            (GenerationError::EmptyResponse, "INTERNAL_SERVER_ERROR"),
            (GenerationError::MissingSide, "INTERNAL_SERVER_ERROR"),
        ];

        for (err, code) in cases {
            let message = err.to_string();
            let api: ApiError = err.into();
            assert_eq!(api.code(), code, "{message}");
            assert_eq!(api.to_string(), message);
        }
    }

    #[test]
    fn test_prompt_embeds_content() {
        let prompt = flashcard_prompt("Photosynthesis converts light to energy.");
        assert!(prompt.contains("Photosynthesis converts light to energy."));
        assert!(prompt.contains("\"front\": \"Question here\""));
    }
}
