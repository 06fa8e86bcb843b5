//! Gemini `generateContent` client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

use super::{ContentGenerator, GeneratedFlashcard, GenerationError, flashcard_prompt, parse_flashcards};
use crate::config::GenerationConfig;
use crate::logging::OpTimer;

#[derive(Debug, Clone)]
pub struct GeminiGenerator {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
            .filter(|t| !t.is_empty())
    }
}

impl GeminiGenerator {
    pub fn new(config: &GenerationConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn api_url(&self, model: &str) -> String {
        format!("{}/v1beta/models/{model}:generateContent", self.base_url)
    }
}

/// User-facing message for a non-success status.
fn status_message(status: StatusCode, body: &str) -> String {
    match status {
        StatusCode::BAD_REQUEST => "Invalid API key or request format".to_string(),
        StatusCode::TOO_MANY_REQUESTS => {
            "API rate limit exceeded. Please try again later.".to_string()
        }
        StatusCode::FORBIDDEN => {
            "API key does not have permission to access Gemini API".to_string()
        }
        _ => match serde_json::from_str::<serde_json::Value>(body) {
            Ok(value) => value["error"]["message"]
                .as_str()
                .filter(|m| !m.is_empty())
                .map(String::from)
                .unwrap_or_else(|| "Failed to generate flashcards".to_string()),
            Err(_) => format!("API error: {status}"),
        },
    }
}

#[async_trait]
impl ContentGenerator for GeminiGenerator {
    async fn generate_flashcards(
        &self,
        api_key: &str,
        model: &str,
        content: &str,
    ) -> Result<Vec<GeneratedFlashcard>, GenerationError> {
        let timer = OpTimer::new("generation", "flashcards");
        let body = json!({
            "contents": [{ "parts": [{ "text": flashcard_prompt(content) }] }]
        });

        let response = self
            .client
            .post(self.api_url(model))
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, model = %model, "Gemini API returned an error");
            return Err(GenerationError::Upstream(status_message(status, &text)));
        }

        let reply: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(e.without_url().to_string()))?;
        let text = reply.first_text().ok_or(GenerationError::EmptyResponse)?;

        let result = parse_flashcards(&text);
        timer.finish_with_result(result.as_ref());
        result
    }
}
