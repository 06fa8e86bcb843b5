//! `generate.flashcards`: one upstream call, validated reply, one transaction.

use serde::Deserialize;
use serde_json::{Value, json};

use super::topics::TOPIC_NOT_FOUND;
use super::{ProcedureContext, parse_input, require_non_empty};
use crate::database::{FlashcardRepository, SettingsRepository, TopicRepository};
use crate::domain::{AiProvider, NewFlashcard};
use crate::error::ApiError;

const GENERATED_SOURCE: &str = "gemini";

const MISSING_KEY: &str = "Gemini API key not found. Please configure your API key in settings.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlashcardsInput {
    topic_id: String,
    content: String,
}

pub async fn flashcards(ctx: &ProcedureContext, input: Value) -> Result<Value, ApiError> {
    let user_id = ctx.user_id()?;
    let input: FlashcardsInput = parse_input(input)?;
    if uuid::Uuid::parse_str(&input.topic_id).is_err() {
        return Err(ApiError::bad_request("Invalid topic ID"));
    }
    require_non_empty(&input.content, "Content cannot be empty")?;

    let state = &ctx.state;
    state
        .database
        .find_topic(user_id, &input.topic_id)
        .await?
        .ok_or_else(|| ApiError::not_found(TOPIC_NOT_FOUND))?;

    let settings = state.database.get_settings(user_id).await?;
    let (encrypted, model) = match settings {
        Some(s) if s.ai_provider != AiProvider::Google => {
            return Err(ApiError::bad_request(format!(
                "Flashcard generation requires the google provider, configured provider is {}",
                s.ai_provider
            )));
        }
        Some(s) => match s.encrypted_api_key {
            Some(key) => (key, s.preferred_model),
            None => return Err(ApiError::bad_request(MISSING_KEY)),
        },
        None => return Err(ApiError::bad_request(MISSING_KEY)),
    };
    let api_key = state.keys.decrypt(&encrypted)?;
    let model = model.unwrap_or_else(|| state.config.generation.default_model.clone());

    let generated = state
        .generator
        .generate_flashcards(&api_key, &model, &input.content)
        .await
        .map_err(|e| {
            tracing::warn!(user_id = %user_id, topic_id = %input.topic_id, error = %e, "Flashcard generation failed");
            ApiError::from(e)
        })?;

    let cards = generated
        .into_iter()
        .map(|card| NewFlashcard {
            front: card.front,
            back: card.back,
            difficulty: card.difficulty,
            source: Some(GENERATED_SOURCE.to_string()),
        })
        .collect();
    let inserted = state
        .database
        .insert_flashcards(user_id, &input.topic_id, cards)
        .await
        .map_err(|e| {
            tracing::error!(error = %format!("{e:#}"), "Failed to save generated flashcards");
            ApiError::internal(format!("Failed to save flashcards to database: {e}"))
        })?
        .ok_or_else(|| ApiError::not_found(TOPIC_NOT_FOUND))?;

    tracing::info!(
        user_id = %user_id,
        topic_id = %input.topic_id,
        model = %model,
        count = inserted.len(),
        "Flashcards generated"
    );
    Ok(json!({
        "success": true,
        "count": inserted.len(),
        "flashcards": inserted,
    }))
}
