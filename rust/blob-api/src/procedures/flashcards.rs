use serde::Deserialize;
use serde_json::{Value, json};

use super::topics::{TOPIC_NOT_FOUND, TopicIdInput};
use super::{ProcedureContext, parse_input, require_non_empty, require_non_empty_opt, require_uuid};
use crate::database::FlashcardRepository;
use crate::domain::{Difficulty, FlashcardPatch, NewFlashcard};
use crate::error::ApiError;

const FLASHCARD_NOT_FOUND: &str = "Flashcard not found or you don't have access to it";

/// Source recorded by `createMany` when the caller gives none.
const DEFAULT_BATCH_SOURCE: &str = "ai-generated";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlashcardIdInput {
    flashcard_id: String,
}

impl FlashcardIdInput {
    fn parse(input: Value) -> Result<Self, ApiError> {
        let input: Self = parse_input(input)?;
        require_uuid("flashcardId", &input.flashcard_id)?;
        Ok(input)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateInput {
    topic_id: String,
    front: String,
    back: String,
    difficulty: Option<Difficulty>,
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CardInput {
    front: String,
    back: String,
    difficulty: Option<Difficulty>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateManyInput {
    topic_id: String,
    flashcards: Vec<CardInput>,
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateInput {
    flashcard_id: String,
    front: Option<String>,
    back: Option<String>,
    difficulty: Option<Difficulty>,
}

pub async fn get_by_topic(ctx: &ProcedureContext, input: Value) -> Result<Value, ApiError> {
    let user_id = ctx.user_id()?;
    let input = TopicIdInput::parse(input)?;

    let cards = ctx
        .state
        .database
        .flashcards_for_topic(user_id, &input.topic_id)
        .await?
        .ok_or_else(|| ApiError::not_found(TOPIC_NOT_FOUND))?;
    Ok(json!({ "flashcards": cards }))
}

pub async fn get_by_id(ctx: &ProcedureContext, input: Value) -> Result<Value, ApiError> {
    let user_id = ctx.user_id()?;
    let input = FlashcardIdInput::parse(input)?;

    let card = ctx
        .state
        .database
        .find_flashcard(user_id, &input.flashcard_id)
        .await?
        .ok_or_else(|| ApiError::not_found(FLASHCARD_NOT_FOUND))?;
    Ok(json!({ "flashcard": card }))
}

pub async fn create(ctx: &ProcedureContext, input: Value) -> Result<Value, ApiError> {
    let user_id = ctx.user_id()?;
    let input: CreateInput = parse_input(input)?;
    require_uuid("topicId", &input.topic_id)?;
    require_non_empty(&input.front, "Front side is required")?;
    require_non_empty(&input.back, "Back side is required")?;

    let card = NewFlashcard {
        front: input.front,
        back: input.back,
        difficulty: input.difficulty,
        source: input.source,
    };
    let mut cards = ctx
        .state
        .database
        .insert_flashcards(user_id, &input.topic_id, vec![card])
        .await?
        .ok_or_else(|| ApiError::not_found(TOPIC_NOT_FOUND))?;
    let card = cards
        .pop()
        .ok_or_else(|| ApiError::internal("Flashcard was not created"))?;
    Ok(json!({ "flashcard": card }))
}

pub async fn create_many(ctx: &ProcedureContext, input: Value) -> Result<Value, ApiError> {
    let user_id = ctx.user_id()?;
    let input: CreateManyInput = parse_input(input)?;
    require_uuid("topicId", &input.topic_id)?;
    for card in &input.flashcards {
        require_non_empty(&card.front, "Front side is required")?;
        require_non_empty(&card.back, "Back side is required")?;
    }

    let source = input
        .source
        .unwrap_or_else(|| DEFAULT_BATCH_SOURCE.to_string());
    let cards = input
        .flashcards
        .into_iter()
        .map(|card| NewFlashcard {
            front: card.front,
            back: card.back,
            difficulty: card.difficulty,
            source: Some(source.clone()),
        })
        .collect();

    let cards = ctx
        .state
        .database
        .insert_flashcards(user_id, &input.topic_id, cards)
        .await?
        .ok_or_else(|| ApiError::not_found(TOPIC_NOT_FOUND))?;
    tracing::info!(user_id = %user_id, topic_id = %input.topic_id, count = cards.len(), "Flashcards created");
    Ok(json!({ "flashcards": cards }))
}

pub async fn update(ctx: &ProcedureContext, input: Value) -> Result<Value, ApiError> {
    let user_id = ctx.user_id()?;
    let input: UpdateInput = parse_input(input)?;
    require_uuid("flashcardId", &input.flashcard_id)?;
    require_non_empty_opt(input.front.as_deref(), "Front side is required")?;
    require_non_empty_opt(input.back.as_deref(), "Back side is required")?;

    let card = ctx
        .state
        .database
        .update_flashcard(
            user_id,
            &input.flashcard_id,
            FlashcardPatch {
                front: input.front,
                back: input.back,
                difficulty: input.difficulty,
            },
        )
        .await?
        .ok_or_else(|| ApiError::not_found(FLASHCARD_NOT_FOUND))?;
    Ok(json!({ "flashcard": card }))
}

pub async fn delete(ctx: &ProcedureContext, input: Value) -> Result<Value, ApiError> {
    let user_id = ctx.user_id()?;
    let input = FlashcardIdInput::parse(input)?;

    if !ctx
        .state
        .database
        .delete_flashcard(user_id, &input.flashcard_id)
        .await?
    {
        return Err(ApiError::not_found(FLASHCARD_NOT_FOUND));
    }
    Ok(json!({ "success": true }))
}

pub async fn delete_by_topic(ctx: &ProcedureContext, input: Value) -> Result<Value, ApiError> {
    let user_id = ctx.user_id()?;
    let input = TopicIdInput::parse(input)?;

    let deleted = ctx
        .state
        .database
        .delete_flashcards_for_topic(user_id, &input.topic_id)
        .await?
        .ok_or_else(|| ApiError::not_found(TOPIC_NOT_FOUND))?;
    tracing::info!(user_id = %user_id, topic_id = %input.topic_id, deleted, "Flashcards cleared");
    Ok(json!({ "success": true }))
}
