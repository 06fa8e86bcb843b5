use serde::Deserialize;
use serde_json::{Value, json};

use super::{ProcedureContext, parse_input, require_non_empty, require_non_empty_opt, require_uuid};
use crate::database::TopicRepository;
use crate::domain::{NewTopic, TopicPatch};
use crate::error::ApiError;

pub(crate) const TOPIC_NOT_FOUND: &str = "Topic not found or you don't have access to it";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TopicIdInput {
    pub topic_id: String,
}

impl TopicIdInput {
    pub(crate) fn parse(input: Value) -> Result<Self, ApiError> {
        let input: Self = parse_input(input)?;
        require_uuid("topicId", &input.topic_id)?;
        Ok(input)
    }
}

#[derive(Debug, Deserialize)]
struct CreateInput {
    title: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateInput {
    topic_id: String,
    title: Option<String>,
    description: Option<String>,
}

pub async fn get_all(ctx: &ProcedureContext) -> Result<Value, ApiError> {
    let user_id = ctx.user_id()?;
    let topics = ctx.state.database.list_topics(user_id).await?;
    Ok(json!({ "topics": topics }))
}

pub async fn get_by_id(ctx: &ProcedureContext, input: Value) -> Result<Value, ApiError> {
    let user_id = ctx.user_id()?;
    let input = TopicIdInput::parse(input)?;

    let topic = ctx
        .state
        .database
        .find_topic(user_id, &input.topic_id)
        .await?
        .ok_or_else(|| ApiError::not_found(TOPIC_NOT_FOUND))?;
    Ok(json!({ "topic": topic }))
}

pub async fn create(ctx: &ProcedureContext, input: Value) -> Result<Value, ApiError> {
    let user_id = ctx.user_id()?;
    let input: CreateInput = parse_input(input)?;
    require_non_empty(&input.title, "Title is required")?;

    let topic = ctx
        .state
        .database
        .create_topic(
            user_id,
            NewTopic {
                title: input.title,
                description: input.description,
            },
        )
        .await?;
    tracing::info!(user_id = %user_id, topic_id = %topic.id, "Topic created");
    Ok(json!({ "topic": topic }))
}

pub async fn update(ctx: &ProcedureContext, input: Value) -> Result<Value, ApiError> {
    let user_id = ctx.user_id()?;
    let input: UpdateInput = parse_input(input)?;
    require_uuid("topicId", &input.topic_id)?;
    require_non_empty_opt(input.title.as_deref(), "Title is required")?;

    let topic = ctx
        .state
        .database
        .update_topic(
            user_id,
            &input.topic_id,
            TopicPatch {
                title: input.title,
                description: input.description,
            },
        )
        .await?
        .ok_or_else(|| ApiError::not_found(TOPIC_NOT_FOUND))?;
    Ok(json!({ "topic": topic }))
}

pub async fn delete(ctx: &ProcedureContext, input: Value) -> Result<Value, ApiError> {
    let user_id = ctx.user_id()?;
    let input = TopicIdInput::parse(input)?;

    if !ctx.state.database.delete_topic(user_id, &input.topic_id).await? {
        return Err(ApiError::not_found(TOPIC_NOT_FOUND));
    }
    tracing::info!(user_id = %user_id, topic_id = %input.topic_id, "Topic deleted");
    Ok(json!({ "success": true }))
}
