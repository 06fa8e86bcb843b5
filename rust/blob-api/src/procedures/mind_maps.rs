use serde::Deserialize;
use serde_json::{Value, json};

use super::topics::{TOPIC_NOT_FOUND, TopicIdInput};
use super::{ProcedureContext, parse_input, require_uuid};
use crate::database::MindMapRepository;
use crate::domain::MindMapData;
use crate::error::ApiError;

const MIND_MAP_NOT_FOUND: &str = "Mind map not found or you don't have access to it";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MindMapIdInput {
    mind_map_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateInput {
    topic_id: String,
    data: MindMapData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateInput {
    mind_map_id: String,
    data: MindMapData,
}

pub async fn get_by_topic(ctx: &ProcedureContext, input: Value) -> Result<Value, ApiError> {
    let user_id = ctx.user_id()?;
    let input = TopicIdInput::parse(input)?;

    let maps = ctx
        .state
        .database
        .mind_maps_for_topic(user_id, &input.topic_id)
        .await?
        .ok_or_else(|| ApiError::not_found(TOPIC_NOT_FOUND))?;
    Ok(json!({ "mindMaps": maps }))
}

pub async fn get_by_id(ctx: &ProcedureContext, input: Value) -> Result<Value, ApiError> {
    let user_id = ctx.user_id()?;
    let input: MindMapIdInput = parse_input(input)?;
    require_uuid("mindMapId", &input.mind_map_id)?;

    let map = ctx
        .state
        .database
        .find_mind_map(user_id, &input.mind_map_id)
        .await?
        .ok_or_else(|| ApiError::not_found(MIND_MAP_NOT_FOUND))?;
    Ok(json!({ "mindMap": map }))
}

pub async fn create(ctx: &ProcedureContext, input: Value) -> Result<Value, ApiError> {
    let user_id = ctx.user_id()?;
    let input: CreateInput = parse_input(input)?;
    require_uuid("topicId", &input.topic_id)?;
    input.data.validate_tree().map_err(ApiError::bad_request)?;

    let map = ctx
        .state
        .database
        .create_mind_map(user_id, &input.topic_id, input.data)
        .await?
        .ok_or_else(|| ApiError::not_found(TOPIC_NOT_FOUND))?;
    Ok(json!({ "mindMap": map }))
}

pub async fn update(ctx: &ProcedureContext, input: Value) -> Result<Value, ApiError> {
    let user_id = ctx.user_id()?;
    let input: UpdateInput = parse_input(input)?;
    require_uuid("mindMapId", &input.mind_map_id)?;
    input.data.validate_tree().map_err(ApiError::bad_request)?;

    let map = ctx
        .state
        .database
        .update_mind_map(user_id, &input.mind_map_id, input.data)
        .await?
        .ok_or_else(|| ApiError::not_found(MIND_MAP_NOT_FOUND))?;
    Ok(json!({ "mindMap": map }))
}

pub async fn delete(ctx: &ProcedureContext, input: Value) -> Result<Value, ApiError> {
    let user_id = ctx.user_id()?;
    let input: MindMapIdInput = parse_input(input)?;
    require_uuid("mindMapId", &input.mind_map_id)?;

    if !ctx
        .state
        .database
        .delete_mind_map(user_id, &input.mind_map_id)
        .await?
    {
        return Err(ApiError::not_found(MIND_MAP_NOT_FOUND));
    }
    Ok(json!({ "success": true }))
}
