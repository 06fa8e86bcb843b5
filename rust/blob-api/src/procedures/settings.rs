use serde::Deserialize;
use serde_json::{Value, json};

use super::{ProcedureContext, parse_input, require_non_empty, require_non_empty_opt};
use crate::database::SettingsRepository;
use crate::domain::{AiProvider, SettingsView};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateAiProviderInput {
    provider: AiProvider,
    api_key: String,
    model: Option<String>,
}

pub async fn get(ctx: &ProcedureContext) -> Result<Value, ApiError> {
    let user_id = ctx.user_id()?;
    let settings = ctx.state.database.get_settings(user_id).await?;
    Ok(json!({ "settings": SettingsView::from(settings.as_ref()) }))
}

pub async fn update_ai_provider(ctx: &ProcedureContext, input: Value) -> Result<Value, ApiError> {
    let user_id = ctx.user_id()?;
    let input: UpdateAiProviderInput = parse_input(input)?;
    require_non_empty(&input.api_key, "API key is required")?;
    require_non_empty_opt(input.model.as_deref(), "Model cannot be empty")?;

    let encrypted = ctx.state.keys.encrypt(&input.api_key)?;
    let settings = ctx
        .state
        .database
        .upsert_ai_provider(user_id, input.provider, encrypted, input.model)
        .await?;
    tracing::info!(user_id = %user_id, provider = %settings.ai_provider, "AI provider updated");
    Ok(json!({ "success": true, "provider": settings.ai_provider }))
}

pub async fn remove_api_key(ctx: &ProcedureContext) -> Result<Value, ApiError> {
    let user_id = ctx.user_id()?;
    let cleared = ctx.state.database.clear_api_key(user_id).await?;
    tracing::info!(user_id = %user_id, cleared, "API key removed");
    Ok(json!({ "success": true }))
}

/// Confirms a key is stored and still decrypts. No upstream call is made.
pub async fn validate_api_key(ctx: &ProcedureContext) -> Result<Value, ApiError> {
    let user_id = ctx.user_id()?;
    let encrypted = ctx
        .state
        .database
        .get_settings(user_id)
        .await?
        .and_then(|s| s.encrypted_api_key)
        .ok_or_else(|| ApiError::bad_request("No API key configured"))?;

    ctx.state.keys.decrypt(&encrypted)?;
    Ok(json!({ "valid": true }))
}
