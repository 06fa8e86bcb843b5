use serde::Deserialize;
use serde_json::{Value, json};

use super::{ProcedureContext, parse_input};
use crate::database::UserRepository;
use crate::domain::NewUser;
use crate::error::ApiError;
use crate::gateway::generate_jwt;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyTokenInput {
    id_token: String,
}

/// Exchange a provider ID token for a session token. Public.
pub async fn verify_google_token(ctx: &ProcedureContext, input: Value) -> Result<Value, ApiError> {
    let input: VerifyTokenInput = parse_input(input)?;
    let state = &ctx.state;

    let identity = state.identity.verify(&input.id_token).await.map_err(|e| {
        tracing::warn!(error = %e, "ID token verification failed");
        ApiError::unauthorized(format!("Token verification failed: {e}"))
    })?;

    let (user, created) = state
        .database
        .record_oauth_login(
            state.identity.provider_id(),
            &identity.subject,
            NewUser {
                name: identity.name.unwrap_or_else(|| "Unknown".to_string()),
                email: identity.email,
                image: identity.picture,
            },
        )
        .await?;
    tracing::info!(user_id = %user.id, new_user = created, "User signed in");

    let secret = state
        .config
        .gateway
        .jwt_secret
        .as_deref()
        .ok_or_else(|| ApiError::internal("Token signing is not configured"))?;
    let token = generate_jwt(&user.id, secret, state.config.gateway.jwt_expiry_days)?;

    Ok(json!({
        "success": true,
        "user": {
            "id": user.id,
            "name": user.name,
            "email": user.email,
            "image": user.image,
        },
        "token": token,
    }))
}

pub async fn get_me(ctx: &ProcedureContext) -> Result<Value, ApiError> {
    let user_id = ctx.user_id()?;
    let user = ctx
        .state
        .database
        .find_user(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(json!({ "user": user }))
}

/// Tokens are stateless; the client discards its copy.
pub async fn sign_out(ctx: &ProcedureContext) -> Result<Value, ApiError> {
    ctx.user_id()?;
    Ok(json!({ "success": true }))
}
