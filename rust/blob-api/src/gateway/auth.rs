//! Bearer token authentication.
//!
//! The middleware never rejects a request on its own. It resolves the
//! `Authorization` header into an [`Authentication`] and stores it in the
//! request extensions; protected procedures turn a missing or invalid
//! credential into `UNAUTHORIZED` through [`Authentication::user_id`]. Public
//! procedures ignore it.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

const MISSING_HEADER: &str = "Missing or invalid authorization header";
const INVALID_TOKEN: &str = "Invalid or expired token";

/// Token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: String,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued at (Unix timestamp).
    pub iat: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

/// Outcome of reading the request credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    /// No `Authorization: Bearer` header.
    Missing,
    /// Bad signature, malformed or expired token, or no secret configured.
    Invalid,
    User(AuthenticatedUser),
}

impl Authentication {
    /// User id of an authenticated caller, `UNAUTHORIZED` otherwise.
    pub fn user_id(&self) -> Result<&str, ApiError> {
        match self {
            Self::User(user) => Ok(&user.user_id),
            Self::Missing => Err(ApiError::unauthorized(MISSING_HEADER)),
            Self::Invalid => Err(ApiError::unauthorized(INVALID_TOKEN)),
        }
    }

    /// Resolve an `Authorization` header value.
    pub fn from_header(header: Option<&str>, secret: Option<&str>) -> Self {
        let Some(token) = header.and_then(|h| h.strip_prefix("Bearer ")) else {
            return Self::Missing;
        };
        let Some(secret) = secret else {
            tracing::warn!("Bearer token received but no token secret is configured");
            return Self::Invalid;
        };

        match validate_jwt(token, secret) {
            Ok(claims) => Self::User(AuthenticatedUser {
                user_id: claims.user_id,
            }),
            Err(e) => {
                tracing::debug!(error = %e, "Token validation failed");
                Self::Invalid
            }
        }
    }
}

/// Sign an HS256 token for `user_id` valid for `expiry_days`.
pub fn generate_jwt(user_id: &str, secret: &str, expiry_days: i64) -> anyhow::Result<String> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        user_id: user_id.to_string(),
        exp: now + expiry_days * 24 * 60 * 60,
        iat: now,
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

pub fn validate_jwt(token: &str, secret: &str) -> anyhow::Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(data.claims)
}

/// Attach an [`Authentication`] to every request.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());
    let auth = Authentication::from_header(header, state.config.gateway.jwt_secret.as_deref());

    req.extensions_mut().insert(auth);
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_token_roundtrip_carries_user_id() {
        let token = generate_jwt("user-1", SECRET, 7).expect("sign");
        let claims = validate_jwt(&token, SECRET).expect("validate");

        assert_eq!(claims.user_id, "user-1");
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
    }

    #[test]
    fn test_header_outcomes() {
        let token = generate_jwt("user-1", SECRET, 7).expect("sign");
        let bearer = format!("Bearer {token}");

        assert_eq!(
            Authentication::from_header(Some(&bearer), Some(SECRET)).user_id(),
            Ok("user-1")
        );
        assert_eq!(
            Authentication::from_header(None, Some(SECRET)),
            Authentication::Missing
        );
        assert_eq!(
            Authentication::from_header(Some(&token), Some(SECRET)),
            Authentication::Missing
        );
        assert_eq!(
            Authentication::from_header(Some(&bearer), Some("other-secret")),
            Authentication::Invalid
        );
        assert_eq!(
            Authentication::from_header(Some(&bearer), None),
            Authentication::Invalid
        );
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = generate_jwt("user-1", SECRET, -1).expect("sign");
        let err = Authentication::from_header(Some(&format!("Bearer {token}")), Some(SECRET))
            .user_id()
            .expect_err("expired");
        assert_eq!(err, ApiError::unauthorized("Invalid or expired token"));
    }

    #[test]
    fn test_missing_header_message() {
        let err = Authentication::Missing.user_id().expect_err("missing");
        assert_eq!(err.to_string(), "Missing or invalid authorization header");
    }
}
