//! Procedure error type.
//!
//! Every procedure failure is one of a handful of coded errors. The code
//! decides the HTTP status and the JSON-RPC style numeric code reported in
//! the error envelope.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

/// Coded procedure error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Malformed input or a violated input rule.
    #[error("{0}")]
    BadRequest(String),
    /// Missing, invalid or expired token.
    #[error("{0}")]
    Unauthorized(String),
    /// Row does not exist or belongs to someone else. The two are not
    /// distinguished.
    #[error("{0}")]
    NotFound(String),
    /// Query called with POST or mutation called with GET.
    #[error("{0}")]
    MethodNotSupported(String),
    /// Upstream rate limit.
    #[error("{0}")]
    TooManyRequests(String),
    /// Anything else.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Wire name of the code, e.g. `NOT_FOUND`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::MethodNotSupported(_) => "METHOD_NOT_SUPPORTED",
            Self::TooManyRequests(_) => "TOO_MANY_REQUESTS",
            Self::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// JSON-RPC 2.0 numeric code.
    pub fn rpc_code(&self) -> i32 {
        match self {
            Self::BadRequest(_) => -32600,
            Self::Unauthorized(_) => -32001,
            Self::NotFound(_) => -32004,
            Self::MethodNotSupported(_) => -32005,
            Self::TooManyRequests(_) => -32029,
            Self::Internal(_) => -32603,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotSupported(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error envelope body, tagged with the procedure path when known.
    pub fn to_envelope(&self, path: Option<&str>) -> Value {
        let mut data = json!({
            "code": self.code(),
            "httpStatus": self.status().as_u16(),
        });
        if let Some(path) = path {
            data["path"] = Value::String(path.to_string());
        }
        json!({
            "error": {
                "message": self.to_string(),
                "code": self.rpc_code(),
                "data": data,
            }
        })
    }
}

/// Store and plumbing failures surface as a generic internal error; the
/// cause is logged, not returned.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!(error = %format!("{err:#}"), "Internal error");
        Self::Internal("An internal error occurred".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.to_envelope(None))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let err = ApiError::not_found("Topic not found or you don't have access to it");
        let body = err.to_envelope(Some("topics.getById"));

        assert_eq!(
            body["error"]["message"],
            "Topic not found or you don't have access to it"
        );
        assert_eq!(body["error"]["code"], -32004);
        assert_eq!(body["error"]["data"]["code"], "NOT_FOUND");
        assert_eq!(body["error"]["data"]["httpStatus"], 404);
        assert_eq!(body["error"]["data"]["path"], "topics.getById");
    }

    #[test]
    fn test_anyhow_is_masked() {
        let err: ApiError = anyhow::anyhow!("disk I/O error").into();
        assert_eq!(err.code(), "INTERNAL_SERVER_ERROR");
        assert!(!err.to_string().contains("disk"));
    }
}
