//! Gateway: request authentication and identity verification.

pub mod auth;
pub mod identity;

pub use auth::{AuthenticatedUser, Authentication, Claims, auth_middleware, generate_jwt, validate_jwt};
pub use identity::{GoogleIdentityVerifier, IdentityVerifier, VerifiedIdentity};
