//! HTTP API endpoints.

pub mod health;
pub mod trpc;

use axum::Router;

use crate::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new().merge(health::router()).merge(trpc::router())
}
