//! Blob API: study-aid backend for flashcards, quizzes and mind maps.
//!
//! Clients call named procedures over HTTP (`/trpc/{path}`). Each protected
//! procedure reads the caller's identity from a bearer token, checks that the
//! rows it touches belong to that caller, and runs against a SQLite store.
//! `generate.flashcards` additionally calls an external generative API with
//! the caller's own, encrypted-at-rest API key.
//!
//! - [`config`]: layered configuration and validation
//! - [`gateway`]: token authentication and ID token verification
//! - [`procedures`]: the procedure registry and per-entity handlers
//! - [`database`]: relational store and repositories
//! - [`llm`]: generation client and reply parsing
//! - [`api`]: HTTP endpoints
//!
//! ```rust,ignore
//! use blob_api::{config::AppConfig, server::create_app};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::load()?;
//!     let app = create_app(config).await?;
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8787").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod api;
pub mod config;
pub mod database;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod llm;
pub mod logging;
pub mod procedures;
pub mod server;

use std::sync::Arc;

use config::AppConfig;
use database::{Database, KeyManager};
use gateway::IdentityVerifier;
use llm::ContentGenerator;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub database: Database,
    /// Cipher for stored provider API keys.
    pub keys: Arc<KeyManager>,
    pub generator: Arc<dyn ContentGenerator>,
    pub identity: Arc<dyn IdentityVerifier>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}
