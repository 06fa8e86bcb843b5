//! HTTP server setup and middleware.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::{
        Method, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::database::{Database, KeyManager};
use crate::gateway::{self, GoogleIdentityVerifier};
use crate::llm::GeminiGenerator;
use crate::logging::OpTimer;
use crate::{AppState, api, log_init_step, log_success};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Open the store, build the upstream clients and assemble the router.
pub async fn create_app(config: AppConfig) -> anyhow::Result<Router> {
    let overall_timer = OpTimer::new("server", "create_app");
    tracing::info!("Blob API v{VERSION}");

    let step_timer = OpTimer::new("server", "database");
    let database = Database::open(&config.database.path)?;
    log_init_step!(1, 3, "Database", format!("SQLite at {}", config.database.path));
    step_timer.finish();

    let step_timer = OpTimer::new("server", "encryption");
    let keys = KeyManager::new(Path::new(&config.database.encryption_key_path))?;
    log_init_step!(2, 3, "Encryption", "API key cipher ready");
    step_timer.finish();

    let step_timer = OpTimer::new("server", "upstream");
    let generator = GeminiGenerator::new(&config.generation)?;
    let identity = GoogleIdentityVerifier::new(
        reqwest::Client::builder()
            .timeout(Duration::from_secs(config.server.timeout_secs))
            .build()?,
        config.gateway.google_tokeninfo_url.clone(),
        config.gateway.google_web_client_id.clone(),
    );
    if config.gateway.google_web_client_id.is_none() {
        crate::log_init_warning!("GOOGLE_WEB_CLIENT_ID is not set; ID token audience is not checked");
    }
    log_init_step!(
        3,
        3,
        "Upstream",
        format!("Generation via {}", config.generation.base_url)
    );
    step_timer.finish();

    let state = AppState {
        config: Arc::new(config),
        database,
        keys: Arc::new(keys),
        generator: Arc::new(generator),
        identity: Arc::new(identity),
    };

    let app = build_router(state);
    overall_timer.finish();
    log_success!("Blob API server created");
    Ok(app)
}

/// Routes plus middleware for an already assembled state.
pub fn build_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.server.timeout_secs);

    api::create_router()
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            gateway::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([CONTENT_TYPE, AUTHORIZATION]),
        )
        .with_state(state)
}
