//! Shared helpers for the HTTP-level tests.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::{TestResponse, TestServer};
use serde_json::{Value, json};

use blob_api::AppState;
use blob_api::config::AppConfig;
use blob_api::database::{Database, KeyManager};
use blob_api::gateway::{IdentityVerifier, VerifiedIdentity};
use blob_api::llm::{ContentGenerator, GeminiGenerator, GeneratedFlashcard, GenerationError};
use blob_api::server::build_router;

pub const JWT_SECRET: &str = "integration-test-secret";

/// Accepts tokens of the form `valid:<subject>:<email>`.
#[derive(Debug, Clone, Default)]
pub struct FakeIdentity;

#[async_trait]
impl IdentityVerifier for FakeIdentity {
    fn provider_id(&self) -> &'static str {
        "google"
    }

    async fn verify(&self, id_token: &str) -> anyhow::Result<VerifiedIdentity> {
        let mut parts = id_token.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("valid"), Some(subject), Some(email)) => Ok(VerifiedIdentity {
                subject: subject.to_string(),
                email: email.to_string(),
                name: Some(format!("User {subject}")),
                picture: None,
            }),
            _ => anyhow::bail!("Invalid token"),
        }
    }
}

/// Generator for tests that never reach the upstream API.
#[derive(Debug, Clone, Default)]
pub struct UnreachableGenerator;

#[async_trait]
impl ContentGenerator for UnreachableGenerator {
    async fn generate_flashcards(
        &self,
        _api_key: &str,
        _model: &str,
        _content: &str,
    ) -> Result<Vec<GeneratedFlashcard>, GenerationError> {
        Err(GenerationError::Transport("no upstream in this test".to_string()))
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.gateway.jwt_secret = Some(JWT_SECRET.to_string());
    config
}

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_generator(Arc::new(UnreachableGenerator))
    }

    /// App whose generator talks to `base_url` instead of the real API.
    pub fn with_generation_base_url(base_url: &str) -> Self {
        let mut config = test_config();
        config.generation.base_url = base_url.to_string();
        let generator = GeminiGenerator::new(&config.generation).expect("generator");
        Self::build(config, Arc::new(generator))
    }

    pub fn with_generator(generator: Arc<dyn ContentGenerator>) -> Self {
        Self::build(test_config(), generator)
    }

    fn build(config: AppConfig, generator: Arc<dyn ContentGenerator>) -> Self {
        let state = AppState {
            config: Arc::new(config),
            database: Database::open_in_memory().expect("in-memory database"),
            keys: Arc::new(KeyManager::ephemeral()),
            generator,
            identity: Arc::new(FakeIdentity),
        };
        let server = TestServer::new(build_router(state.clone())).expect("test server");
        Self { server, state }
    }

    /// Sign in through `auth.verifyGoogleToken` and return the session token.
    pub async fn sign_in(&self, subject: &str, email: &str) -> String {
        let response = self
            .server
            .post("/trpc/auth.verifyGoogleToken")
            .json(&json!({ "idToken": format!("valid:{subject}:{email}") }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        body["result"]["data"]["token"]
            .as_str()
            .expect("token in response")
            .to_string()
    }

    pub async fn query(&self, token: Option<&str>, path: &str, input: Option<Value>) -> TestResponse {
        let mut request = self.server.get(&format!("/trpc/{path}"));
        if let Some(input) = input {
            request = request.add_query_param("input", input.to_string());
        }
        if let Some(token) = token {
            request = request.authorization_bearer(token);
        }
        request.await
    }

    pub async fn mutate(&self, token: Option<&str>, path: &str, input: Value) -> TestResponse {
        let mut request = self.server.post(&format!("/trpc/{path}")).json(&input);
        if let Some(token) = token {
            request = request.authorization_bearer(token);
        }
        request.await
    }

    /// Create a topic and return its id.
    pub async fn create_topic(&self, token: &str, title: &str) -> String {
        let response = self
            .mutate(Some(token), "topics.create", json!({ "title": title }))
            .await;
        response.assert_status_ok();
        data(&response)["topic"]["id"]
            .as_str()
            .expect("topic id")
            .to_string()
    }
}

/// `result.data` of a successful call.
pub fn data(response: &TestResponse) -> Value {
    let body: Value = response.json();
    body["result"]["data"].clone()
}

/// Assert an error envelope with the given status, code and message.
pub fn assert_error(response: &TestResponse, status: StatusCode, code: &str, message: &str) {
    assert_eq!(response.status_code(), status, "body: {}", response.text());
    let body: Value = response.json();
    assert_eq!(body["error"]["data"]["code"], code);
    assert_eq!(body["error"]["message"], message);
}
