//! Settings and flashcard generation against a local stand-in for the
//! generative API.

mod common;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Value, json};

use common::{TestApp, assert_error, data};

const MISSING_KEY: &str = "Gemini API key not found. Please configure your API key in settings.";

/// Scripted upstream: replies with `status` and `body`, records each call.
#[derive(Clone)]
struct Upstream {
    reply: Arc<Mutex<(StatusCode, Value)>>,
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

#[derive(Deserialize)]
struct KeyParam {
    key: String,
}

async fn generate_content(
    State(upstream): State<Upstream>,
    Query(param): Query<KeyParam>,
    Json(body): Json<Value>,
) -> Response {
    upstream.calls.lock().push((param.key, body));
    let (status, reply) = upstream.reply.lock().clone();
    (status, Json(reply)).into_response()
}

impl Upstream {
    async fn spawn() -> (Self, String) {
        let upstream = Self {
            reply: Arc::new(Mutex::new((StatusCode::OK, text_reply("[]")))),
            calls: Arc::new(Mutex::new(Vec::new())),
        };
        let app = Router::new()
            .route("/v1beta/models/{*rest}", post(generate_content))
            .with_state(upstream.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind upstream");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        (upstream, format!("http://{addr}"))
    }

    fn reply_with(&self, status: StatusCode, body: Value) {
        *self.reply.lock() = (status, body);
    }

    fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

fn text_reply(text: &str) -> Value {
    json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] })
}

async fn configured_app() -> (TestApp, Upstream, String, String) {
    let (upstream, base_url) = Upstream::spawn().await;
    let app = TestApp::with_generation_base_url(&base_url);
    let token = app.sign_in("sub-1", "one@example.com").await;
    let topic_id = app.create_topic(&token, "Generated").await;

    let response = app
        .mutate(
            Some(&token),
            "settings.updateAiProvider",
            json!({ "provider": "google", "apiKey": "secret-key-123" }),
        )
        .await;
    response.assert_status_ok();
    (app, upstream, token, topic_id)
}

#[tokio::test]
async fn test_settings_flow() {
    let app = TestApp::new();
    let token = app.sign_in("sub-1", "one@example.com").await;

    let response = app.query(Some(&token), "settings.get", None).await;
    response.assert_status_ok();
    assert_eq!(data(&response)["settings"]["hasApiKey"], false);
    assert_eq!(data(&response)["settings"]["aiProvider"], "google");

    let response = app
        .mutate(Some(&token), "settings.validateApiKey", Value::Null)
        .await;
    assert_error(&response, StatusCode::BAD_REQUEST, "BAD_REQUEST", "No API key configured");

    let response = app
        .mutate(
            Some(&token),
            "settings.updateAiProvider",
            json!({ "provider": "google", "apiKey": "abc", "model": "gemini-1.5-flash" }),
        )
        .await;
    response.assert_status_ok();
    assert_eq!(data(&response), json!({ "success": true, "provider": "google" }));

    let settings = data(&app.query(Some(&token), "settings.get", None).await)["settings"].clone();
    assert_eq!(settings["hasApiKey"], true);
    assert_eq!(settings["preferredModel"], "gemini-1.5-flash");
    assert!(!settings.to_string().contains("abc"));

    let response = app
        .mutate(Some(&token), "settings.validateApiKey", Value::Null)
        .await;
    assert_eq!(data(&response), json!({ "valid": true }));

    let response = app
        .mutate(Some(&token), "settings.removeApiKey", Value::Null)
        .await;
    response.assert_status_ok();
    let settings = data(&app.query(Some(&token), "settings.get", None).await)["settings"].clone();
    assert_eq!(settings["hasApiKey"], false);
}

#[tokio::test]
async fn test_generate_persists_fenced_reply() {
    let (app, upstream, token, topic_id) = configured_app().await;
    upstream.reply_with(
        StatusCode::OK,
        text_reply(
            "```json\n[{\"front\":\"Q1\",\"back\":\"A1\",\"difficulty\":\"easy\"},{\"front\":\"Q2\",\"back\":\"A2\"}]\n```",
        ),
    );

    let response = app
        .mutate(
            Some(&token),
            "generate.flashcards",
            json!({ "topicId": topic_id, "content": "Some notes" }),
        )
        .await;
    response.assert_status_ok();
    let result = data(&response);
    assert_eq!(result["success"], true);
    assert_eq!(result["count"], 2);
    assert_eq!(result["flashcards"][0]["front"], "Q1");
    assert_eq!(result["flashcards"][0]["source"], "gemini");

    let calls = upstream.calls.lock().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "secret-key-123");
    assert!(calls[0].1.to_string().contains("Some notes"));

    let stored = data(
        &app.query(Some(&token), "flashcards.getByTopic", Some(json!({ "topicId": topic_id })))
            .await,
    );
    assert_eq!(stored["flashcards"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_generate_bad_shape_saves_nothing() {
    let (app, upstream, token, topic_id) = configured_app().await;
    upstream.reply_with(
        StatusCode::OK,
        text_reply("[{\"front\":\"Q1\",\"back\":\"A1\"},{\"front\":\"Q2\"}]"),
    );

    let response = app
        .mutate(
            Some(&token),
            "generate.flashcards",
            json!({ "topicId": topic_id, "content": "Some notes" }),
        )
        .await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

    let stored = data(
        &app.query(Some(&token), "flashcards.getByTopic", Some(json!({ "topicId": topic_id })))
            .await,
    );
    assert_eq!(stored["flashcards"], json!([]));
}

#[tokio::test]
async fn test_generate_maps_upstream_errors() {
    let (app, upstream, token, topic_id) = configured_app().await;
    let input = json!({ "topicId": topic_id, "content": "Some notes" });

    upstream.reply_with(StatusCode::TOO_MANY_REQUESTS, json!({}));
    let response = app.mutate(Some(&token), "generate.flashcards", input.clone()).await;
    assert_error(
        &response,
        StatusCode::TOO_MANY_REQUESTS,
        "TOO_MANY_REQUESTS",
        "API rate limit exceeded. Please try again later.",
    );

    upstream.reply_with(StatusCode::FORBIDDEN, json!({}));
    let response = app.mutate(Some(&token), "generate.flashcards", input.clone()).await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    upstream.reply_with(StatusCode::OK, json!({ "candidates": [] }));
    let response = app.mutate(Some(&token), "generate.flashcards", input).await;
    assert_error(
        &response,
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_SERVER_ERROR",
        "No content received from Gemini API",
    );
    assert!(!response.text().contains("secret-key-123"));
}

#[tokio::test]
async fn test_generate_requires_key_and_owned_topic() {
    let (upstream, base_url) = Upstream::spawn().await;
    let app = TestApp::with_generation_base_url(&base_url);
    let alice = app.sign_in("alice", "alice@example.com").await;
    let bob = app.sign_in("bob", "bob@example.com").await;
    let topic_id = app.create_topic(&alice, "Alice only").await;
    let input = json!({ "topicId": topic_id, "content": "notes" });

    let response = app.mutate(Some(&alice), "generate.flashcards", input.clone()).await;
    assert_error(&response, StatusCode::BAD_REQUEST, "BAD_REQUEST", MISSING_KEY);

    app.mutate(
        Some(&bob),
        "settings.updateAiProvider",
        json!({ "provider": "google", "apiKey": "bob-key" }),
    )
    .await
    .assert_status_ok();
    let response = app.mutate(Some(&bob), "generate.flashcards", input.clone()).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = app.mutate(None, "generate.flashcards", input).await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = app
        .mutate(
            Some(&alice),
            "generate.flashcards",
            json!({ "topicId": "nope", "content": "notes" }),
        )
        .await;
    assert_error(&response, StatusCode::BAD_REQUEST, "BAD_REQUEST", "Invalid topic ID");

    assert_eq!(upstream.call_count(), 0);
}
