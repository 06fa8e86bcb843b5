//! Procedure endpoint.
//!
//! `GET /trpc/{path}?input=<json>` runs a query, `POST /trpc/{path}` with a
//! JSON body runs a mutation. With `?batch=1` the path is a comma-separated
//! list of procedures and the input is an object keyed by position
//! (`{"0": ..., "1": ...}`); the response is an array in the same order.
//! Inputs wrapped in a `{"json": ...}` envelope are unwrapped.

use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use futures::future::join_all;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::AppState;
use crate::error::ApiError;
use crate::gateway::Authentication;
use crate::procedures::{self, ProcedureContext, ProcedureKind};

pub fn router() -> Router<AppState> {
    Router::new().route("/trpc/{*path}", get(handle_query).post(handle_mutation))
}

#[derive(Debug, Default, Deserialize)]
struct CallParams {
    batch: Option<String>,
    input: Option<String>,
}

impl CallParams {
    fn is_batch(&self) -> bool {
        matches!(self.batch.as_deref(), Some("1" | "true"))
    }
}

async fn handle_query(
    State(state): State<AppState>,
    auth: Option<Extension<Authentication>>,
    Path(path): Path<String>,
    Query(params): Query<CallParams>,
) -> Response {
    let input = parse_raw_input(params.input.as_deref().unwrap_or(""));
    handle(state, auth, ProcedureKind::Query, &path, &params, input).await
}

async fn handle_mutation(
    State(state): State<AppState>,
    auth: Option<Extension<Authentication>>,
    Path(path): Path<String>,
    Query(params): Query<CallParams>,
    body: Bytes,
) -> Response {
    let input = parse_body(&body);
    handle(state, auth, ProcedureKind::Mutation, &path, &params, input).await
}

async fn handle(
    state: AppState,
    auth: Option<Extension<Authentication>>,
    method: ProcedureKind,
    path: &str,
    params: &CallParams,
    input: Result<Value, ApiError>,
) -> Response {
    let auth = auth.map_or(Authentication::Missing, |Extension(auth)| auth);
    let ctx = ProcedureContext::new(state, auth);

    if !params.is_batch() {
        let result = match input {
            Ok(input) => call(&ctx, method, path, unwrap_envelope(input)).await,
            Err(err) => Err(err),
        };
        let (status, body) = envelope(path, result);
        return (status, Json(body)).into_response();
    }

    let paths: Vec<&str> = path.split(',').collect();
    let mut inputs = match input {
        Ok(input) => input,
        Err(err) => {
            let bodies: Vec<Value> = paths.iter().map(|p| err.to_envelope(Some(p))).collect();
            return (err.status(), Json(Value::Array(bodies))).into_response();
        }
    };

    let calls = paths.iter().enumerate().map(|(i, p)| {
        let input = batch_input(&mut inputs, i);
        let ctx = &ctx;
        async move { envelope(p, call(ctx, method, p, unwrap_envelope(input)).await) }
    });
    // Inputs are extracted eagerly so the futures do not borrow `inputs`.
    let calls: Vec<_> = calls.collect();
    let results = join_all(calls).await;

    let status = batch_status(results.iter().map(|(status, _)| *status));
    let bodies: Vec<Value> = results.into_iter().map(|(_, body)| body).collect();
    (status, Json(Value::Array(bodies))).into_response()
}

/// Resolve, check the verb and run one procedure.
async fn call(
    ctx: &ProcedureContext,
    method: ProcedureKind,
    path: &str,
    input: Value,
) -> Result<Value, ApiError> {
    let kind = procedures::kind_of(path).ok_or_else(|| procedures::not_found_procedure(path))?;
    if kind != method {
        let verb = match method {
            ProcedureKind::Query => "GET",
            ProcedureKind::Mutation => "POST",
        };
        return Err(ApiError::MethodNotSupported(format!(
            "Unsupported {verb}-request to {} procedure at path \"{path}\"",
            kind.as_str()
        )));
    }

    let result = procedures::dispatch(ctx, path, input).await;
    if let Err(err) = &result {
        tracing::debug!(path = %path, code = err.code(), message = %err, "Procedure failed");
    }
    result
}

fn envelope(path: &str, result: Result<Value, ApiError>) -> (StatusCode, Value) {
    match result {
        Ok(data) => (StatusCode::OK, json!({ "result": { "data": data } })),
        Err(err) => (err.status(), err.to_envelope(Some(path))),
    }
}

fn parse_body(body: &[u8]) -> Result<Value, ApiError> {
    let raw = std::str::from_utf8(body)
        .map_err(|e| ApiError::bad_request(format!("Request body is not valid UTF-8: {e}")))?;
    parse_raw_input(raw)
}

fn parse_raw_input(raw: &str) -> Result<Value, ApiError> {
    if raw.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(raw).map_err(|e| ApiError::bad_request(format!("Invalid JSON input: {e}")))
}

/// Strip a `{"json": ...}` envelope, ignoring any sibling `meta`.
fn unwrap_envelope(input: Value) -> Value {
    match input {
        Value::Object(mut map)
            if map.contains_key("json") && map.keys().all(|k| k == "json" || k == "meta") =>
        {
            map.remove("json").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn batch_input(inputs: &mut Value, index: usize) -> Value {
    match inputs {
        Value::Object(map) => map.remove(&index.to_string()).unwrap_or(Value::Null),
        Value::Array(items) => items.get_mut(index).map(Value::take).unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

/// One shared status, or 207 when the calls disagree.
fn batch_status(mut statuses: impl Iterator<Item = StatusCode>) -> StatusCode {
    let Some(first) = statuses.next() else {
        return StatusCode::OK;
    };
    if statuses.all(|s| s == first) {
        first
    } else {
        StatusCode::MULTI_STATUS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwrap_envelope() {
        assert_eq!(
            unwrap_envelope(json!({"json": {"title": "x"}})),
            json!({"title": "x"})
        );
        assert_eq!(
            unwrap_envelope(json!({"json": {"title": "x"}, "meta": {"values": {}}})),
            json!({"title": "x"})
        );
        assert_eq!(
            unwrap_envelope(json!({"json": 1, "title": "x"})),
            json!({"json": 1, "title": "x"})
        );
        assert_eq!(unwrap_envelope(json!({"title": "x"})), json!({"title": "x"}));
    }

    #[test]
    fn test_batch_input() {
        let mut inputs = json!({"0": {"a": 1}, "2": {"c": 3}});
        assert_eq!(batch_input(&mut inputs, 0), json!({"a": 1}));
        assert_eq!(batch_input(&mut inputs, 1), Value::Null);
        assert_eq!(batch_input(&mut inputs, 2), json!({"c": 3}));

        let mut inputs = json!([{"a": 1}]);
        assert_eq!(batch_input(&mut inputs, 0), json!({"a": 1}));
        assert_eq!(batch_input(&mut inputs, 5), Value::Null);
    }

    #[test]
    fn test_batch_status() {
        assert_eq!(
            batch_status([StatusCode::OK, StatusCode::OK].into_iter()),
            StatusCode::OK
        );
        assert_eq!(
            batch_status([StatusCode::NOT_FOUND, StatusCode::NOT_FOUND].into_iter()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            batch_status([StatusCode::OK, StatusCode::UNAUTHORIZED].into_iter()),
            StatusCode::MULTI_STATUS
        );
    }

    #[test]
    fn test_parse_body_rejects_invalid_utf8() {
        assert_eq!(parse_body(b""), Ok(Value::Null));
        assert_eq!(parse_body(b"{\"a\":1}"), Ok(json!({"a": 1})));

        let err = parse_body(b"{\"title\":\"\xff\"}").expect_err("invalid utf-8");
        assert_eq!(err.code(), "BAD_REQUEST");
        assert!(err.to_string().starts_with("Request body is not valid UTF-8"));
    }

    #[test]
    fn test_parse_raw_input() {
        assert_eq!(parse_raw_input(""), Ok(Value::Null));
        assert_eq!(parse_raw_input("{\"a\":1}"), Ok(json!({"a": 1})));
        assert_eq!(parse_raw_input("{").map_err(|e| e.code()), Err("BAD_REQUEST"));
    }
}
