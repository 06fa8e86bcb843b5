//! Procedure registry.
//!
//! A procedure is addressed by a dotted path (`topics.getById`), is either a
//! query (GET) or a mutation (POST), takes one JSON input and returns one JSON
//! value. Every procedure except `auth.verifyGoogleToken` requires an
//! authenticated caller and checks that the rows it touches belong to that
//! caller; rows owned by someone else are reported as not found.

pub mod auth;
pub mod flashcards;
pub mod generate;
pub mod mind_maps;
pub mod quizzes;
pub mod settings;
pub mod topics;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::AppState;
use crate::error::ApiError;
use crate::gateway::Authentication;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcedureKind {
    Query,
    Mutation,
}

impl ProcedureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
        }
    }
}

/// Per-request state handed to every procedure.
#[derive(Clone)]
pub struct ProcedureContext {
    pub state: AppState,
    pub auth: Authentication,
}

impl ProcedureContext {
    pub fn new(state: AppState, auth: Authentication) -> Self {
        Self { state, auth }
    }

    /// Authenticated user id or `UNAUTHORIZED`.
    pub fn user_id(&self) -> Result<&str, ApiError> {
        self.auth.user_id()
    }
}

use self::ProcedureKind::{Mutation, Query};

/// Every registered procedure with its kind.
pub const PROCEDURES: &[(&str, ProcedureKind)] = &[
    ("topics.getAll", Query),
    ("topics.getById", Query),
    ("topics.create", Mutation),
    ("topics.update", Mutation),
    ("topics.delete", Mutation),
    ("flashcards.getByTopic", Query),
    ("flashcards.getById", Query),
    ("flashcards.create", Mutation),
    ("flashcards.createMany", Mutation),
    ("flashcards.update", Mutation),
    ("flashcards.delete", Mutation),
    ("flashcards.deleteByTopic", Mutation),
    ("quizzes.getByTopic", Query),
    ("quizzes.getById", Query),
    ("quizzes.create", Mutation),
    ("quizzes.addQuestion", Mutation),
    ("quizzes.delete", Mutation),
    ("quizzes.deleteQuestion", Mutation),
    ("mindMaps.getByTopic", Query),
    ("mindMaps.getById", Query),
    ("mindMaps.create", Mutation),
    ("mindMaps.update", Mutation),
    ("mindMaps.delete", Mutation),
    ("settings.get", Query),
    ("settings.updateAiProvider", Mutation),
    ("settings.removeApiKey", Mutation),
    ("settings.validateApiKey", Mutation),
    ("auth.verifyGoogleToken", Mutation),
    ("auth.getMe", Query),
    ("auth.signOut", Mutation),
    ("generate.flashcards", Mutation),
];

pub fn kind_of(path: &str) -> Option<ProcedureKind> {
    PROCEDURES
        .iter()
        .find(|(name, _)| *name == path)
        .map(|(_, kind)| *kind)
}

/// Run the procedure at `path`. The caller has already checked the kind.
pub async fn dispatch(ctx: &ProcedureContext, path: &str, input: Value) -> Result<Value, ApiError> {
    match path {
        "topics.getAll" => topics::get_all(ctx).await,
        "topics.getById" => topics::get_by_id(ctx, input).await,
        "topics.create" => topics::create(ctx, input).await,
        "topics.update" => topics::update(ctx, input).await,
        "topics.delete" => topics::delete(ctx, input).await,

        "flashcards.getByTopic" => flashcards::get_by_topic(ctx, input).await,
        "flashcards.getById" => flashcards::get_by_id(ctx, input).await,
        "flashcards.create" => flashcards::create(ctx, input).await,
        "flashcards.createMany" => flashcards::create_many(ctx, input).await,
        "flashcards.update" => flashcards::update(ctx, input).await,
        "flashcards.delete" => flashcards::delete(ctx, input).await,
        "flashcards.deleteByTopic" => flashcards::delete_by_topic(ctx, input).await,

        "quizzes.getByTopic" => quizzes::get_by_topic(ctx, input).await,
        "quizzes.getById" => quizzes::get_by_id(ctx, input).await,
        "quizzes.create" => quizzes::create(ctx, input).await,
        "quizzes.addQuestion" => quizzes::add_question(ctx, input).await,
        "quizzes.delete" => quizzes::delete(ctx, input).await,
        "quizzes.deleteQuestion" => quizzes::delete_question(ctx, input).await,

        "mindMaps.getByTopic" => mind_maps::get_by_topic(ctx, input).await,
        "mindMaps.getById" => mind_maps::get_by_id(ctx, input).await,
        "mindMaps.create" => mind_maps::create(ctx, input).await,
        "mindMaps.update" => mind_maps::update(ctx, input).await,
        "mindMaps.delete" => mind_maps::delete(ctx, input).await,

        "settings.get" => settings::get(ctx).await,
        "settings.updateAiProvider" => settings::update_ai_provider(ctx, input).await,
        "settings.removeApiKey" => settings::remove_api_key(ctx).await,
        "settings.validateApiKey" => settings::validate_api_key(ctx).await,

        "auth.verifyGoogleToken" => auth::verify_google_token(ctx, input).await,
        "auth.getMe" => auth::get_me(ctx).await,
        "auth.signOut" => auth::sign_out(ctx).await,

        "generate.flashcards" => generate::flashcards(ctx, input).await,

        _ => Err(not_found_procedure(path)),
    }
}

pub fn not_found_procedure(path: &str) -> ApiError {
    ApiError::not_found(format!("No \"query\"-procedure or \"mutation\"-procedure on path \"{path}\""))
}

/// Deserialize a procedure input. A missing input is read as `{}`.
pub(crate) fn parse_input<T: DeserializeOwned>(input: Value) -> Result<T, ApiError> {
    let input = if input.is_null() {
        Value::Object(Default::default())
    } else {
        input
    };
    serde_json::from_value(input).map_err(|e| ApiError::bad_request(format!("Invalid input: {e}")))
}

/// Reject ids that are not UUIDs before they reach the store.
pub(crate) fn require_uuid(field: &str, value: &str) -> Result<(), ApiError> {
    uuid::Uuid::parse_str(value)
        .map(|_| ())
        .map_err(|_| ApiError::bad_request(format!("Invalid uuid for {field}")))
}

pub(crate) fn require_non_empty(value: &str, message: &str) -> Result<(), ApiError> {
    if value.is_empty() {
        return Err(ApiError::bad_request(message));
    }
    Ok(())
}

/// Optional fields must still be non-empty when present.
pub(crate) fn require_non_empty_opt(value: Option<&str>, message: &str) -> Result<(), ApiError> {
    value.map_or(Ok(()), |v| require_non_empty(v, message))
}
