use serde::Deserialize;
use serde_json::{Value, json};

use super::topics::{TOPIC_NOT_FOUND, TopicIdInput};
use super::{ProcedureContext, parse_input, require_non_empty, require_uuid};
use crate::database::QuizRepository;
use crate::domain::{NewQuestion, NewQuiz};
use crate::error::ApiError;

const QUIZ_NOT_FOUND: &str = "Quiz not found or you don't have access to it";
const QUESTION_NOT_FOUND: &str = "Question not found or you don't have access to it";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuizIdInput {
    quiz_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateInput {
    topic_id: String,
    title: String,
    description: Option<String>,
    #[serde(default)]
    questions: Vec<NewQuestion>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddQuestionInput {
    quiz_id: String,
    #[serde(flatten)]
    question: NewQuestion,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionIdInput {
    question_id: String,
}

fn validate_question(question: &NewQuestion) -> Result<(), ApiError> {
    question.validate().map_err(ApiError::bad_request)
}

pub async fn get_by_topic(ctx: &ProcedureContext, input: Value) -> Result<Value, ApiError> {
    let user_id = ctx.user_id()?;
    let input = TopicIdInput::parse(input)?;

    let quizzes = ctx
        .state
        .database
        .quizzes_for_topic(user_id, &input.topic_id)
        .await?
        .ok_or_else(|| ApiError::not_found(TOPIC_NOT_FOUND))?;
    Ok(json!({ "quizzes": quizzes }))
}

pub async fn get_by_id(ctx: &ProcedureContext, input: Value) -> Result<Value, ApiError> {
    let user_id = ctx.user_id()?;
    let input: QuizIdInput = parse_input(input)?;
    require_uuid("quizId", &input.quiz_id)?;

    let (quiz, questions) = ctx
        .state
        .database
        .find_quiz(user_id, &input.quiz_id)
        .await?
        .ok_or_else(|| ApiError::not_found(QUIZ_NOT_FOUND))?;
    Ok(json!({ "quiz": quiz, "questions": questions }))
}

pub async fn create(ctx: &ProcedureContext, input: Value) -> Result<Value, ApiError> {
    let user_id = ctx.user_id()?;
    let input: CreateInput = parse_input(input)?;
    require_uuid("topicId", &input.topic_id)?;
    require_non_empty(&input.title, "Title is required")?;
    input.questions.iter().try_for_each(validate_question)?;

    let question_count = input.questions.len();
    let quiz = ctx
        .state
        .database
        .create_quiz(
            user_id,
            &input.topic_id,
            NewQuiz {
                title: input.title,
                description: input.description,
                questions: input.questions,
            },
        )
        .await?
        .ok_or_else(|| ApiError::not_found(TOPIC_NOT_FOUND))?;
    tracing::info!(user_id = %user_id, quiz_id = %quiz.id, questions = question_count, "Quiz created");
    Ok(json!({ "quiz": quiz }))
}

pub async fn add_question(ctx: &ProcedureContext, input: Value) -> Result<Value, ApiError> {
    let user_id = ctx.user_id()?;
    let input: AddQuestionInput = parse_input(input)?;
    require_uuid("quizId", &input.quiz_id)?;
    validate_question(&input.question)?;

    let question = ctx
        .state
        .database
        .add_question(user_id, &input.quiz_id, input.question)
        .await?
        .ok_or_else(|| ApiError::not_found(QUIZ_NOT_FOUND))?;
    Ok(json!({ "question": question }))
}

pub async fn delete(ctx: &ProcedureContext, input: Value) -> Result<Value, ApiError> {
    let user_id = ctx.user_id()?;
    let input: QuizIdInput = parse_input(input)?;
    require_uuid("quizId", &input.quiz_id)?;

    if !ctx.state.database.delete_quiz(user_id, &input.quiz_id).await? {
        return Err(ApiError::not_found(QUIZ_NOT_FOUND));
    }
    Ok(json!({ "success": true }))
}

pub async fn delete_question(ctx: &ProcedureContext, input: Value) -> Result<Value, ApiError> {
    let user_id = ctx.user_id()?;
    let input: QuestionIdInput = parse_input(input)?;
    require_uuid("questionId", &input.question_id)?;

    if !ctx
        .state
        .database
        .delete_question(user_id, &input.question_id)
        .await?
    {
        return Err(ApiError::not_found(QUESTION_NOT_FOUND));
    }
    Ok(json!({ "success": true }))
}
