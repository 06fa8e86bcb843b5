//! Quizzes with nested questions and options.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};

use super::topics::owned_topic;
use super::{Database, new_id};
use crate::domain::{NewQuestion, NewQuiz, QuestionWithOptions, Quiz, QuizOption, QuizQuestion};

const QUIZ_COLUMNS: &str = "q.id, q.topic_id, q.title, q.description, q.created_at, q.updated_at";

fn quiz_from_row(row: &Row<'_>) -> rusqlite::Result<Quiz> {
    Ok(Quiz {
        id: row.get(0)?,
        topic_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn question_from_row(row: &Row<'_>) -> rusqlite::Result<QuizQuestion> {
    Ok(QuizQuestion {
        id: row.get(0)?,
        quiz_id: row.get(1)?,
        question: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn option_from_row(row: &Row<'_>) -> rusqlite::Result<QuizOption> {
    Ok(QuizOption {
        id: row.get(0)?,
        question_id: row.get(1)?,
        option_text: row.get(2)?,
        is_correct: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn owned_quiz(conn: &Connection, user_id: &str, quiz_id: &str) -> Result<Option<Quiz>> {
    let sql = format!(
        "SELECT {QUIZ_COLUMNS} FROM quizzes q
         JOIN topics t ON t.id = q.topic_id
         WHERE q.id = ?1 AND t.user_id = ?2"
    );
    Ok(conn
        .query_row(&sql, params![quiz_id, user_id], quiz_from_row)
        .optional()?)
}

fn questions_with_options(conn: &Connection, quiz_id: &str) -> Result<Vec<QuestionWithOptions>> {
    let mut stmt = conn.prepare(
        "SELECT id, quiz_id, question, created_at, updated_at FROM quiz_questions
         WHERE quiz_id = ?1 ORDER BY created_at, rowid",
    )?;
    let questions = stmt
        .query_map(params![quiz_id], question_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut stmt = conn.prepare(
        "SELECT o.id, o.question_id, o.option_text, o.is_correct, o.created_at
         FROM quiz_options o
         JOIN quiz_questions qq ON qq.id = o.question_id
         WHERE qq.quiz_id = ?1 ORDER BY o.rowid",
    )?;
    let mut options = stmt
        .query_map(params![quiz_id], option_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(questions
        .into_iter()
        .map(|question| {
            let (mine, rest): (Vec<_>, Vec<_>) = options
                .drain(..)
                .partition(|o| o.question_id == question.id);
            options = rest;
            QuestionWithOptions {
                question,
                options: mine,
            }
        })
        .collect())
}

fn insert_question(
    tx: &Transaction<'_>,
    quiz_id: &str,
    question: NewQuestion,
    now: DateTime<Utc>,
) -> Result<QuestionWithOptions> {
    let row = QuizQuestion {
        id: new_id(),
        quiz_id: quiz_id.to_string(),
        question: question.question,
        created_at: now,
        updated_at: now,
    };
    tx.execute(
        "INSERT INTO quiz_questions (id, quiz_id, question, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![row.id, row.quiz_id, row.question, row.created_at, row.updated_at],
    )?;

    let mut stmt = tx.prepare(
        "INSERT INTO quiz_options (id, question_id, option_text, is_correct, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    let mut options = Vec::with_capacity(question.options.len());
    for option in question.options {
        let option = QuizOption {
            id: new_id(),
            question_id: row.id.clone(),
            option_text: option.text,
            is_correct: option.is_correct,
            created_at: now,
        };
        stmt.execute(params![
            option.id,
            option.question_id,
            option.option_text,
            option.is_correct,
            option.created_at
        ])?;
        options.push(option);
    }

    Ok(QuestionWithOptions {
        question: row,
        options,
    })
}

#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// `None` when the topic is not owned by `user_id`.
    async fn quizzes_for_topic(&self, user_id: &str, topic_id: &str) -> Result<Option<Vec<Quiz>>>;

    /// Quiz with every question and each question's options.
    async fn find_quiz(
        &self,
        user_id: &str,
        quiz_id: &str,
    ) -> Result<Option<(Quiz, Vec<QuestionWithOptions>)>>;

    /// Create the quiz and all nested rows in one transaction.
    async fn create_quiz(&self, user_id: &str, topic_id: &str, quiz: NewQuiz) -> Result<Option<Quiz>>;

    async fn add_question(
        &self,
        user_id: &str,
        quiz_id: &str,
        question: NewQuestion,
    ) -> Result<Option<QuestionWithOptions>>;

    async fn delete_quiz(&self, user_id: &str, quiz_id: &str) -> Result<bool>;

    async fn delete_question(&self, user_id: &str, question_id: &str) -> Result<bool>;
}

#[async_trait]
impl QuizRepository for Database {
    async fn quizzes_for_topic(&self, user_id: &str, topic_id: &str) -> Result<Option<Vec<Quiz>>> {
        let user_id = user_id.to_string();
        let topic_id = topic_id.to_string();
        self.call(move |conn| {
            if owned_topic(conn, &user_id, &topic_id)?.is_none() {
                return Ok(None);
            }
            let sql = format!(
                "SELECT {QUIZ_COLUMNS} FROM quizzes q WHERE q.topic_id = ?1 ORDER BY q.created_at, q.rowid"
            );
            let mut stmt = conn.prepare(&sql)?;
            let quizzes = stmt
                .query_map(params![topic_id], quiz_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(Some(quizzes))
        })
        .await
    }

    async fn find_quiz(
        &self,
        user_id: &str,
        quiz_id: &str,
    ) -> Result<Option<(Quiz, Vec<QuestionWithOptions>)>> {
        let user_id = user_id.to_string();
        let quiz_id = quiz_id.to_string();
        self.call(move |conn| {
            let Some(quiz) = owned_quiz(conn, &user_id, &quiz_id)? else {
                return Ok(None);
            };
            let questions = questions_with_options(conn, &quiz.id)?;
            Ok(Some((quiz, questions)))
        })
        .await
    }

    async fn create_quiz(&self, user_id: &str, topic_id: &str, quiz: NewQuiz) -> Result<Option<Quiz>> {
        let user_id = user_id.to_string();
        let topic_id = topic_id.to_string();
        self.call(move |conn| {
            let tx = conn.transaction()?;
            if owned_topic(&tx, &user_id, &topic_id)?.is_none() {
                return Ok(None);
            }

            let now = Utc::now();
            let row = Quiz {
                id: new_id(),
                topic_id,
                title: quiz.title,
                description: quiz.description,
                created_at: now,
                updated_at: now,
            };
            tx.execute(
                "INSERT INTO quizzes (id, topic_id, title, description, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![row.id, row.topic_id, row.title, row.description, row.created_at, row.updated_at],
            )?;
            for question in quiz.questions {
                insert_question(&tx, &row.id, question, now)?;
            }

            tx.commit()?;
            Ok(Some(row))
        })
        .await
    }

    async fn add_question(
        &self,
        user_id: &str,
        quiz_id: &str,
        question: NewQuestion,
    ) -> Result<Option<QuestionWithOptions>> {
        let user_id = user_id.to_string();
        let quiz_id = quiz_id.to_string();
        self.call(move |conn| {
            let tx = conn.transaction()?;
            if owned_quiz(&tx, &user_id, &quiz_id)?.is_none() {
                return Ok(None);
            }
            let created = insert_question(&tx, &quiz_id, question, Utc::now())?;
            tx.commit()?;
            Ok(Some(created))
        })
        .await
    }

    async fn delete_quiz(&self, user_id: &str, quiz_id: &str) -> Result<bool> {
        let user_id = user_id.to_string();
        let quiz_id = quiz_id.to_string();
        self.call(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM quizzes
                 WHERE id = ?1
                   AND topic_id IN (SELECT id FROM topics WHERE user_id = ?2)",
                params![quiz_id, user_id],
            )?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn delete_question(&self, user_id: &str, question_id: &str) -> Result<bool> {
        let user_id = user_id.to_string();
        let question_id = question_id.to_string();
        self.call(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM quiz_questions
                 WHERE id = ?1
                   AND quiz_id IN (
                       SELECT q.id FROM quizzes q
                       JOIN topics t ON t.id = q.topic_id
                       WHERE t.user_id = ?2
                   )",
                params![question_id, user_id],
            )?;
            Ok(deleted > 0)
        })
        .await
    }
}
