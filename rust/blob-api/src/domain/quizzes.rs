//! Quiz -> question -> option ownership chain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: String,
    pub topic_id: String,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: String,
    pub quiz_id: String,
    pub question: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOption {
    pub id: String,
    pub question_id: String,
    pub option_text: String,
    pub is_correct: bool,
    pub created_at: DateTime<Utc>,
}

/// A question with its options, serialized flat (`{id, quizId, ..., options}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionWithOptions {
    #[serde(flatten)]
    pub question: QuizQuestion,
    pub options: Vec<QuizOption>,
}

#[derive(Debug, Clone)]
pub struct NewQuiz {
    pub title: String,
    pub description: Option<String>,
    pub questions: Vec<NewQuestion>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewQuestion {
    pub question: String,
    pub options: Vec<NewOption>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOption {
    pub text: String,
    pub is_correct: bool,
}

impl NewQuestion {
    /// A question needs text, non-empty options and exactly one correct option.
    pub fn validate(&self) -> Result<(), String> {
        if self.question.trim().is_empty() {
            return Err("Question text is required".to_string());
        }
        if self.options.is_empty() {
            return Err(format!("Question '{}' has no options", self.question));
        }
        if self.options.iter().any(|o| o.text.is_empty()) {
            return Err(format!("Question '{}' has an empty option", self.question));
        }
        let correct = self.options.iter().filter(|o| o.is_correct).count();
        if correct != 1 {
            return Err(format!(
                "Question '{}' must have exactly one correct option, found {correct}",
                self.question
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(correct: &[bool]) -> NewQuestion {
        NewQuestion {
            question: "Capital of France?".to_string(),
            options: correct
                .iter()
                .enumerate()
                .map(|(i, &is_correct)| NewOption {
                    text: format!("Option {i}"),
                    is_correct,
                })
                .collect(),
        }
    }

    #[test]
    fn test_exactly_one_correct_option() {
        assert!(question(&[false, true, false]).validate().is_ok());

        let err = question(&[true, true]).validate().expect_err("two correct");
        assert!(err.contains("exactly one correct option, found 2"));

        let err = question(&[false, false]).validate().expect_err("none correct");
        assert!(err.contains("found 0"));

        assert!(question(&[]).validate().is_err());
    }
}
