//! Core domain models.
//!
//! Rows are serialized in camelCase, the shape clients receive from every
//! procedure.

pub mod flashcards;
pub mod mind_maps;
pub mod quizzes;
pub mod settings;
pub mod topics;
pub mod users;

pub use flashcards::{Difficulty, Flashcard, FlashcardPatch, NewFlashcard};
pub use mind_maps::{MindMap, MindMapData, MindMapNode};
pub use quizzes::{NewOption, NewQuestion, NewQuiz, QuestionWithOptions, Quiz, QuizOption, QuizQuestion};
pub use settings::{AiProvider, SettingsView, UserSettings};
pub use topics::{NewTopic, Topic, TopicPatch};
pub use users::{NewUser, User};
