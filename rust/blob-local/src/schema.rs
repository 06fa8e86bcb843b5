//! On-device schema.
//!
//! Mirrors a subset of the server tables. Timestamps are epoch milliseconds.
//! `topics.user_id` has no foreign key: identity lives on the server.

/// Key/value bookkeeping table.
pub const META_TABLE_SQL: &str = r"
CREATE TABLE IF NOT EXISTS meta (
  key TEXT PRIMARY KEY,
  value TEXT
);
";

pub const TOPICS_TABLE_SQL: &str = r"
CREATE TABLE IF NOT EXISTS topics (
  id TEXT PRIMARY KEY NOT NULL,
  user_id TEXT NOT NULL,
  title TEXT NOT NULL,
  description TEXT,
  created_at INTEGER NOT NULL,
  updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS topics_user_id_idx ON topics (user_id);
";

pub const FLASHCARDS_TABLE_SQL: &str = r"
CREATE TABLE IF NOT EXISTS flashcards (
  id TEXT PRIMARY KEY NOT NULL,
  topic_id TEXT NOT NULL,
  front TEXT NOT NULL,
  back TEXT NOT NULL,
  difficulty TEXT,
  created_at INTEGER NOT NULL,
  updated_at INTEGER NOT NULL,
  source TEXT,
  FOREIGN KEY (topic_id) REFERENCES topics(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS flashcards_topic_id_idx ON flashcards (topic_id);
";

pub const QUIZZES_TABLE_SQL: &str = r"
CREATE TABLE IF NOT EXISTS quizzes (
  id TEXT PRIMARY KEY NOT NULL,
  topic_id TEXT NOT NULL,
  title TEXT NOT NULL,
  description TEXT,
  created_at INTEGER NOT NULL,
  updated_at INTEGER NOT NULL,
  FOREIGN KEY (topic_id) REFERENCES topics(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS quizzes_topic_id_idx ON quizzes (topic_id);

CREATE TABLE IF NOT EXISTS quiz_questions (
  id TEXT PRIMARY KEY NOT NULL,
  quiz_id TEXT NOT NULL,
  question TEXT NOT NULL,
  created_at INTEGER NOT NULL,
  updated_at INTEGER NOT NULL,
  FOREIGN KEY (quiz_id) REFERENCES quizzes(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS quiz_questions_quiz_id_idx ON quiz_questions (quiz_id);

CREATE TABLE IF NOT EXISTS quiz_options (
  id TEXT PRIMARY KEY NOT NULL,
  question_id TEXT NOT NULL,
  option_text TEXT NOT NULL,
  is_correct INTEGER NOT NULL DEFAULT 0,
  created_at INTEGER NOT NULL,
  FOREIGN KEY (question_id) REFERENCES quiz_questions(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS quiz_options_question_id_idx ON quiz_options (question_id);
";

pub const MIND_MAPS_TABLE_SQL: &str = r"
CREATE TABLE IF NOT EXISTS mind_maps (
  id TEXT PRIMARY KEY NOT NULL,
  topic_id TEXT NOT NULL,
  json TEXT NOT NULL,
  created_at INTEGER NOT NULL,
  FOREIGN KEY (topic_id) REFERENCES topics(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS mind_maps_topic_id_idx ON mind_maps (topic_id);
";

/// Statements applied in order by the migration runner. Parents come first.
pub const SCHEMA_V1: &[&str] = &[
    META_TABLE_SQL,
    TOPICS_TABLE_SQL,
    FLASHCARDS_TABLE_SQL,
    QUIZZES_TABLE_SQL,
    MIND_MAPS_TABLE_SQL,
];
