//! Topic repository.
//!
//! Upsert plus two reads. Update and delete are not mirrored
//! locally; the server is the source of truth for those.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};

use crate::{LocalStore, Result};

/// Topic row as stored on device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

impl Topic {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }
}

/// Topic to write, usually copied from a server response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicInput {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const TOPIC_COLUMNS: &str = "id, user_id, title, description, created_at, updated_at";

impl LocalStore {
    /// Insert a topic, overwriting the columns of any row with the same id.
    ///
    /// The row is updated in place, so child rows that cascade on topic
    /// delete are kept.
    pub fn insert_topic(&self, topic: &TopicInput) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO topics (id, user_id, title, description, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                    user_id = excluded.user_id,
                    title = excluded.title,
                    description = excluded.description,
                    created_at = excluded.created_at,
                    updated_at = excluded.updated_at",
                params![
                    topic.id,
                    topic.user_id,
                    topic.title,
                    topic.description,
                    topic.created_at.timestamp_millis(),
                    topic.updated_at.timestamp_millis(),
                ],
            )?;
            Ok(())
        })?;
        tracing::debug!(topic_id = %topic.id, user_id = %topic.user_id, "Topic stored locally");
        Ok(())
    }

    /// All topics of a user, newest first.
    pub fn topics_by_user(&self, user_id: &str) -> Result<Vec<Topic>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TOPIC_COLUMNS} FROM topics WHERE user_id = ?1 ORDER BY created_at DESC"
            ))?;
            let rows = stmt.query_map(params![user_id], Topic::from_row)?;
            let mut topics = Vec::new();
            for topic in rows {
                topics.push(topic?);
            }
            Ok(topics)
        })
    }

    pub fn topic_by_id(&self, topic_id: &str) -> Result<Option<Topic>> {
        self.with_connection(|conn| {
            let topic = conn
                .query_row(
                    &format!("SELECT {TOPIC_COLUMNS} FROM topics WHERE id = ?1"),
                    params![topic_id],
                    Topic::from_row,
                )
                .optional()?;
            Ok(topic)
        })
    }
}
