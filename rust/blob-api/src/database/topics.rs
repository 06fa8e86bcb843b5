use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::{Database, new_id};
use crate::domain::{NewTopic, Topic, TopicPatch};

const TOPIC_COLUMNS: &str = "id, user_id, title, description, created_at, updated_at";

fn topic_from_row(row: &Row<'_>) -> rusqlite::Result<Topic> {
    Ok(Topic {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Ownership gate shared by every repository below a topic.
pub(crate) fn owned_topic(conn: &Connection, user_id: &str, topic_id: &str) -> Result<Option<Topic>> {
    let sql = format!("SELECT {TOPIC_COLUMNS} FROM topics WHERE id = ?1 AND user_id = ?2");
    Ok(conn
        .query_row(&sql, params![topic_id, user_id], topic_from_row)
        .optional()?)
}

#[async_trait]
pub trait TopicRepository: Send + Sync {
    /// All topics of a user, oldest first.
    async fn list_topics(&self, user_id: &str) -> Result<Vec<Topic>>;

    /// `None` when the topic is missing or owned by another user.
    async fn find_topic(&self, user_id: &str, topic_id: &str) -> Result<Option<Topic>>;

    async fn create_topic(&self, user_id: &str, topic: NewTopic) -> Result<Topic>;

    async fn update_topic(
        &self,
        user_id: &str,
        topic_id: &str,
        patch: TopicPatch,
    ) -> Result<Option<Topic>>;

    /// Delete a topic and, by cascade, everything under it.
    async fn delete_topic(&self, user_id: &str, topic_id: &str) -> Result<bool>;
}

#[async_trait]
impl TopicRepository for Database {
    async fn list_topics(&self, user_id: &str) -> Result<Vec<Topic>> {
        let user_id = user_id.to_string();
        self.call(move |conn| {
            let sql = format!(
                "SELECT {TOPIC_COLUMNS} FROM topics WHERE user_id = ?1 ORDER BY created_at, rowid"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![user_id], topic_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    async fn find_topic(&self, user_id: &str, topic_id: &str) -> Result<Option<Topic>> {
        let user_id = user_id.to_string();
        let topic_id = topic_id.to_string();
        self.call(move |conn| owned_topic(conn, &user_id, &topic_id))
            .await
    }

    async fn create_topic(&self, user_id: &str, topic: NewTopic) -> Result<Topic> {
        let user_id = user_id.to_string();
        self.call(move |conn| {
            let now = Utc::now();
            let row = Topic {
                id: new_id(),
                user_id,
                title: topic.title,
                description: topic.description,
                created_at: now,
                updated_at: now,
            };
            conn.execute(
                "INSERT INTO topics (id, user_id, title, description, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![row.id, row.user_id, row.title, row.description, row.created_at, row.updated_at],
            )?;
            Ok(row)
        })
        .await
    }

    async fn update_topic(
        &self,
        user_id: &str,
        topic_id: &str,
        patch: TopicPatch,
    ) -> Result<Option<Topic>> {
        let user_id = user_id.to_string();
        let topic_id = topic_id.to_string();
        self.call(move |conn| {
            let tx = conn.transaction()?;
            let Some(mut topic) = owned_topic(&tx, &user_id, &topic_id)? else {
                return Ok(None);
            };

            if let Some(title) = patch.title {
                topic.title = title;
            }
            if let Some(description) = patch.description {
                topic.description = Some(description);
            }
            topic.updated_at = Utc::now();

            tx.execute(
                "UPDATE topics SET title = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
                params![topic.title, topic.description, topic.updated_at, topic.id],
            )?;
            tx.commit()?;
            Ok(Some(topic))
        })
        .await
    }

    async fn delete_topic(&self, user_id: &str, topic_id: &str) -> Result<bool> {
        let user_id = user_id.to_string();
        let topic_id = topic_id.to_string();
        self.call(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM topics WHERE id = ?1 AND user_id = ?2",
                params![topic_id, user_id],
            )?;
            Ok(deleted > 0)
        })
        .await
    }
}
