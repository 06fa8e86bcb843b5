use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::topics::owned_topic;
use super::{Database, new_id};
use crate::domain::{Flashcard, FlashcardPatch, NewFlashcard};

const FLASHCARD_COLUMNS: &str =
    "f.id, f.topic_id, f.front, f.back, f.difficulty, f.source, f.created_at, f.updated_at";

fn flashcard_from_row(row: &Row<'_>) -> rusqlite::Result<Flashcard> {
    Ok(Flashcard {
        id: row.get(0)?,
        topic_id: row.get(1)?,
        front: row.get(2)?,
        back: row.get(3)?,
        difficulty: row.get(4)?,
        source: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn owned_flashcard(conn: &Connection, user_id: &str, flashcard_id: &str) -> Result<Option<Flashcard>> {
    let sql = format!(
        "SELECT {FLASHCARD_COLUMNS} FROM flashcards f
         JOIN topics t ON t.id = f.topic_id
         WHERE f.id = ?1 AND t.user_id = ?2"
    );
    Ok(conn
        .query_row(&sql, params![flashcard_id, user_id], flashcard_from_row)
        .optional()?)
}

#[async_trait]
pub trait FlashcardRepository: Send + Sync {
    /// `None` when the topic is not owned by `user_id`.
    async fn flashcards_for_topic(
        &self,
        user_id: &str,
        topic_id: &str,
    ) -> Result<Option<Vec<Flashcard>>>;

    async fn find_flashcard(&self, user_id: &str, flashcard_id: &str) -> Result<Option<Flashcard>>;

    /// Insert all cards in one transaction. `None` when the topic is not
    /// owned by `user_id`; nothing is written in that case.
    async fn insert_flashcards(
        &self,
        user_id: &str,
        topic_id: &str,
        cards: Vec<NewFlashcard>,
    ) -> Result<Option<Vec<Flashcard>>>;

    async fn update_flashcard(
        &self,
        user_id: &str,
        flashcard_id: &str,
        patch: FlashcardPatch,
    ) -> Result<Option<Flashcard>>;

    async fn delete_flashcard(&self, user_id: &str, flashcard_id: &str) -> Result<bool>;

    /// Remove every card of a topic. `None` when the topic is not owned.
    async fn delete_flashcards_for_topic(&self, user_id: &str, topic_id: &str)
    -> Result<Option<usize>>;
}

#[async_trait]
impl FlashcardRepository for Database {
    async fn flashcards_for_topic(
        &self,
        user_id: &str,
        topic_id: &str,
    ) -> Result<Option<Vec<Flashcard>>> {
        let user_id = user_id.to_string();
        let topic_id = topic_id.to_string();
        self.call(move |conn| {
            if owned_topic(conn, &user_id, &topic_id)?.is_none() {
                return Ok(None);
            }
            let sql = format!(
                "SELECT {FLASHCARD_COLUMNS} FROM flashcards f
                 WHERE f.topic_id = ?1 ORDER BY f.created_at, f.rowid"
            );
            let mut stmt = conn.prepare(&sql)?;
            let cards = stmt
                .query_map(params![topic_id], flashcard_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(Some(cards))
        })
        .await
    }

    async fn find_flashcard(&self, user_id: &str, flashcard_id: &str) -> Result<Option<Flashcard>> {
        let user_id = user_id.to_string();
        let flashcard_id = flashcard_id.to_string();
        self.call(move |conn| owned_flashcard(conn, &user_id, &flashcard_id))
            .await
    }

    async fn insert_flashcards(
        &self,
        user_id: &str,
        topic_id: &str,
        cards: Vec<NewFlashcard>,
    ) -> Result<Option<Vec<Flashcard>>> {
        let user_id = user_id.to_string();
        let topic_id = topic_id.to_string();
        self.call(move |conn| {
            let tx = conn.transaction()?;
            if owned_topic(&tx, &user_id, &topic_id)?.is_none() {
                return Ok(None);
            }

            let now = Utc::now();
            let mut inserted = Vec::with_capacity(cards.len());
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO flashcards
                        (id, topic_id, front, back, difficulty, source, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )?;
                for card in cards {
                    let row = Flashcard {
                        id: new_id(),
                        topic_id: topic_id.clone(),
                        front: card.front,
                        back: card.back,
                        difficulty: card.difficulty,
                        source: card.source,
                        created_at: now,
                        updated_at: now,
                    };
                    stmt.execute(params![
                        row.id,
                        row.topic_id,
                        row.front,
                        row.back,
                        row.difficulty,
                        row.source,
                        row.created_at,
                        row.updated_at
                    ])?;
                    inserted.push(row);
                }
            }
            tx.commit()?;
            Ok(Some(inserted))
        })
        .await
    }

    async fn update_flashcard(
        &self,
        user_id: &str,
        flashcard_id: &str,
        patch: FlashcardPatch,
    ) -> Result<Option<Flashcard>> {
        let user_id = user_id.to_string();
        let flashcard_id = flashcard_id.to_string();
        self.call(move |conn| {
            let tx = conn.transaction()?;
            let Some(mut card) = owned_flashcard(&tx, &user_id, &flashcard_id)? else {
                return Ok(None);
            };

            if let Some(front) = patch.front {
                card.front = front;
            }
            if let Some(back) = patch.back {
                card.back = back;
            }
            if let Some(difficulty) = patch.difficulty {
                card.difficulty = Some(difficulty);
            }
            card.updated_at = Utc::now();

            tx.execute(
                "UPDATE flashcards SET front = ?1, back = ?2, difficulty = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![card.front, card.back, card.difficulty, card.updated_at, card.id],
            )?;
            tx.commit()?;
            Ok(Some(card))
        })
        .await
    }

    async fn delete_flashcard(&self, user_id: &str, flashcard_id: &str) -> Result<bool> {
        let user_id = user_id.to_string();
        let flashcard_id = flashcard_id.to_string();
        self.call(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM flashcards
                 WHERE id = ?1
                   AND topic_id IN (SELECT id FROM topics WHERE user_id = ?2)",
                params![flashcard_id, user_id],
            )?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn delete_flashcards_for_topic(
        &self,
        user_id: &str,
        topic_id: &str,
    ) -> Result<Option<usize>> {
        let user_id = user_id.to_string();
        let topic_id = topic_id.to_string();
        self.call(move |conn| {
            let tx = conn.transaction()?;
            if owned_topic(&tx, &user_id, &topic_id)?.is_none() {
                return Ok(None);
            }
            let deleted = tx.execute("DELETE FROM flashcards WHERE topic_id = ?1", params![topic_id])?;
            tx.commit()?;
            Ok(Some(deleted))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::TopicRepository;
    use crate::database::test_support::{add_topic, add_user, db_with_user};
    use crate::domain::Difficulty;

    fn card(front: &str) -> NewFlashcard {
        NewFlashcard {
            front: front.to_string(),
            back: format!("{front} answer"),
            difficulty: Some(Difficulty::Easy),
            source: Some("ai-generated".to_string()),
        }
    }

    #[tokio::test]
    async fn test_insert_many_and_list() {
        let (db, user) = db_with_user("a@example.com").await;
        let topic = add_topic(&db, &user, "Chemistry").await;

        let inserted = db
            .insert_flashcards(&user.id, &topic.id, vec![card("H2O"), card("NaCl")])
            .await
            .expect("insert")
            .expect("owned");
        assert_eq!(inserted.len(), 2);

        let listed = db
            .flashcards_for_topic(&user.id, &topic.id)
            .await
            .expect("list")
            .expect("owned");
        assert_eq!(listed, inserted);
        assert_eq!(listed[0].difficulty, Some(Difficulty::Easy));
    }

    #[tokio::test]
    async fn test_foreign_topic_writes_nothing() {
        let (db, alice) = db_with_user("alice@example.com").await;
        let mallory = add_user(&db, "mallory@example.com").await;
        let topic = add_topic(&db, &alice, "Secrets").await;

        let result = db
            .insert_flashcards(&mallory.id, &topic.id, vec![card("sneaky")])
            .await
            .expect("insert");
        assert!(result.is_none());

        let listed = db
            .flashcards_for_topic(&alice.id, &topic.id)
            .await
            .expect("list")
            .expect("owned");
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn test_card_ownership_through_topic() {
        let (db, alice) = db_with_user("alice@example.com").await;
        let bob = add_user(&db, "bob@example.com").await;
        let topic = add_topic(&db, &alice, "History").await;
        let cards = db
            .insert_flashcards(&alice.id, &topic.id, vec![card("1066")])
            .await
            .expect("insert")
            .expect("owned");
        let id = &cards[0].id;

        assert!(db.find_flashcard(&bob.id, id).await.expect("find").is_none());
        assert!(!db.delete_flashcard(&bob.id, id).await.expect("delete"));
        assert!(
            db.update_flashcard(&bob.id, id, FlashcardPatch::default())
                .await
                .expect("update")
                .is_none()
        );
        assert!(db.find_flashcard(&alice.id, id).await.expect("find").is_some());
    }

    #[tokio::test]
    async fn test_topic_delete_cascades_to_cards() {
        let (db, user) = db_with_user("a@example.com").await;
        let topic = add_topic(&db, &user, "Physics").await;
        let cards = db
            .insert_flashcards(&user.id, &topic.id, vec![card("F=ma")])
            .await
            .expect("insert")
            .expect("owned");

        assert!(db.delete_topic(&user.id, &topic.id).await.expect("delete"));
        assert!(db.find_flashcard(&user.id, &cards[0].id).await.expect("find").is_none());
    }

    #[tokio::test]
    async fn test_delete_for_topic_counts() {
        let (db, user) = db_with_user("a@example.com").await;
        let topic = add_topic(&db, &user, "Art").await;
        db.insert_flashcards(&user.id, &topic.id, vec![card("a"), card("b"), card("c")])
            .await
            .expect("insert");

        let deleted = db
            .delete_flashcards_for_topic(&user.id, &topic.id)
            .await
            .expect("delete");
        assert_eq!(deleted, Some(3));
    }
}
