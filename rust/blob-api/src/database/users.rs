//! Users and their linked OAuth identities.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};

use super::{Database, new_id};
use crate::domain::{NewUser, User};

const USER_COLUMNS: &str = "id, name, email, image, created_at, updated_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        image: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user(&self, id: &str) -> Result<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn create_user(&self, user: NewUser) -> Result<User>;

    /// Find or create the user for a verified identity and record the login
    /// on the `(provider, subject)` account. Returns the user and whether it
    /// was created.
    async fn record_oauth_login(
        &self,
        provider_id: &str,
        provider_user_id: &str,
        user: NewUser,
    ) -> Result<(User, bool)>;
}

#[async_trait]
impl UserRepository for Database {
    async fn find_user(&self, id: &str) -> Result<Option<User>> {
        let id = id.to_string();
        self.call(move |conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
            Ok(conn
                .query_row(&sql, params![id], user_from_row)
                .optional()?)
        })
        .await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.to_string();
        self.call(move |conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
            Ok(conn
                .query_row(&sql, params![email], user_from_row)
                .optional()?)
        })
        .await
    }

    async fn create_user(&self, user: NewUser) -> Result<User> {
        self.call(move |conn| {
            let now = Utc::now();
            let row = User {
                id: new_id(),
                name: user.name,
                email: user.email,
                image: user.image,
                created_at: now,
                updated_at: now,
            };
            conn.execute(
                "INSERT INTO users (id, name, email, image, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![row.id, row.name, row.email, row.image, row.created_at, row.updated_at],
            )?;
            Ok(row)
        })
        .await
    }

    async fn record_oauth_login(
        &self,
        provider_id: &str,
        provider_user_id: &str,
        user: NewUser,
    ) -> Result<(User, bool)> {
        let provider_id = provider_id.to_string();
        let provider_user_id = provider_user_id.to_string();
        self.call(move |conn| {
            let tx = conn.transaction()?;
            let now = Utc::now();

            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
            let existing = tx
                .query_row(&sql, params![user.email], user_from_row)
                .optional()?;
            let (row, created) = match existing {
                Some(row) => (row, false),
                None => {
                    let row = User {
                        id: new_id(),
                        name: user.name,
                        email: user.email,
                        image: user.image,
                        created_at: now,
                        updated_at: now,
                    };
                    tx.execute(
                        "INSERT INTO users (id, name, email, image, created_at, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        params![row.id, row.name, row.email, row.image, row.created_at, row.updated_at],
                    )?;
                    (row, true)
                }
            };

            tx.execute(
                "INSERT INTO oauth_accounts
                    (id, user_id, provider_id, provider_user_id, last_login_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5, ?5)
                 ON CONFLICT (provider_id, provider_user_id)
                 DO UPDATE SET last_login_at = excluded.last_login_at,
                               updated_at = excluded.updated_at",
                params![new_id(), row.id, provider_id, provider_user_id, now],
            )?;

            tx.commit()?;
            Ok((row, created))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn google_user(email: &str) -> NewUser {
        NewUser {
            name: "Ada".to_string(),
            email: email.to_string(),
            image: Some("https://example.com/ada.png".to_string()),
        }
    }

    #[tokio::test]
    async fn test_oauth_login_creates_once() {
        let db = Database::open_in_memory().expect("open");

        let (first, created) = db
            .record_oauth_login("google", "sub-1", google_user("ada@example.com"))
            .await
            .expect("first login");
        assert!(created);

        let (second, created) = db
            .record_oauth_login("google", "sub-1", google_user("ada@example.com"))
            .await
            .expect("second login");
        assert!(!created);
        assert_eq!(first.id, second.id);

        let accounts: i64 = db
            .call(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM oauth_accounts", [], |r| r.get(0))?)
            })
            .await
            .expect("count");
        assert_eq!(accounts, 1);
    }

    #[tokio::test]
    async fn test_find_user_by_email() {
        let db = Database::open_in_memory().expect("open");
        let user = db.create_user(google_user("bob@example.com")).await.expect("create");

        let found = db.find_user_by_email("bob@example.com").await.expect("find");
        assert_eq!(found, Some(user.clone()));
        assert!(db.find_user("missing").await.expect("find").is_none());
        assert_eq!(db.find_user(&user.id).await.expect("find"), Some(user));
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let db = Database::open_in_memory().expect("open");
        db.create_user(google_user("dup@example.com")).await.expect("create");
        assert!(db.create_user(google_user("dup@example.com")).await.is_err());
    }
}
