//! Per-user AI provider settings.
//!
//! The API key column only ever holds ciphertext produced by
//! [`KeyManager`](super::KeyManager); callers encrypt before writing.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{OptionalExtension, params};

use super::{Database, new_id};
use crate::domain::{AiProvider, UserSettings};

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn get_settings(&self, user_id: &str) -> Result<Option<UserSettings>>;

    /// Insert or replace provider, key and preferred model for a user.
    async fn upsert_ai_provider(
        &self,
        user_id: &str,
        provider: AiProvider,
        encrypted_api_key: String,
        preferred_model: Option<String>,
    ) -> Result<UserSettings>;

    /// Clear the stored key. Returns false when the user has no settings row.
    async fn clear_api_key(&self, user_id: &str) -> Result<bool>;
}

#[async_trait]
impl SettingsRepository for Database {
    async fn get_settings(&self, user_id: &str) -> Result<Option<UserSettings>> {
        let user_id = user_id.to_string();
        self.call(move |conn| {
            Ok(conn
                .query_row(
                    "SELECT id, user_id, ai_provider, encrypted_api_key, preferred_model,
                            created_at, updated_at
                     FROM user_settings WHERE user_id = ?1",
                    params![user_id],
                    |row| {
                        Ok(UserSettings {
                            id: row.get(0)?,
                            user_id: row.get(1)?,
                            ai_provider: row.get(2)?,
                            encrypted_api_key: row.get(3)?,
                            preferred_model: row.get(4)?,
                            created_at: row.get(5)?,
                            updated_at: row.get(6)?,
                        })
                    },
                )
                .optional()?)
        })
        .await
    }

    async fn upsert_ai_provider(
        &self,
        user_id: &str,
        provider: AiProvider,
        encrypted_api_key: String,
        preferred_model: Option<String>,
    ) -> Result<UserSettings> {
        let user_id = user_id.to_string();
        self.call(move |conn| {
            let now = Utc::now();
            let row = conn.query_row(
                "INSERT INTO user_settings
                    (id, user_id, ai_provider, encrypted_api_key, preferred_model, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                 ON CONFLICT (user_id) DO UPDATE SET
                    ai_provider = excluded.ai_provider,
                    encrypted_api_key = excluded.encrypted_api_key,
                    preferred_model = excluded.preferred_model,
                    updated_at = excluded.updated_at
                 RETURNING id, created_at",
                params![new_id(), user_id, provider, encrypted_api_key, preferred_model, now],
                |row| Ok((row.get::<_, String>(0)?, row.get(1)?)),
            )?;
            Ok(UserSettings {
                id: row.0,
                user_id,
                ai_provider: provider,
                encrypted_api_key: Some(encrypted_api_key),
                preferred_model,
                created_at: row.1,
                updated_at: now,
            })
        })
        .await
    }

    async fn clear_api_key(&self, user_id: &str) -> Result<bool> {
        let user_id = user_id.to_string();
        self.call(move |conn| {
            let updated = conn.execute(
                "UPDATE user_settings SET encrypted_api_key = NULL, updated_at = ?1 WHERE user_id = ?2",
                params![Utc::now(), user_id],
            )?;
            Ok(updated > 0)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::db_with_user;

    #[tokio::test]
    async fn test_upsert_keeps_single_row() {
        let (db, user) = db_with_user("a@example.com").await;

        let first = db
            .upsert_ai_provider(&user.id, AiProvider::Google, "cipher-1".to_string(), None)
            .await
            .expect("insert");
        let second = db
            .upsert_ai_provider(
                &user.id,
                AiProvider::Openai,
                "cipher-2".to_string(),
                Some("gpt-4o".to_string()),
            )
            .await
            .expect("update");
        assert_eq!(first.id, second.id);

        let stored = db.get_settings(&user.id).await.expect("get").expect("row");
        assert_eq!(stored.ai_provider, AiProvider::Openai);
        assert_eq!(stored.encrypted_api_key.as_deref(), Some("cipher-2"));
        assert_eq!(stored.preferred_model.as_deref(), Some("gpt-4o"));
    }

    #[tokio::test]
    async fn test_clear_api_key() {
        let (db, user) = db_with_user("a@example.com").await;
        assert!(!db.clear_api_key(&user.id).await.expect("clear"));

        db.upsert_ai_provider(&user.id, AiProvider::Google, "cipher".to_string(), None)
            .await
            .expect("insert");
        assert!(db.clear_api_key(&user.id).await.expect("clear"));

        let stored = db.get_settings(&user.id).await.expect("get").expect("row");
        assert!(stored.encrypted_api_key.is_none());
        assert_eq!(stored.ai_provider, AiProvider::Google);
    }
}
