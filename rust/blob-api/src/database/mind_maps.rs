use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::topics::owned_topic;
use super::{Database, new_id};
use crate::domain::{MindMap, MindMapData};

const MIND_MAP_COLUMNS: &str = "m.id, m.topic_id, m.data, m.created_at, m.updated_at";

fn mind_map_from_row(row: &Row<'_>) -> rusqlite::Result<MindMap> {
    let data: String = row.get(2)?;
    let data: MindMapData = serde_json::from_str(&data).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(MindMap {
        id: row.get(0)?,
        topic_id: row.get(1)?,
        data,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn owned_mind_map(conn: &Connection, user_id: &str, mind_map_id: &str) -> Result<Option<MindMap>> {
    let sql = format!(
        "SELECT {MIND_MAP_COLUMNS} FROM mind_maps m
         JOIN topics t ON t.id = m.topic_id
         WHERE m.id = ?1 AND t.user_id = ?2"
    );
    Ok(conn
        .query_row(&sql, params![mind_map_id, user_id], mind_map_from_row)
        .optional()?)
}

#[async_trait]
pub trait MindMapRepository: Send + Sync {
    async fn mind_maps_for_topic(&self, user_id: &str, topic_id: &str)
    -> Result<Option<Vec<MindMap>>>;

    async fn find_mind_map(&self, user_id: &str, mind_map_id: &str) -> Result<Option<MindMap>>;

    async fn create_mind_map(
        &self,
        user_id: &str,
        topic_id: &str,
        data: MindMapData,
    ) -> Result<Option<MindMap>>;

    /// Replace the whole node list.
    async fn update_mind_map(
        &self,
        user_id: &str,
        mind_map_id: &str,
        data: MindMapData,
    ) -> Result<Option<MindMap>>;

    async fn delete_mind_map(&self, user_id: &str, mind_map_id: &str) -> Result<bool>;
}

#[async_trait]
impl MindMapRepository for Database {
    async fn mind_maps_for_topic(
        &self,
        user_id: &str,
        topic_id: &str,
    ) -> Result<Option<Vec<MindMap>>> {
        let user_id = user_id.to_string();
        let topic_id = topic_id.to_string();
        self.call(move |conn| {
            if owned_topic(conn, &user_id, &topic_id)?.is_none() {
                return Ok(None);
            }
            let sql = format!(
                "SELECT {MIND_MAP_COLUMNS} FROM mind_maps m
                 WHERE m.topic_id = ?1 ORDER BY m.created_at, m.rowid"
            );
            let mut stmt = conn.prepare(&sql)?;
            let maps = stmt
                .query_map(params![topic_id], mind_map_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(Some(maps))
        })
        .await
    }

    async fn find_mind_map(&self, user_id: &str, mind_map_id: &str) -> Result<Option<MindMap>> {
        let user_id = user_id.to_string();
        let mind_map_id = mind_map_id.to_string();
        self.call(move |conn| owned_mind_map(conn, &user_id, &mind_map_id))
            .await
    }

    async fn create_mind_map(
        &self,
        user_id: &str,
        topic_id: &str,
        data: MindMapData,
    ) -> Result<Option<MindMap>> {
        let user_id = user_id.to_string();
        let topic_id = topic_id.to_string();
        self.call(move |conn| {
            if owned_topic(conn, &user_id, &topic_id)?.is_none() {
                return Ok(None);
            }
            let now = Utc::now();
            let row = MindMap {
                id: new_id(),
                topic_id,
                data,
                created_at: now,
                updated_at: now,
            };
            conn.execute(
                "INSERT INTO mind_maps (id, topic_id, data, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    row.id,
                    row.topic_id,
                    serde_json::to_string(&row.data)?,
                    row.created_at,
                    row.updated_at
                ],
            )?;
            Ok(Some(row))
        })
        .await
    }

    async fn update_mind_map(
        &self,
        user_id: &str,
        mind_map_id: &str,
        data: MindMapData,
    ) -> Result<Option<MindMap>> {
        let user_id = user_id.to_string();
        let mind_map_id = mind_map_id.to_string();
        self.call(move |conn| {
            let tx = conn.transaction()?;
            let Some(mut map) = owned_mind_map(&tx, &user_id, &mind_map_id)? else {
                return Ok(None);
            };
            map.data = data;
            map.updated_at = Utc::now();
            tx.execute(
                "UPDATE mind_maps SET data = ?1, updated_at = ?2 WHERE id = ?3",
                params![serde_json::to_string(&map.data)?, map.updated_at, map.id],
            )?;
            tx.commit()?;
            Ok(Some(map))
        })
        .await
    }

    async fn delete_mind_map(&self, user_id: &str, mind_map_id: &str) -> Result<bool> {
        let user_id = user_id.to_string();
        let mind_map_id = mind_map_id.to_string();
        self.call(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM mind_maps
                 WHERE id = ?1
                   AND topic_id IN (SELECT id FROM topics WHERE user_id = ?2)",
                params![mind_map_id, user_id],
            )?;
            Ok(deleted > 0)
        })
        .await
    }
}
