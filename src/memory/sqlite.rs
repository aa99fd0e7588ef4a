use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::store::PreferenceStore;
use super::types::{PersistedPreference, PreferenceUpsert};
use crate::error::StoreError;
use crate::facts::{Cluster, FactType};

const COLUMNS: &str =
    "id, user_id, cluster, preference_type, normalized_value, label, validated, metadata, created_at, updated_at";

/// SQLite-backed system-of-record.
///
/// The unique constraint on `(user_id, cluster, normalized_value)` makes the
/// upsert atomic per row. Rows are never deleted here.
///
/// Statements run on tokio's blocking pool so a slow disk never stalls the
/// session tick.
pub struct SqlitePreferenceStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqlitePreferenceStore {
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Other(e.to_string()))?;
            }
        }

        let conn = Connection::open(db_path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        Self::init_schema(&conn)?;
        info!("preference store opened at {}", db_path.display());

        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// Idempotent: safe on every start.
    pub fn init_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS user_repo_preferences (
                id               INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id          TEXT NOT NULL,
                cluster          TEXT NOT NULL,
                preference_type  TEXT NOT NULL,
                normalized_value TEXT NOT NULL,
                label            TEXT NOT NULL,
                validated        INTEGER NOT NULL DEFAULT 0,
                metadata         TEXT NOT NULL DEFAULT '{}',
                created_at       TEXT NOT NULL,
                updated_at       TEXT NOT NULL,
                UNIQUE (user_id, cluster, normalized_value)
            );
            CREATE INDEX IF NOT EXISTS idx_repo_prefs_user ON user_repo_preferences(user_id);",
        )?;
        Ok(())
    }

    async fn with_conn<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| StoreError::LockPoisoned)?;
            op(&conn)
        })
        .await
        .map_err(|e| StoreError::Other(format!("sqlite worker: {e}")))?
    }

    fn row_to_preference(row: &Row<'_>) -> rusqlite::Result<PersistedPreference> {
        let cluster_raw: String = row.get(2)?;
        let cluster = Cluster::parse(&cluster_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(2, Type::Text, format!("unknown cluster {cluster_raw}").into())
        })?;
        let type_raw: String = row.get(3)?;
        let metadata = match row.get::<_, Value>(7)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        Ok(PersistedPreference {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            cluster,
            fact_type: FactType::from_entity_type(&type_raw),
            normalized_value: row.get(4)?,
            label: row.get(5)?,
            validated: row.get(6)?,
            metadata,
            created_at: row.get::<_, DateTime<Utc>>(8)?,
            updated_at: row.get::<_, DateTime<Utc>>(9)?,
        })
    }
}

#[async_trait]
impl PreferenceStore for SqlitePreferenceStore {
    async fn upsert(&self, record: &PreferenceUpsert) -> Result<PersistedPreference, StoreError> {
        let record = record.clone();

        let saved = self
            .with_conn(move |conn| {
                let metadata = Value::Object(record.metadata);
                // validated only rises unless the caller opts in (?9).
                let sql = format!(
                    "INSERT INTO user_repo_preferences
                        (user_id, cluster, preference_type, normalized_value, label, validated, metadata, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, json(?7), ?8, ?8)
                     ON CONFLICT(user_id, cluster, normalized_value) DO UPDATE SET
                        preference_type = excluded.preference_type,
                        label = excluded.label,
                        metadata = json_patch(user_repo_preferences.metadata, excluded.metadata),
                        validated = CASE WHEN ?9 THEN excluded.validated
                                         ELSE MAX(user_repo_preferences.validated, excluded.validated) END,
                        updated_at = excluded.updated_at
                     RETURNING {COLUMNS}"
                );

                let row = conn.query_row(
                    &sql,
                    params![
                        record.owner_id,
                        record.cluster.as_str(),
                        record.fact_type.slug(),
                        record.normalized_value,
                        record.label,
                        record.validated,
                        metadata,
                        Utc::now(),
                        record.allow_downgrade,
                    ],
                    Self::row_to_preference,
                )?;
                Ok(row)
            })
            .await?;

        debug!("upserted preference {} ({})", saved.id, saved.cluster);
        Ok(saved)
    }

    async fn list(&self, owner_id: &str) -> Result<Vec<PersistedPreference>, StoreError> {
        let owner_id = owner_id.to_string();
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {COLUMNS} FROM user_repo_preferences
                 WHERE user_id = ?1
                 ORDER BY cluster, created_at DESC, id DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![owner_id], Self::row_to_preference)?;
            let prefs = rows.collect::<Result<Vec<_>, _>>()?;
            Ok(prefs)
        })
        .await
    }
}
