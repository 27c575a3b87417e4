//! SQLite-backed record store.
//!
//! Keeps the same `api_keys` table shape as the hosted backend so rows
//! can move between the two. rusqlite is blocking, so every call runs
//! on tokio's blocking pool behind a mutex-guarded connection.

use std::num::NonZeroU64;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::errors::StoreError;
use crate::keys::{ApiKeyPatch, ApiKeyRecord, NewApiKeyRecord};

use super::RecordStore;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS api_keys (
    id            TEXT PRIMARY KEY,
    user_id       TEXT NOT NULL,
    name          TEXT NOT NULL,
    key           TEXT NOT NULL,
    monthly_limit INTEGER,
    usage         INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS api_keys_user_id ON api_keys (user_id);";

const SELECT_COLUMNS: &str = "SELECT id, user_id, name, key, monthly_limit, usage, created_at FROM api_keys";

#[derive(Debug, Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Unavailable(format!("{}: {e}", parent.display())))?;
            }
        }

        let conn = Connection::open(path).map_err(backend)?;

        // Key material lives in here; owner-only.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(path, perms);
        }

        Self::with_connection(conn)
    }

    /// A private database that disappears with the store.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory().map_err(backend)?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA).map_err(backend)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn run<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().unwrap_or_else(PoisonError::into_inner);
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("blocking task failed: {e}")))?
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn list(&self, owner_id: &str) -> Result<Vec<ApiKeyRecord>, StoreError> {
        let owner_id = owner_id.to_string();
        self.run(move |conn| {
            let mut stmt = conn
                .prepare(&format!("{SELECT_COLUMNS} WHERE user_id = ?1 ORDER BY rowid"))
                .map_err(backend)?;
            let rows = stmt
                .query_map(params![owner_id], row_to_record)
                .map_err(backend)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(backend)
        })
        .await
    }

    async fn insert(&self, record: NewApiKeyRecord) -> Result<ApiKeyRecord, StoreError> {
        self.run(move |conn| {
            let stored = ApiKeyRecord {
                id: Uuid::new_v4().to_string(),
                owner_id: record.owner_id,
                name: record.name,
                secret: record.secret,
                monthly_limit: record.monthly_limit,
                usage_count: 0,
                // Stored with microsecond precision.
                created_at: Utc::now().trunc_subsecs(6),
            };
            conn.execute(
                "INSERT INTO api_keys (id, user_id, name, key, monthly_limit, usage, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
                params![
                    stored.id,
                    stored.owner_id,
                    stored.name,
                    stored.secret,
                    limit_to_sql(stored.monthly_limit),
                    timestamp(&stored.created_at),
                ],
            )
            .map_err(backend)?;
            Ok(stored)
        })
        .await
    }

    async fn update(&self, id: &str, patch: ApiKeyPatch) -> Result<ApiKeyRecord, StoreError> {
        let id = id.to_string();
        self.run(move |conn| {
            let current = conn
                .query_row(
                    &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                    params![id],
                    row_to_record,
                )
                .optional()
                .map_err(backend)?
                .ok_or_else(|| StoreError::NotFound(id.clone()))?;

            let updated = patch.apply_to(&current);
            conn.execute(
                "UPDATE api_keys SET name = ?1, key = ?2, monthly_limit = ?3 WHERE id = ?4",
                params![
                    updated.name,
                    updated.secret,
                    limit_to_sql(updated.monthly_limit),
                    updated.id,
                ],
            )
            .map_err(backend)?;
            Ok(updated)
        })
        .await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let id = id.to_string();
        self.run(move |conn| {
            conn.execute("DELETE FROM api_keys WHERE id = ?1", params![id])
                .map_err(backend)?;
            Ok(())
        })
        .await
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<ApiKeyRecord> {
    let limit: Option<i64> = row.get(4)?;
    let usage: i64 = row.get(5)?;
    let created_at: String = row.get(6)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
        })?
        .with_timezone(&Utc);

    Ok(ApiKeyRecord {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        secret: row.get(3)?,
        monthly_limit: limit
            .and_then(|n| u64::try_from(n).ok())
            .and_then(NonZeroU64::new),
        usage_count: u64::try_from(usage).unwrap_or(0),
        created_at,
    })
}

fn limit_to_sql(limit: Option<NonZeroU64>) -> Option<i64> {
    limit.map(|n| i64::try_from(n.get()).unwrap_or(i64::MAX))
}

fn timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn backend(e: rusqlite::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}
