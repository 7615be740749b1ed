use super::schema::TOKEN_VERSIONED_SCHEMAS;
use super::{ResumptionTokenStore, StoredToken};
use crate::sqlite_persistence::open_versioned;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

pub struct SqliteTokenStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTokenStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        info!("Opening harvest database at {:?}", path);
        let mut conn = Connection::open(path).context("Failed to open harvest database")?;
        open_versioned(&mut conn, TOKEN_VERSIONED_SCHEMAS, "harvest")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory store, mostly useful for tests.
    pub fn in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        open_versioned(&mut conn, TOKEN_VERSIONED_SCHEMAS, "harvest")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn row_to_token(row: &rusqlite::Row) -> rusqlite::Result<StoredToken> {
        let expires_at: i64 = row.get("expires_at")?;
        Ok(StoredToken {
            id: row.get("id")?,
            offset: row.get::<_, i64>("cursor_offset")? as usize,
            complete_list_size: row.get::<_, i64>("complete_list_size")? as usize,
            params: row.get("params")?,
            expires_at: DateTime::from_timestamp(expires_at, 0).unwrap_or(DateTime::UNIX_EPOCH),
        })
    }
}

impl ResumptionTokenStore for SqliteTokenStore {
    fn insert(&self, token: &StoredToken) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO resumption_tokens (id, cursor_offset, complete_list_size, params, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                token.id,
                token.offset as i64,
                token.complete_list_size as i64,
                token.params,
                token.expires_at.timestamp(),
            ],
        )
        .context("Failed to store resumption token")?;
        Ok(())
    }

    fn evict_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM resumption_tokens WHERE expires_at <= ?1",
            params![now.timestamp()],
        )?;
        if deleted > 0 {
            debug!("Evicted {} expired resumption tokens", deleted);
        }
        Ok(deleted)
    }

    fn get(&self, id: &str) -> Result<Option<StoredToken>> {
        let conn = self.conn.lock().unwrap();
        let token = conn
            .query_row(
                "SELECT * FROM resumption_tokens WHERE id = ?1",
                params![id],
                Self::row_to_token,
            )
            .optional()?;
        Ok(token)
    }
}
