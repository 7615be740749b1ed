//! SQLite-backed publishing store.

use super::filter::{Field, Filter, FilterValue};
use super::models::{
    Galley, LiveEntry, Section, SectionKey, Submission, Tombstone, TombstoneSet, Venue,
};
use super::schema::PUBLISHING_VERSIONED_SCHEMAS;
use super::trait_def::PublishingStore;
use crate::sqlite_persistence::open_versioned;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::{ToSqlOutput, Type};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, ToSql};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

const PUBLISHED_STATUS: &str = "published";

impl ToSql for FilterValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            FilterValue::Int(value) => value.to_sql(),
            FilterValue::Text(value) => value.to_sql(),
            FilterValue::Timestamp(value) => Ok(ToSqlOutput::from(value.timestamp())),
        }
    }
}

fn live_column(field: Field) -> Option<&'static str> {
    match field {
        Field::RecordId => Some("id"),
        Field::VenueId => Some("venue_id"),
        Field::SectionId => Some("section_id"),
        Field::Datestamp => Some("last_modified"),
        Field::SetSpec => None,
    }
}

fn tombstone_column(field: Field) -> Option<&'static str> {
    match field {
        Field::RecordId => Some("record_id"),
        Field::VenueId => Some("venue_id"),
        Field::SectionId => Some("section_id"),
        Field::Datestamp => Some("date_deleted"),
        Field::SetSpec => Some("set_spec"),
    }
}

fn timestamp_from_db(row: &rusqlite::Row, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let secs: i64 = row.get(column)?;
    DateTime::from_timestamp(secs, 0).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            Type::Integer,
            format!("timestamp {} out of range in column {}", secs, column).into(),
        )
    })
}

pub struct SqlitePublishingStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqlitePublishingStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        info!("Opening publishing database at {:?}", path);
        let mut conn = Connection::open(path).context("Failed to open publishing database")?;
        conn.execute("PRAGMA foreign_keys = ON;", [])?;
        open_versioned(&mut conn, PUBLISHING_VERSIONED_SCHEMAS, "publishing")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn row_to_venue(row: &rusqlite::Row) -> rusqlite::Result<Venue> {
        Ok(Venue {
            id: row.get("id")?,
            path: row.get("path")?,
            name: row.get("name")?,
            description: row.get("description")?,
            contact_email: row.get("contact_email")?,
            enabled: row.get::<_, i64>("enabled")? != 0,
            seq: row.get("seq")?,
        })
    }

    fn row_to_section(row: &rusqlite::Row) -> rusqlite::Result<Section> {
        Ok(Section {
            id: row.get("id")?,
            venue_id: row.get("venue_id")?,
            abbrev: row.get("abbrev")?,
            title: row.get("title")?,
            policy: row.get("policy")?,
            seq: row.get("seq")?,
        })
    }

    fn row_to_submission(row: &rusqlite::Row) -> rusqlite::Result<Submission> {
        let authors_json: String = row.get("authors")?;
        let authors: Vec<String> = serde_json::from_str(&authors_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e))
        })?;

        Ok(Submission {
            id: row.get("id")?,
            venue_id: row.get("venue_id")?,
            section_id: row.get("section_id")?,
            publication_id: row.get("publication_id")?,
            title: row.get("title")?,
            abstract_text: row.get("abstract")?,
            authors,
            locale: row.get("locale")?,
            doi: row.get("doi")?,
            date_published: timestamp_from_db(row, "date_published")?,
            last_modified: timestamp_from_db(row, "last_modified")?,
        })
    }

    fn row_to_galley(row: &rusqlite::Row) -> rusqlite::Result<Galley> {
        Ok(Galley {
            id: row.get("id")?,
            publication_id: row.get("publication_id")?,
            label: row.get("label")?,
            locale: row.get("locale")?,
            file_type: row.get("file_type")?,
            remote_url: row.get("remote_url")?,
            seq: row.get("seq")?,
        })
    }

    fn row_to_live_entry(row: &rusqlite::Row) -> rusqlite::Result<LiveEntry> {
        Ok(LiveEntry {
            record_id: row.get("id")?,
            venue_id: row.get("venue_id")?,
            section_id: row.get("section_id")?,
            last_modified: timestamp_from_db(row, "last_modified")?,
        })
    }

    fn row_to_tombstone(row: &rusqlite::Row) -> rusqlite::Result<Tombstone> {
        Ok(Tombstone {
            id: row.get("id")?,
            record_id: row.get("record_id")?,
            identifier: row.get("identifier")?,
            venue_id: row.get("venue_id")?,
            section_id: row.get("section_id")?,
            set_spec: row.get("set_spec")?,
            date_deleted: timestamp_from_db(row, "date_deleted")?,
        })
    }

    fn min_timestamp(
        &self,
        sql_prefix: &str,
        filter: &Filter,
        column: &dyn Fn(Field) -> Option<&'static str>,
    ) -> Result<Option<DateTime<Utc>>> {
        let fragment = filter.to_sql(column)?;
        let sql = format!("{} AND {}", sql_prefix, fragment.clause);
        let conn = self.conn.lock().unwrap();
        let secs: Option<i64> = conn.query_row(
            &sql,
            params_from_iter(fragment.params.iter()),
            |row| row.get(0),
        )?;
        Ok(secs.and_then(|s| DateTime::from_timestamp(s, 0)))
    }
}

impl PublishingStore for SqlitePublishingStore {
    fn get_venue(&self, id: i64) -> Result<Option<Venue>> {
        let conn = self.conn.lock().unwrap();
        let venue = conn
            .query_row(
                "SELECT * FROM venues WHERE id = ?1",
                params![id],
                Self::row_to_venue,
            )
            .optional()?;
        Ok(venue)
    }

    fn get_venue_by_path(&self, path: &str) -> Result<Option<Venue>> {
        let conn = self.conn.lock().unwrap();
        let venue = conn
            .query_row(
                "SELECT * FROM venues WHERE path = ?1 ORDER BY id LIMIT 1",
                params![path],
                Self::row_to_venue,
            )
            .optional()?;
        Ok(venue)
    }

    fn list_venues(&self, enabled_only: bool) -> Result<Vec<Venue>> {
        let conn = self.conn.lock().unwrap();
        let sql = if enabled_only {
            "SELECT * FROM venues WHERE enabled = 1 ORDER BY seq, id"
        } else {
            "SELECT * FROM venues ORDER BY seq, id"
        };
        let mut stmt = conn.prepare(sql)?;
        let venues = stmt
            .query_map([], Self::row_to_venue)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(venues)
    }

    fn list_sections(&self, venue_id: i64) -> Result<Vec<Section>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT * FROM sections WHERE venue_id = ?1 ORDER BY seq, id")?;
        let sections = stmt
            .query_map(params![venue_id], Self::row_to_section)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sections)
    }

    fn get_section(&self, venue_id: i64, key: SectionKey<'_>) -> Result<Option<Section>> {
        let conn = self.conn.lock().unwrap();
        let section = match key {
            SectionKey::Id(id) => conn
                .query_row(
                    "SELECT * FROM sections WHERE venue_id = ?1 AND id = ?2",
                    params![venue_id, id],
                    Self::row_to_section,
                )
                .optional()?,
            SectionKey::Abbrev(abbrev) => conn
                .query_row(
                    "SELECT * FROM sections WHERE venue_id = ?1 AND abbrev = ?2
                     ORDER BY seq, id LIMIT 1",
                    params![venue_id, abbrev],
                    Self::row_to_section,
                )
                .optional()?,
        };
        Ok(section)
    }

    fn get_published_submission(&self, id: i64) -> Result<Option<Submission>> {
        let conn = self.conn.lock().unwrap();
        let submission = conn
            .query_row(
                "SELECT * FROM submissions WHERE id = ?1 AND status = ?2",
                params![id, PUBLISHED_STATUS],
                Self::row_to_submission,
            )
            .optional()?;
        Ok(submission)
    }

    fn get_galleys(&self, publication_id: i64) -> Result<Vec<Galley>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT * FROM galleys WHERE publication_id = ?1 ORDER BY seq, id")?;
        let galleys = stmt
            .query_map(params![publication_id], Self::row_to_galley)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(galleys)
    }

    fn list_live_entries(&self, filter: &Filter) -> Result<Vec<LiveEntry>> {
        let fragment = filter.to_sql(&live_column)?;
        let sql = format!(
            "SELECT id, venue_id, section_id, last_modified FROM submissions
             WHERE status = '{}' AND {}
             ORDER BY venue_id, section_id, id",
            PUBLISHED_STATUS, fragment.clause
        );

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(
                params_from_iter(fragment.params.iter()),
                Self::row_to_live_entry,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    fn earliest_live_datestamp(&self, filter: &Filter) -> Result<Option<DateTime<Utc>>> {
        self.min_timestamp(
            &format!(
                "SELECT MIN(last_modified) FROM submissions WHERE status = '{}'",
                PUBLISHED_STATUS
            ),
            filter,
            &live_column,
        )
    }

    fn list_tombstones(&self, filter: &Filter) -> Result<Vec<Tombstone>> {
        let fragment = filter.to_sql(&tombstone_column)?;
        let sql = format!(
            "SELECT * FROM tombstones WHERE {}
             ORDER BY venue_id, COALESCE(section_id, 0), record_id, id",
            fragment.clause
        );

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let tombstones = stmt
            .query_map(
                params_from_iter(fragment.params.iter()),
                Self::row_to_tombstone,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tombstones)
    }

    fn get_tombstone(&self, record_id: i64) -> Result<Option<Tombstone>> {
        let conn = self.conn.lock().unwrap();
        let tombstone = conn
            .query_row(
                "SELECT * FROM tombstones WHERE record_id = ?1
                 ORDER BY date_deleted DESC, id DESC LIMIT 1",
                params![record_id],
                Self::row_to_tombstone,
            )
            .optional()?;
        Ok(tombstone)
    }

    fn list_tombstone_derived_sets(&self, venue_id: i64) -> Result<Vec<TombstoneSet>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT set_spec FROM tombstones WHERE venue_id = ?1 ORDER BY set_spec",
        )?;
        let sets = stmt
            .query_map(params![venue_id], |row| {
                Ok(TombstoneSet {
                    venue_id,
                    set_spec: row.get(0)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sets)
    }

    fn earliest_tombstone_datestamp(&self, filter: &Filter) -> Result<Option<DateTime<Utc>>> {
        self.min_timestamp(
            "SELECT MIN(date_deleted) FROM tombstones WHERE 1 = 1",
            filter,
            &tombstone_column,
        )
    }
}
