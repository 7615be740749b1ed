//! Test fixture creation for the publishing database
//!
//! The harvesting side never writes publishing data, so fixtures are
//! inserted with direct SQL after the store has created its schema.

use super::constants::*;
use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use preprint_oai_server::publishing_store::SqlitePublishingStore;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
}

/// Creates a temporary db dir with a seeded `publishing.db`.
/// Returns (temp_dir, publishing_db_path)
///
/// Seeded data:
/// - venues `physics` (sections QC, ASTRO), `bio` (section GEN), `closed` (disabled)
/// - four published records, one unpublished submission
/// - two tombstones in physics, one of them for a removed section
pub fn create_test_publishing_db() -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let db_path = dir.path().join("publishing.db");

    // Initialize the store (creates schema)
    let _store = SqlitePublishingStore::new(&db_path)?;

    let conn = Connection::open(&db_path)?;
    conn.execute_batch(
        "INSERT INTO venues (id, path, name, description, contact_email, enabled, seq) VALUES
            (1, 'physics', 'Physics Preprints', 'Preprints in physics', 'physics@preprints.test', 1, 0),
            (2, 'bio', 'Biology Preprints', NULL, NULL, 1, 1),
            (3, 'closed', 'Closed Server', NULL, NULL, 0, 2);
         INSERT INTO sections (id, venue_id, abbrev, title, policy, seq) VALUES
            (10, 1, 'QC', 'Quantum Computing', 'Peer-reviewed after posting', 0),
            (11, 1, 'ASTRO', 'Astrophysics', NULL, 1),
            (20, 2, 'GEN', 'General', NULL, 0);
         INSERT INTO galleys (id, publication_id, label, locale, file_type, seq) VALUES
            (1, 1101, 'PDF', 'en', 'application/pdf', 0),
            (2, 1101, 'HTML', 'en', 'text/html', 1);",
    )?;

    let submissions = [
        (RECORD_QC_1, 1, 10, "published", day(5)),
        (RECORD_QC_2, 1, 10, "published", day(10)),
        (RECORD_ASTRO, 1, 11, "published", day(15)),
        (RECORD_GEN, 2, 20, "published", day(20)),
        (RECORD_UNPUBLISHED, 1, 10, "queued", day(12)),
    ];
    for (id, venue_id, section_id, status, modified) in submissions {
        conn.execute(
            "INSERT INTO submissions (id, venue_id, section_id, status, publication_id,
                title, abstract, authors, locale, date_published, last_modified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'An abstract', '[\"Ada Lovelace\", \"Alan Turing\"]',
                'en', ?7, ?7)",
            params![
                id,
                venue_id,
                section_id,
                status,
                id + 1000,
                format!("Preprint {}", id),
                modified.timestamp()
            ],
        )?;
    }

    insert_tombstone(&conn, RECORD_DELETED_ASTRO, 1, Some(11), ASTRO_SET, day(18))?;
    insert_tombstone(&conn, RECORD_DELETED_OLD, 1, None, OLD_SET, day(8))?;

    Ok((dir, db_path))
}

pub fn insert_tombstone(
    conn: &Connection,
    record_id: i64,
    venue_id: i64,
    section_id: Option<i64>,
    set_spec: &str,
    date_deleted: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO tombstones (record_id, identifier, venue_id, section_id, set_spec, date_deleted)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            record_id,
            identifier(record_id),
            venue_id,
            section_id,
            set_spec,
            date_deleted.timestamp()
        ],
    )?;
    Ok(())
}

/// Withdraws a published submission the way the publishing side does:
/// the row goes away and a tombstone with its current set spec is written.
pub fn withdraw_submission(
    db_path: &Path,
    record_id: i64,
    set_spec: &str,
    date_deleted: DateTime<Utc>,
) -> Result<()> {
    let conn = Connection::open(db_path)?;
    let (venue_id, section_id): (i64, i64) = conn.query_row(
        "SELECT venue_id, section_id FROM submissions WHERE id = ?1",
        params![record_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    conn.execute("DELETE FROM submissions WHERE id = ?1", params![record_id])?;
    insert_tombstone(
        &conn,
        record_id,
        venue_id,
        Some(section_id),
        set_spec,
        date_deleted,
    )
}
