//! SQLite schema definitions for the publishing database.
//!
//! Only the columns the harvesting core reads are declared here. Dates are
//! stored as Unix seconds so that range filters compare numerically.

use crate::sqlite_column;
use crate::sqlite_persistence::{ForeignKey, OnDelete, SqlType, Table, VersionedSchema};

const VENUE_FOREIGN_KEY: ForeignKey = ForeignKey {
    foreign_table: "venues",
    foreign_column: "id",
    on_delete: OnDelete::Cascade,
};

// =============================================================================
// Version 1
// =============================================================================

const VENUES_TABLE_V1: Table = Table {
    name: "venues",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("path", &SqlType::Text, non_null = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("description", &SqlType::Text),
        sqlite_column!("contact_email", &SqlType::Text),
        sqlite_column!("enabled", &SqlType::Integer, non_null = true, default_value = Some("1")),
        sqlite_column!("seq", &SqlType::Integer, non_null = true, default_value = Some("0")),
    ],
    indices: &[("idx_venues_path", "path")],
};

const SECTIONS_TABLE_V1: Table = Table {
    name: "sections",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "venue_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&VENUE_FOREIGN_KEY)
        ),
        sqlite_column!("abbrev", &SqlType::Text, non_null = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("policy", &SqlType::Text),
        sqlite_column!("seq", &SqlType::Integer, non_null = true, default_value = Some("0")),
    ],
    indices: &[("idx_sections_venue_abbrev", "venue_id, abbrev")],
};

/// Submissions keep `section_id` without a foreign key: a section can be
/// removed while its tombstoned submissions stay reportable.
const SUBMISSIONS_TABLE_V1: Table = Table {
    name: "submissions",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "venue_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&VENUE_FOREIGN_KEY)
        ),
        sqlite_column!("section_id", &SqlType::Integer, non_null = true),
        sqlite_column!("status", &SqlType::Text, non_null = true),
        sqlite_column!("publication_id", &SqlType::Integer, non_null = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("abstract", &SqlType::Text),
        sqlite_column!("authors", &SqlType::Text, non_null = true, default_value = Some("'[]'")),
        sqlite_column!("locale", &SqlType::Text, non_null = true),
        sqlite_column!("doi", &SqlType::Text),
        sqlite_column!("date_published", &SqlType::Integer, non_null = true),
        sqlite_column!("last_modified", &SqlType::Integer, non_null = true),
    ],
    indices: &[
        ("idx_submissions_scope", "venue_id, section_id, id"),
        ("idx_submissions_last_modified", "last_modified"),
    ],
};

const GALLEYS_TABLE_V1: Table = Table {
    name: "galleys",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("publication_id", &SqlType::Integer, non_null = true),
        sqlite_column!("label", &SqlType::Text, non_null = true),
        sqlite_column!("locale", &SqlType::Text, non_null = true),
        sqlite_column!("file_type", &SqlType::Text),
        sqlite_column!("remote_url", &SqlType::Text),
        sqlite_column!("seq", &SqlType::Integer, non_null = true, default_value = Some("0")),
    ],
    indices: &[("idx_galleys_publication", "publication_id")],
};

/// Tombstones reference nothing: every column is a snapshot taken at
/// deletion time.
const TOMBSTONES_TABLE_V1: Table = Table {
    name: "tombstones",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("record_id", &SqlType::Integer, non_null = true),
        sqlite_column!("identifier", &SqlType::Text, non_null = true),
        sqlite_column!("venue_id", &SqlType::Integer, non_null = true),
        sqlite_column!("section_id", &SqlType::Integer),
        sqlite_column!("set_spec", &SqlType::Text, non_null = true),
        sqlite_column!("date_deleted", &SqlType::Integer, non_null = true),
    ],
    indices: &[
        ("idx_tombstones_venue_set", "venue_id, set_spec"),
        ("idx_tombstones_date_deleted", "date_deleted"),
        ("idx_tombstones_record", "record_id"),
    ],
};

pub const PUBLISHING_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[
        VENUES_TABLE_V1,
        SECTIONS_TABLE_V1,
        SUBMISSIONS_TABLE_V1,
        GALLEYS_TABLE_V1,
        TOMBSTONES_TABLE_V1,
    ],
    migration: None,
}];
