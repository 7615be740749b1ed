//! SQLite schema for harvest state.

use crate::sqlite_column;
use crate::sqlite_persistence::{SqlType, Table, VersionedSchema};

const RESUMPTION_TOKENS_TABLE_V1: Table = Table {
    name: "resumption_tokens",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("cursor_offset", &SqlType::Integer, non_null = true),
        sqlite_column!("complete_list_size", &SqlType::Integer, non_null = true),
        sqlite_column!("params", &SqlType::Text, non_null = true),
        sqlite_column!("expires_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_resumption_tokens_expires_at", "expires_at")],
};

pub const TOKEN_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[RESUMPTION_TOKENS_TABLE_V1],
    migration: None,
}];
