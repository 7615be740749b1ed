//! Shared constants for end-to-end tests
//!
//! This module contains all constants used across the test suite.
//! When the seeded publishing data changes, update only this file.

// ============================================================================
// Repository Settings
// ============================================================================

/// Namespace of every identifier served by the test server
pub const REPOSITORY_ID: &str = "preprints.test";

pub const REPOSITORY_NAME: &str = "Test Preprint Server";

pub const ADMIN_EMAIL: &str = "admin@preprints.test";

/// Kept small so that most listings span several pages
pub const RECORDS_PER_PAGE: usize = 2;
pub const IDENTIFIERS_PER_PAGE: usize = 4;
pub const SETS_PER_PAGE: usize = 4;

// ============================================================================
// Venues and Sections
// ============================================================================

/// Path of "Physics Preprints", enabled, first in sequence
pub const PHYSICS_PATH: &str = "physics";

/// Path of "Biology Preprints", enabled
pub const BIOLOGY_PATH: &str = "bio";

/// Path of a disabled venue with no content
pub const CLOSED_PATH: &str = "closed";

/// Section "Quantum Computing" of physics
pub const QC_SET: &str = "physics:QC";

/// Section "Astrophysics" of physics
pub const ASTRO_SET: &str = "physics:ASTRO";

/// Section that only survives in the tombstone ledger
pub const OLD_SET: &str = "physics:OLD";

/// Section "General" of bio
pub const GEN_SET: &str = "bio:GEN";

// ============================================================================
// Records
// ============================================================================

/// Published in physics:QC, modified 2024-01-05
pub const RECORD_QC_1: i64 = 101;

/// Published in physics:QC, modified 2024-01-10
pub const RECORD_QC_2: i64 = 102;

/// Published in physics:ASTRO, modified 2024-01-15
pub const RECORD_ASTRO: i64 = 103;

/// Published in bio:GEN, modified 2024-01-20
pub const RECORD_GEN: i64 = 104;

/// Submitted to physics:QC but never published
pub const RECORD_UNPUBLISHED: i64 = 105;

/// Withdrawn from physics:ASTRO on 2024-01-18
pub const RECORD_DELETED_ASTRO: i64 = 107;

/// Withdrawn from the removed physics:OLD section on 2024-01-08
pub const RECORD_DELETED_OLD: i64 = 108;

/// Live records plus tombstones visible site-wide
pub const SITE_RECORD_COUNT: usize = 6;

/// Live records plus tombstones visible in the physics venue
pub const PHYSICS_RECORD_COUNT: usize = 5;

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for server to become ready
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Interval between readiness checks
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// Default timeout for HTTP requests in tests
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

pub fn identifier(record_id: i64) -> String {
    format!("oai:{}:preprint/{}", REPOSITORY_ID, record_id)
}
