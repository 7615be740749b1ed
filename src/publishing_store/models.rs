//! Read-side models of the publishing platform.
//!
//! These mirror the rows the harvesting core consumes: venues and their
//! sections, published submissions with their galleys, and the tombstones
//! left behind when a published submission is withdrawn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A publishing context (a preprint server) owning sections and submissions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Venue {
    pub id: i64,
    /// URL path of the venue, used as the first set spec segment.
    pub path: String,
    pub name: String,
    pub description: Option<String>,
    pub contact_email: Option<String>,
    pub enabled: bool,
    pub seq: i64,
}

/// A sub-grouping of a venue's published items.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: i64,
    pub venue_id: i64,
    /// Abbreviation, used as the second set spec segment.
    pub abbrev: String,
    pub title: String,
    pub policy: Option<String>,
    pub seq: i64,
}

/// Lookup key for [`PublishingStore::get_section`](super::PublishingStore::get_section).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SectionKey<'a> {
    Id(i64),
    Abbrev(&'a str),
}

/// A published submission together with the metadata of its current publication.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,
    pub venue_id: i64,
    pub section_id: i64,
    pub publication_id: i64,
    pub title: String,
    pub abstract_text: Option<String>,
    pub authors: Vec<String>,
    pub locale: String,
    pub doi: Option<String>,
    pub date_published: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

/// A representation (PDF, HTML, remote link) of a publication.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Galley {
    pub id: i64,
    pub publication_id: i64,
    pub label: String,
    pub locale: String,
    pub file_type: Option<String>,
    pub remote_url: Option<String>,
    pub seq: i64,
}

/// Header-only projection of a currently published submission.
///
/// This is what the incremental listing reads for the live branch; the full
/// [`Submission`] is only loaded for records that end up in a response page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LiveEntry {
    pub record_id: i64,
    pub venue_id: i64,
    pub section_id: i64,
    pub last_modified: DateTime<Utc>,
}

/// Deletion marker for a withdrawn submission.
///
/// Venue, section and set spec are captured when the tombstone is written and
/// never recomputed, so a deletion stays reportable after its section is gone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tombstone {
    pub id: i64,
    pub record_id: i64,
    /// Public OAI identifier as it was advertised before deletion.
    pub identifier: String,
    pub venue_id: i64,
    pub section_id: Option<i64>,
    pub set_spec: String,
    pub date_deleted: DateTime<Utc>,
}

/// A set spec found only in the tombstone ledger of a venue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TombstoneSet {
    pub venue_id: i64,
    pub set_spec: String,
}
