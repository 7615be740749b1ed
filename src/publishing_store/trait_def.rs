//! PublishingStore trait definition.
//!
//! The harvesting core only ever reads from the publishing platform. This
//! trait is the complete surface it needs: venue and section lookups,
//! published submissions with their galleys, and the tombstone ledger.

use super::filter::Filter;
use super::models::{
    Galley, LiveEntry, Section, SectionKey, Submission, Tombstone, TombstoneSet, Venue,
};
use anyhow::Result;
use chrono::{DateTime, Utc};

pub trait PublishingStore: Send + Sync {
    // =========================================================================
    // Venues and Sections
    // =========================================================================

    fn get_venue(&self, id: i64) -> Result<Option<Venue>>;

    /// Looks up a venue by its URL path (exact match).
    fn get_venue_by_path(&self, path: &str) -> Result<Option<Venue>>;

    /// Venues ordered by sequence, then id.
    fn list_venues(&self, enabled_only: bool) -> Result<Vec<Venue>>;

    /// Sections of a venue ordered by sequence, then id.
    fn list_sections(&self, venue_id: i64) -> Result<Vec<Section>>;

    /// Returns the section only if it belongs to `venue_id`.
    fn get_section(&self, venue_id: i64, key: SectionKey<'_>) -> Result<Option<Section>>;

    // =========================================================================
    // Published Content
    // =========================================================================

    /// Returns the submission only while it is published.
    fn get_published_submission(&self, id: i64) -> Result<Option<Submission>>;

    /// Galleys of a publication ordered by sequence, then id.
    fn get_galleys(&self, publication_id: i64) -> Result<Vec<Galley>>;

    /// Headers of published submissions matching `filter`, ordered by
    /// (venue id, section id, record id).
    fn list_live_entries(&self, filter: &Filter) -> Result<Vec<LiveEntry>>;

    /// Oldest last-modified date among published submissions matching `filter`.
    fn earliest_live_datestamp(&self, filter: &Filter) -> Result<Option<DateTime<Utc>>>;

    // =========================================================================
    // Tombstone Ledger
    // =========================================================================

    /// Tombstones matching `filter`, ordered by (venue id, section id, record id).
    fn list_tombstones(&self, filter: &Filter) -> Result<Vec<Tombstone>>;

    /// The most recent tombstone of a record, if any.
    fn get_tombstone(&self, record_id: i64) -> Result<Option<Tombstone>>;

    /// Distinct set specs recorded by tombstones of a venue, ordered by spec.
    fn list_tombstone_derived_sets(&self, venue_id: i64) -> Result<Vec<TombstoneSet>>;

    /// Oldest deletion date among tombstones matching `filter`.
    fn earliest_tombstone_datestamp(&self, filter: &Filter) -> Result<Option<DateTime<Utc>>>;
}
