//! Turns live entries and tombstones into protocol records.

use super::error::{OaiError, OaiResult};
use super::identifier::IdentifierCodec;
use super::models::{Record, RecordPayload};
use super::scope_cache::ScopeCache;
use super::sets::{section_set_spec, venue_prefix, venue_set_spec};
use crate::publishing_store::{LiveEntry, PublishingStore, Submission, Tombstone};
use tracing::{error, warn};

pub struct RecordAssembler<'a> {
    store: &'a dyn PublishingStore,
    codec: &'a IdentifierCodec,
    cache: &'a ScopeCache<'a>,
}

impl<'a> RecordAssembler<'a> {
    pub fn new(
        store: &'a dyn PublishingStore,
        codec: &'a IdentifierCodec,
        cache: &'a ScopeCache<'a>,
    ) -> Self {
        Self {
            store,
            codec,
            cache,
        }
    }

    /// Builds the record of a currently published submission.
    ///
    /// The payload is loaded only when `include_payload` is set. A submission
    /// that stopped being published since its header was read is still
    /// returned, without a payload.
    pub fn live_record(&self, entry: &LiveEntry, include_payload: bool) -> OaiResult<Record> {
        let submission = if include_payload {
            let found = self.store.get_published_submission(entry.record_id)?;
            if found.is_none() {
                warn!(
                    "Submission {} was unpublished while listing, emitting it without metadata",
                    entry.record_id
                );
            }
            found
        } else {
            None
        };
        self.build_live_record(entry, submission)
    }

    fn build_live_record(
        &self,
        entry: &LiveEntry,
        submission: Option<Submission>,
    ) -> OaiResult<Record> {
        let identifier = self.codec.encode(entry.record_id);

        let Some(venue) = self.cache.venue(entry.venue_id)? else {
            error!(
                "Published submission {} references missing venue {}",
                entry.record_id, entry.venue_id
            );
            return Ok(Record {
                identifier,
                datestamp: entry.last_modified,
                set_specs: Vec::new(),
                deleted: false,
                payload: None,
            });
        };

        let section = self.cache.section(entry.venue_id, entry.section_id)?;
        let mut set_specs = vec![venue_set_spec(&venue)];
        match &section {
            Some(section) => set_specs.push(section_set_spec(&venue, section)),
            None => error!(
                "Published submission {} references section {} which is not part of venue {}",
                entry.record_id, entry.section_id, entry.venue_id
            ),
        }

        let payload = match submission {
            Some(submission) => {
                let galleys = self.store.get_galleys(submission.publication_id)?;
                Some(RecordPayload {
                    submission,
                    galleys,
                    venue,
                    section,
                })
            }
            None => None,
        };

        Ok(Record {
            identifier,
            datestamp: entry.last_modified,
            set_specs,
            deleted: false,
            payload,
        })
    }

    /// Builds a deleted record from the set spec captured in its tombstone.
    pub fn deleted_record(&self, tombstone: &Tombstone) -> Record {
        let venue_spec = venue_prefix(&tombstone.set_spec).to_string();
        let mut set_specs = vec![venue_spec];
        if set_specs[0] != tombstone.set_spec {
            set_specs.push(tombstone.set_spec.clone());
        }

        Record {
            identifier: tombstone.identifier.clone(),
            datestamp: tombstone.date_deleted,
            set_specs,
            deleted: true,
            payload: None,
        }
    }

    /// Looks up a single record by id, live or deleted.
    ///
    /// With `bound_venue` set, a record belonging to another venue is
    /// reported as out of scope rather than absent.
    pub fn assemble(&self, record_id: i64, bound_venue: Option<i64>) -> OaiResult<Record> {
        let identifier = self.codec.encode(record_id);
        let out_of_scope = |venue_id: i64| bound_venue.is_some_and(|bound| bound != venue_id);

        if let Some(submission) = self.store.get_published_submission(record_id)? {
            if out_of_scope(submission.venue_id) {
                return Err(OaiError::OutOfScope(identifier));
            }
            let entry = LiveEntry {
                record_id,
                venue_id: submission.venue_id,
                section_id: submission.section_id,
                last_modified: submission.last_modified,
            };
            return self.build_live_record(&entry, Some(submission));
        }

        if let Some(tombstone) = self.store.get_tombstone(record_id)? {
            if out_of_scope(tombstone.venue_id) {
                return Err(OaiError::OutOfScope(identifier));
            }
            return Ok(self.deleted_record(&tombstone));
        }

        Err(OaiError::RecordNotFound(identifier))
    }
}
