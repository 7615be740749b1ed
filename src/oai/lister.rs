//! Incremental listing of live and deleted records.
//!
//! A listing is the union of two independent projections: published
//! submissions modified inside the date window, and tombstones whose
//! deletion date falls inside it. Both are ordered by (venue, section,
//! record id) and merged; the date is only ever a filter so that pages stay
//! stable when timestamps collide. Record payloads are loaded lazily, only
//! for the entries a caller actually consumes.

use super::assembler::RecordAssembler;
use super::error::OaiResult;
use super::models::{Record, Scope};
use crate::publishing_store::{Field, Filter, LiveEntry, PublishingStore, Tombstone};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Which records a listing covers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    /// Every record of every venue, including disabled ones.
    All,
    /// Records of a venue or section. Tombstones additionally have to carry
    /// one of `set_specs` when that list is not empty.
    Scope {
        scope: Scope,
        set_specs: Vec<String>,
    },
    /// Only tombstones of a venue recorded under `set_spec`.
    DeletedOnly { venue_id: i64, set_spec: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListingQuery {
    pub selection: Selection,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl ListingQuery {
    /// Filter over published submissions, or `None` when none can match.
    pub fn live_filter(&self) -> Option<Filter> {
        let mut parts = Vec::new();
        match &self.selection {
            Selection::All => {}
            Selection::Scope { scope, .. } => {
                parts.push(Filter::eq(Field::VenueId, scope.venue_id));
                if let Some(section_id) = scope.section_id {
                    parts.push(Filter::eq(Field::SectionId, section_id));
                }
            }
            Selection::DeletedOnly { .. } => return None,
        }
        parts.extend(Filter::date_range(Field::Datestamp, self.from, self.until));
        Some(Filter::and(parts))
    }

    pub fn tombstone_filter(&self) -> Filter {
        let mut parts = Vec::new();
        match &self.selection {
            Selection::All => {}
            Selection::Scope { scope, set_specs } => {
                parts.push(Filter::eq(Field::VenueId, scope.venue_id));
                if !set_specs.is_empty() {
                    parts.push(Filter::In(
                        Field::SetSpec,
                        set_specs.iter().map(|s| s.as_str().into()).collect(),
                    ));
                }
            }
            Selection::DeletedOnly { venue_id, set_spec } => {
                parts.push(Filter::eq(Field::VenueId, *venue_id));
                parts.push(Filter::eq(Field::SetSpec, set_spec.as_str()));
            }
        }
        parts.extend(Filter::date_range(Field::Datestamp, self.from, self.until));
        Filter::and(parts)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListingEntry {
    Live(LiveEntry),
    Deleted(Tombstone),
}

impl ListingEntry {
    /// Sort key: venue, section (0 when a tombstone has none), record id.
    pub fn key(&self) -> (i64, i64, i64) {
        match self {
            ListingEntry::Live(e) => (e.venue_id, e.section_id, e.record_id),
            ListingEntry::Deleted(t) => (t.venue_id, t.section_id.unwrap_or(0), t.record_id),
        }
    }
}

/// Merges two branches into one ordered list.
///
/// Each record id is emitted once. Of several tombstones for the same record
/// only the newest is kept, and a tombstone hides any live entry of its record.
pub fn merge_branches(live: Vec<LiveEntry>, deleted: Vec<Tombstone>) -> Vec<ListingEntry> {
    let mut newest: HashMap<i64, Tombstone> = HashMap::with_capacity(deleted.len());
    for tombstone in deleted {
        match newest.get(&tombstone.record_id) {
            Some(kept) if (kept.date_deleted, kept.id) >= (tombstone.date_deleted, tombstone.id) => {
                warn!(
                    "Record {} has several tombstones in a listing window, keeping the newest",
                    tombstone.record_id
                );
            }
            _ => {
                newest.insert(tombstone.record_id, tombstone);
            }
        }
    }

    let mut live: Vec<LiveEntry> = live
        .into_iter()
        .filter(|entry| {
            let hidden = newest.contains_key(&entry.record_id);
            if hidden {
                warn!(
                    "Record {} is both published and deleted in a listing window, reporting the deletion",
                    entry.record_id
                );
            }
            !hidden
        })
        .collect();
    let mut deleted: Vec<Tombstone> = newest.into_values().collect();

    live.sort_by_key(|e| (e.venue_id, e.section_id, e.record_id));
    deleted.sort_by_key(|t| (t.venue_id, t.section_id.unwrap_or(0), t.record_id));

    let mut merged: Vec<ListingEntry> = Vec::with_capacity(live.len() + deleted.len());
    let mut live = live.into_iter().map(ListingEntry::Live).peekable();
    let mut deleted = deleted.into_iter().map(ListingEntry::Deleted).peekable();

    loop {
        let next = match (live.peek(), deleted.peek()) {
            (None, None) => break,
            (Some(_), None) => live.next(),
            (None, Some(_)) => deleted.next(),
            (Some(l), Some(d)) => match l.key().cmp(&d.key()) {
                Ordering::Less => live.next(),
                Ordering::Greater | Ordering::Equal => deleted.next(),
            },
        };
        merged.extend(next);
    }
    merged
}

pub struct IncrementalLister<'a> {
    store: &'a dyn PublishingStore,
    assembler: &'a RecordAssembler<'a>,
}

impl<'a> IncrementalLister<'a> {
    pub fn new(store: &'a dyn PublishingStore, assembler: &'a RecordAssembler<'a>) -> Self {
        Self { store, assembler }
    }

    /// Reads the ordered, deduplicated headers of a listing.
    pub fn entries(&self, query: &ListingQuery) -> Result<Vec<ListingEntry>> {
        let live = match query.live_filter() {
            Some(filter) => self.store.list_live_entries(&filter)?,
            None => Vec::new(),
        };
        let deleted = self.store.list_tombstones(&query.tombstone_filter())?;
        debug!(
            "Listing {:?} matched {} live and {} deleted entries",
            query.selection,
            live.len(),
            deleted.len()
        );
        Ok(merge_branches(live, deleted))
    }

    /// Hydrates entries into records on demand.
    pub fn records<I>(
        &'a self,
        entries: I,
        include_payload: bool,
    ) -> impl Iterator<Item = OaiResult<Record>> + 'a
    where
        I: IntoIterator<Item = ListingEntry>,
        I::IntoIter: 'a,
    {
        entries.into_iter().map(move |entry| match entry {
            ListingEntry::Live(entry) => self.assembler.live_record(&entry, include_payload),
            ListingEntry::Deleted(tombstone) => Ok(self.assembler.deleted_record(&tombstone)),
        })
    }

    /// The complete listing as a lazy sequence of records.
    pub fn list(
        &'a self,
        query: &ListingQuery,
        include_payload: bool,
    ) -> OaiResult<impl Iterator<Item = OaiResult<Record>> + 'a> {
        let entries = self.entries(query)?;
        Ok(self.records(entries, include_payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oai::identifier::IdentifierCodec;
    use crate::oai::scope_cache::ScopeCache;
    use crate::publishing_store::{MemoryPublishingStore, Section, Submission, Venue};
    use chrono::TimeZone;

    fn date(month: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, month, d, 0, 0, 0).unwrap()
    }

    fn live(record_id: i64, venue_id: i64, section_id: i64) -> LiveEntry {
        LiveEntry {
            record_id,
            venue_id,
            section_id,
            last_modified: date(1, 1),
        }
    }

    fn tomb(record_id: i64, venue_id: i64, section_id: Option<i64>, set_spec: &str) -> Tombstone {
        Tombstone {
            id: record_id,
            record_id,
            identifier: format!("oai:test:preprint/{}", record_id),
            venue_id,
            section_id,
            set_spec: set_spec.to_string(),
            date_deleted: date(1, 20),
        }
    }

    fn submission(id: i64, venue_id: i64, section_id: i64, modified: DateTime<Utc>) -> Submission {
        Submission {
            id,
            venue_id,
            section_id,
            publication_id: id,
            title: format!("Preprint {}", id),
            abstract_text: None,
            authors: vec![],
            locale: "en".to_string(),
            doi: None,
            date_published: modified,
            last_modified: modified,
        }
    }

    /// Venue 5 with live records 10 (modified in January) and 11 (modified
    /// in February) in section 1, and record 9 deleted in January from the
    /// since-removed section 2.
    fn venue_five_store() -> MemoryPublishingStore {
        let store = MemoryPublishingStore::new();
        store.add_venue(Venue {
            id: 5,
            path: "5".to_string(),
            name: "Venue Five".to_string(),
            description: None,
            contact_email: None,
            enabled: true,
            seq: 0,
        });
        store.add_section(Section {
            id: 1,
            venue_id: 5,
            abbrev: "sectionB".to_string(),
            title: "Section B".to_string(),
            policy: None,
            seq: 0,
        });
        store.add_submission(submission(10, 5, 1, date(1, 5)));
        store.add_submission(submission(11, 5, 1, date(2, 1)));
        store.add_tombstone(tomb(9, 5, Some(2), "5:sectionA"));
        store
    }

    fn ids(records: Vec<Record>) -> Vec<String> {
        records.into_iter().map(|r| r.identifier).collect()
    }

    #[test]
    fn test_merge_orders_by_scope_then_id() {
        let merged = merge_branches(
            vec![live(3, 1, 2), live(1, 2, 1), live(2, 1, 2)],
            vec![tomb(7, 1, Some(1), "a"), tomb(4, 2, None, "b")],
        );
        let keys: Vec<_> = merged.iter().map(|e| e.key()).collect();
        assert_eq!(
            keys,
            vec![(1, 1, 7), (1, 2, 2), (1, 2, 3), (2, 0, 4), (2, 1, 1)]
        );
    }

    #[test]
    fn test_merge_collision_keeps_tombstone() {
        let merged = merge_branches(
            vec![live(3, 1, 2)],
            vec![tomb(3, 1, Some(2), "a:b"), tomb(3, 1, Some(2), "a:b")],
        );
        assert_eq!(merged.len(), 1);
        assert!(matches!(merged[0], ListingEntry::Deleted(_)));
    }

    #[test]
    fn test_merge_keeps_one_entry_per_record() {
        let first = Tombstone {
            id: 1,
            section_id: Some(10),
            set_spec: "A:x".to_string(),
            date_deleted: date(1, 10),
            ..tomb(9, 1, None, "")
        };
        let second = Tombstone {
            id: 2,
            section_id: Some(11),
            set_spec: "A:y".to_string(),
            date_deleted: date(1, 20),
            ..tomb(9, 1, None, "")
        };
        let merged = merge_branches(vec![live(9, 1, 12), live(8, 1, 12)], vec![second, first]);

        let keys: Vec<_> = merged.iter().map(|e| e.key()).collect();
        assert_eq!(keys, vec![(1, 11, 9), (1, 12, 8)]);
        match &merged[0] {
            ListingEntry::Deleted(t) => assert_eq!(t.set_spec, "A:y"),
            other => panic!("expected a deletion, got {:?}", other),
        }
    }

    #[test]
    fn test_site_listing_reports_rewithdrawn_record_once() {
        let store = MemoryPublishingStore::new();
        store.add_tombstone(Tombstone {
            id: 1,
            section_id: Some(10),
            set_spec: "A:x".to_string(),
            date_deleted: date(1, 10),
            ..tomb(9, 1, None, "")
        });
        store.add_tombstone(Tombstone {
            id: 2,
            section_id: Some(11),
            set_spec: "A:y".to_string(),
            date_deleted: date(1, 20),
            ..tomb(9, 1, None, "")
        });
        let codec = IdentifierCodec::new("test");
        let cache = ScopeCache::new(&store);
        let assembler = RecordAssembler::new(&store, &codec, &cache);
        let lister = IncrementalLister::new(&store, &assembler);

        let query = ListingQuery {
            selection: Selection::All,
            from: None,
            until: None,
        };
        let records = lister
            .list(&query, false)
            .unwrap()
            .collect::<OaiResult<Vec<_>>>()
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].identifier, "oai:test:preprint/9");
        assert_eq!(records[0].set_specs, vec!["A", "A:y"]);
    }

    #[test]
    fn test_filters_for_deleted_only_selection() {
        let query = ListingQuery {
            selection: Selection::DeletedOnly {
                venue_id: 2,
                set_spec: "B:z".to_string(),
            },
            from: None,
            until: None,
        };
        assert_eq!(query.live_filter(), None);
        assert_eq!(
            query.tombstone_filter(),
            Filter::And(vec![
                Filter::eq(Field::VenueId, 2_i64),
                Filter::eq(Field::SetSpec, "B:z"),
            ])
        );
    }

    #[test]
    fn test_venue_window_mixes_live_and_deleted() {
        let store = venue_five_store();
        let codec = IdentifierCodec::new("test");
        let cache = ScopeCache::new(&store);
        let assembler = RecordAssembler::new(&store, &codec, &cache);
        let lister = IncrementalLister::new(&store, &assembler);

        let query = ListingQuery {
            selection: Selection::Scope {
                scope: Scope::venue(5),
                set_specs: vec![],
            },
            from: Some(date(1, 1)),
            until: Some(date(1, 31)),
        };
        let records = lister
            .list(&query, false)
            .unwrap()
            .collect::<OaiResult<Vec<_>>>()
            .unwrap();
        assert_eq!(
            ids(records),
            vec!["oai:test:preprint/10", "oai:test:preprint/9"]
        );
    }

    #[test]
    fn test_deleted_record_leaves_later_window() {
        let store = venue_five_store();
        let codec = IdentifierCodec::new("test");
        let cache = ScopeCache::new(&store);
        let assembler = RecordAssembler::new(&store, &codec, &cache);
        let lister = IncrementalLister::new(&store, &assembler);

        let deleted_only = |from, until| ListingQuery {
            selection: Selection::DeletedOnly {
                venue_id: 5,
                set_spec: "5:sectionA".to_string(),
            },
            from,
            until,
        };

        let january = lister
            .entries(&deleted_only(None, Some(date(1, 20))))
            .unwrap();
        assert_eq!(january.len(), 1);

        let later = lister
            .entries(&deleted_only(Some(date(1, 21)), None))
            .unwrap();
        assert!(later.is_empty());
    }

    #[test]
    fn test_section_scope_excludes_other_sections() {
        let store = venue_five_store();
        let codec = IdentifierCodec::new("test");
        let cache = ScopeCache::new(&store);
        let assembler = RecordAssembler::new(&store, &codec, &cache);
        let lister = IncrementalLister::new(&store, &assembler);

        let query = ListingQuery {
            selection: Selection::Scope {
                scope: Scope::section(5, 1),
                set_specs: vec!["5:sectionB".to_string()],
            },
            from: None,
            until: None,
        };
        let entries = lister.entries(&query).unwrap();
        let keys: Vec<_> = entries.iter().map(|e| e.key().2).collect();
        assert_eq!(keys, vec![10, 11]);
    }

    #[test]
    fn test_payload_only_loaded_for_consumed_records() {
        let store = venue_five_store();
        let codec = IdentifierCodec::new("test");
        let cache = ScopeCache::new(&store);
        let assembler = RecordAssembler::new(&store, &codec, &cache);
        let lister = IncrementalLister::new(&store, &assembler);

        let query = ListingQuery {
            selection: Selection::All,
            from: None,
            until: None,
        };
        let mut records = lister.list(&query, true).unwrap();
        let live = records.next().unwrap().unwrap();
        assert!(live.payload.is_some());
        let deleted = records.next().unwrap().unwrap();
        assert!(deleted.deleted);
        assert!(deleted.payload.is_none());

        // Record 11 has not been hydrated yet, so it now hits the store.
        store.set_failing(true);
        assert!(records.next().unwrap().is_err());
    }

    #[test]
    fn test_disabled_venue_still_listed() {
        let store = MemoryPublishingStore::new();
        store.add_venue(Venue {
            id: 1,
            path: "off".to_string(),
            name: "Off".to_string(),
            description: None,
            contact_email: None,
            enabled: false,
            seq: 0,
        });
        store.add_submission(submission(1, 1, 1, date(1, 1)));
        let codec = IdentifierCodec::new("test");
        let cache = ScopeCache::new(&store);
        let assembler = RecordAssembler::new(&store, &codec, &cache);
        let lister = IncrementalLister::new(&store, &assembler);

        let query = ListingQuery {
            selection: Selection::All,
            from: None,
            until: None,
        };
        assert_eq!(lister.entries(&query).unwrap().len(), 1);
    }
}
