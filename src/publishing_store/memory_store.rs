//! In-memory publishing store.
//!
//! Evaluates [`Filter`]s directly against its rows. Used by unit tests and
//! by embedders that feed the harvesting core from another source.

use super::filter::{Field, Filter, FilterTarget, FilterValue};
use super::models::{
    Galley, LiveEntry, Section, SectionKey, Submission, Tombstone, TombstoneSet, Venue,
};
use super::trait_def::PublishingStore;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Mutex;

impl FilterTarget for LiveEntry {
    fn field(&self, field: Field) -> Option<FilterValue> {
        match field {
            Field::RecordId => Some(self.record_id.into()),
            Field::VenueId => Some(self.venue_id.into()),
            Field::SectionId => Some(self.section_id.into()),
            Field::Datestamp => Some(self.last_modified.into()),
            Field::SetSpec => None,
        }
    }
}

impl FilterTarget for Tombstone {
    fn field(&self, field: Field) -> Option<FilterValue> {
        match field {
            Field::RecordId => Some(self.record_id.into()),
            Field::VenueId => Some(self.venue_id.into()),
            Field::SectionId => self.section_id.map(FilterValue::from),
            Field::Datestamp => Some(self.date_deleted.into()),
            Field::SetSpec => Some(self.set_spec.as_str().into()),
        }
    }
}

#[derive(Default)]
struct Inner {
    venues: Vec<Venue>,
    sections: Vec<Section>,
    submissions: Vec<Submission>,
    galleys: Vec<Galley>,
    tombstones: Vec<Tombstone>,
    #[cfg(test)]
    failing: bool,
}

#[derive(Default)]
pub struct MemoryPublishingStore {
    inner: Mutex<Inner>,
}

impl MemoryPublishingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_venue(&self, venue: Venue) {
        self.inner.lock().unwrap().venues.push(venue);
    }

    pub fn add_section(&self, section: Section) {
        self.inner.lock().unwrap().sections.push(section);
    }

    /// Adds a submission in published state.
    pub fn add_submission(&self, submission: Submission) {
        self.inner.lock().unwrap().submissions.push(submission);
    }

    pub fn add_galley(&self, galley: Galley) {
        self.inner.lock().unwrap().galleys.push(galley);
    }

    pub fn add_tombstone(&self, tombstone: Tombstone) {
        self.inner.lock().unwrap().tombstones.push(tombstone);
    }

    /// Unpublishes a submission and records its tombstone in one step.
    pub fn withdraw(&self, tombstone: Tombstone) {
        let mut inner = self.inner.lock().unwrap();
        inner.submissions.retain(|s| s.id != tombstone.record_id);
        inner.tombstones.push(tombstone);
    }

    pub fn remove_section(&self, section_id: i64) {
        self.inner
            .lock()
            .unwrap()
            .sections
            .retain(|s| s.id != section_id);
    }

    /// Makes every subsequent read fail, to exercise storage error paths.
    #[cfg(test)]
    pub fn set_failing(&self, failing: bool) {
        self.inner.lock().unwrap().failing = failing;
    }

    fn read(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        let inner = self.inner.lock().unwrap();
        #[cfg(test)]
        if inner.failing {
            anyhow::bail!("publishing store is unavailable");
        }
        Ok(inner)
    }
}

fn by_seq<T>(items: &mut [T], key: impl Fn(&T) -> (i64, i64)) {
    items.sort_by_key(|item| key(item));
}

impl PublishingStore for MemoryPublishingStore {
    fn get_venue(&self, id: i64) -> Result<Option<Venue>> {
        Ok(self.read()?.venues.iter().find(|v| v.id == id).cloned())
    }

    fn get_venue_by_path(&self, path: &str) -> Result<Option<Venue>> {
        let inner = self.read()?;
        let mut matching: Vec<_> = inner.venues.iter().filter(|v| v.path == path).collect();
        matching.sort_by_key(|v| v.id);
        Ok(matching.first().map(|v| (*v).clone()))
    }

    fn list_venues(&self, enabled_only: bool) -> Result<Vec<Venue>> {
        let mut venues: Vec<_> = self
            .read()?
            .venues
            .iter()
            .filter(|v| v.enabled || !enabled_only)
            .cloned()
            .collect();
        by_seq(&mut venues, |v| (v.seq, v.id));
        Ok(venues)
    }

    fn list_sections(&self, venue_id: i64) -> Result<Vec<Section>> {
        let mut sections: Vec<_> = self
            .read()?
            .sections
            .iter()
            .filter(|s| s.venue_id == venue_id)
            .cloned()
            .collect();
        by_seq(&mut sections, |s| (s.seq, s.id));
        Ok(sections)
    }

    fn get_section(&self, venue_id: i64, key: SectionKey<'_>) -> Result<Option<Section>> {
        let sections = self.list_sections(venue_id)?;
        Ok(sections.into_iter().find(|s| match key {
            SectionKey::Id(id) => s.id == id,
            SectionKey::Abbrev(abbrev) => s.abbrev == abbrev,
        }))
    }

    fn get_published_submission(&self, id: i64) -> Result<Option<Submission>> {
        Ok(self.read()?.submissions.iter().find(|s| s.id == id).cloned())
    }

    fn get_galleys(&self, publication_id: i64) -> Result<Vec<Galley>> {
        let mut galleys: Vec<_> = self
            .read()?
            .galleys
            .iter()
            .filter(|g| g.publication_id == publication_id)
            .cloned()
            .collect();
        by_seq(&mut galleys, |g| (g.seq, g.id));
        Ok(galleys)
    }

    fn list_live_entries(&self, filter: &Filter) -> Result<Vec<LiveEntry>> {
        let mut entries: Vec<_> = self
            .read()?
            .submissions
            .iter()
            .map(|s| LiveEntry {
                record_id: s.id,
                venue_id: s.venue_id,
                section_id: s.section_id,
                last_modified: s.last_modified,
            })
            .filter(|entry| filter.matches(entry))
            .collect();
        entries.sort_by_key(|e| (e.venue_id, e.section_id, e.record_id));
        Ok(entries)
    }

    fn earliest_live_datestamp(&self, filter: &Filter) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .list_live_entries(filter)?
            .iter()
            .map(|e| e.last_modified)
            .min())
    }

    fn list_tombstones(&self, filter: &Filter) -> Result<Vec<Tombstone>> {
        let mut tombstones: Vec<_> = self
            .read()?
            .tombstones
            .iter()
            .filter(|t| filter.matches(*t))
            .cloned()
            .collect();
        tombstones.sort_by_key(|t| (t.venue_id, t.section_id.unwrap_or(0), t.record_id, t.id));
        Ok(tombstones)
    }

    fn get_tombstone(&self, record_id: i64) -> Result<Option<Tombstone>> {
        Ok(self
            .read()?
            .tombstones
            .iter()
            .filter(|t| t.record_id == record_id)
            .max_by_key(|t| (t.date_deleted, t.id))
            .cloned())
    }

    fn list_tombstone_derived_sets(&self, venue_id: i64) -> Result<Vec<TombstoneSet>> {
        let specs: BTreeSet<String> = self
            .read()?
            .tombstones
            .iter()
            .filter(|t| t.venue_id == venue_id)
            .map(|t| t.set_spec.clone())
            .collect();
        Ok(specs
            .into_iter()
            .map(|set_spec| TombstoneSet { venue_id, set_spec })
            .collect())
    }

    fn earliest_tombstone_datestamp(&self, filter: &Filter) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .list_tombstones(filter)?
            .iter()
            .map(|t| t.date_deleted)
            .min())
    }
}
