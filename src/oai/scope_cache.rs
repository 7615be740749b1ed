//! Request-scoped memoization of venue and section lookups.
//!
//! A listing page touches the same handful of venues and sections over and
//! over. The cache lives as long as one [`OaiRepository`](super::OaiRepository)
//! and is never shared between requests.

use crate::publishing_store::{PublishingStore, Section, SectionKey, Venue};
use anyhow::Result;
use std::cell::RefCell;
use std::collections::HashMap;

pub struct ScopeCache<'a> {
    store: &'a dyn PublishingStore,
    venues: RefCell<HashMap<i64, Option<Venue>>>,
    sections: RefCell<HashMap<(i64, i64), Option<Section>>>,
}

impl<'a> ScopeCache<'a> {
    pub fn new(store: &'a dyn PublishingStore) -> Self {
        Self {
            store,
            venues: RefCell::new(HashMap::new()),
            sections: RefCell::new(HashMap::new()),
        }
    }

    pub fn venue(&self, venue_id: i64) -> Result<Option<Venue>> {
        if let Some(cached) = self.venues.borrow().get(&venue_id) {
            return Ok(cached.clone());
        }
        let venue = self.store.get_venue(venue_id)?;
        self.venues.borrow_mut().insert(venue_id, venue.clone());
        Ok(venue)
    }

    pub fn section(&self, venue_id: i64, section_id: i64) -> Result<Option<Section>> {
        if let Some(cached) = self.sections.borrow().get(&(venue_id, section_id)) {
            return Ok(cached.clone());
        }
        let section = self
            .store
            .get_section(venue_id, SectionKey::Id(section_id))?;
        self.sections
            .borrow_mut()
            .insert((venue_id, section_id), section.clone());
        Ok(section)
    }

    /// Seeds the cache with a venue loaded elsewhere.
    pub fn remember_venue(&self, venue: &Venue) {
        self.venues
            .borrow_mut()
            .insert(venue.id, Some(venue.clone()));
    }
}
