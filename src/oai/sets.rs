//! The two-level set hierarchy: one set per venue, one per section.
//!
//! A set spec joins percent-encoded segments with `:`, so a venue path or a
//! section abbreviation may itself contain `:` or `%`. Tombstones keep the
//! spec their record had when it was deleted; specs whose section no longer
//! exists are still listed and still resolvable.

use super::models::{OaiSet, Scope};
use crate::publishing_store::{PublishingStore, Section, SectionKey, Venue};
use anyhow::Result;
use std::collections::HashSet;
use tracing::debug;

pub fn venue_set_spec(venue: &Venue) -> String {
    urlencoding::encode(&venue.path).into_owned()
}

pub fn section_set_spec(venue: &Venue, section: &Section) -> String {
    format!(
        "{}:{}",
        urlencoding::encode(&venue.path),
        urlencoding::encode(&section.abbrev)
    )
}

/// The venue-level prefix of a set spec (everything before the first `:`).
pub fn venue_prefix(set_spec: &str) -> &str {
    set_spec
        .split_once(':')
        .map_or(set_spec, |(venue, _)| venue)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SetResolution {
    /// The spec names a live venue or section. `set_spec` is its canonical
    /// spelling, as built by [`venue_set_spec`] or [`section_set_spec`].
    Scope { scope: Scope, set_spec: String },
    /// The section is gone but the spec is still recorded by tombstones.
    TombstoneOnly { venue_id: i64, set_spec: String },
    NoSuchSet,
}

pub struct SetCatalog<'a> {
    store: &'a dyn PublishingStore,
}

impl<'a> SetCatalog<'a> {
    pub fn new(store: &'a dyn PublishingStore) -> Self {
        Self { store }
    }

    /// Returns one page of sets together with the size of the complete list.
    ///
    /// With a bound venue only that venue's sets are listed, whether or not it
    /// is enabled. Otherwise every enabled venue is listed in sequence order.
    pub fn list_sets(
        &self,
        bound_venue: Option<&Venue>,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<OaiSet>, usize)> {
        let venues = match bound_venue {
            Some(venue) => vec![venue.clone()],
            None => self.store.list_venues(true)?,
        };

        let mut sets = Vec::new();
        for venue in &venues {
            self.append_venue_sets(venue, &mut sets)?;
        }

        let total = sets.len();
        let page = sets.into_iter().skip(offset).take(limit).collect();
        Ok((page, total))
    }

    fn append_venue_sets(&self, venue: &Venue, sets: &mut Vec<OaiSet>) -> Result<()> {
        let venue_spec = venue_set_spec(venue);
        let mut live_specs = HashSet::new();
        live_specs.insert(venue_spec.clone());

        sets.push(OaiSet {
            spec: venue_spec,
            name: venue.name.clone(),
            description: venue.description.clone(),
        });

        for section in self.store.list_sections(venue.id)? {
            let spec = section_set_spec(venue, &section);
            live_specs.insert(spec.clone());
            sets.push(OaiSet {
                spec,
                name: section.title,
                description: section.policy,
            });
        }

        for derived in self.store.list_tombstone_derived_sets(venue.id)? {
            if live_specs.insert(derived.set_spec.clone()) {
                sets.push(OaiSet {
                    name: derived.set_spec.clone(),
                    spec: derived.set_spec,
                    description: None,
                });
            }
        }
        Ok(())
    }

    /// Resolves a client-supplied set spec.
    ///
    /// With a bound venue, only specs of that venue resolve.
    pub fn resolve_set_spec(
        &self,
        set_spec: &str,
        bound_venue: Option<&Venue>,
    ) -> Result<SetResolution> {
        let (venue_segment, section_segment) = match set_spec.split_once(':') {
            Some((venue, section)) => (venue, Some(section)),
            None => (set_spec, None),
        };

        let malformed_section = section_segment.is_some_and(|s| s.is_empty() || s.contains(':'));
        if venue_segment.is_empty() || malformed_section {
            return Ok(SetResolution::NoSuchSet);
        }

        let Ok(venue_path) = urlencoding::decode(venue_segment) else {
            debug!("Set spec {:?} has an undecodable venue segment", set_spec);
            return Ok(SetResolution::NoSuchSet);
        };

        let venue = match bound_venue {
            Some(bound) if bound.path == venue_path => Some(bound.clone()),
            Some(_) => None,
            None => self.store.get_venue_by_path(&venue_path)?,
        };
        let Some(venue) = venue else {
            return Ok(SetResolution::NoSuchSet);
        };

        let Some(section_segment) = section_segment else {
            return Ok(SetResolution::Scope {
                scope: Scope::venue(venue.id),
                set_spec: venue_set_spec(&venue),
            });
        };

        let Ok(abbrev) = urlencoding::decode(section_segment) else {
            debug!("Set spec {:?} has an undecodable section segment", set_spec);
            return Ok(SetResolution::NoSuchSet);
        };
        if let Some(section) = self
            .store
            .get_section(venue.id, SectionKey::Abbrev(&abbrev))?
        {
            return Ok(SetResolution::Scope {
                scope: Scope::section(venue.id, section.id),
                set_spec: section_set_spec(&venue, &section),
            });
        }

        // Deletions keep the spelling they were recorded with.
        let recorded = self
            .store
            .list_tombstone_derived_sets(venue.id)?
            .into_iter()
            .find(|derived| same_section_spec(&derived.set_spec, &venue_path, &abbrev));
        if let Some(derived) = recorded {
            return Ok(SetResolution::TombstoneOnly {
                venue_id: venue.id,
                set_spec: derived.set_spec,
            });
        }

        Ok(SetResolution::NoSuchSet)
    }
}

/// Whether a recorded section spec names `venue_path` and `abbrev` once
/// both of its segments are decoded.
fn same_section_spec(recorded: &str, venue_path: &str, abbrev: &str) -> bool {
    let Some((venue_segment, section_segment)) = recorded.split_once(':') else {
        return false;
    };
    match (
        urlencoding::decode(venue_segment),
        urlencoding::decode(section_segment),
    ) {
        (Ok(venue), Ok(section)) => venue == venue_path && section == abbrev,
        _ => false,
    }
}
