//! Per-request entry point of the harvesting core.

use super::assembler::RecordAssembler;
use super::error::{OaiError, OaiResult};
use super::identifier::IdentifierCodec;
use super::lister::{IncrementalLister, ListingQuery, Selection};
use super::models::{
    ListKind, ListPage, ListParams, ListRequest, OaiSet, PageState, Record, RepositoryInfo, Scope,
    DATESTAMP_GRANULARITY, DELETED_RECORD_POLICY,
};
use super::scope_cache::ScopeCache;
use super::sets::{SetCatalog, SetResolution};
use super::tokens::TokenIssuer;
use crate::publishing_store::{Field, Filter, PublishingStore, Venue};
use crate::token_store::ResumptionTokenStore;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Site-wide settings shared by every request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepositorySettings {
    pub repository_id: String,
    pub repository_name: String,
    pub admin_email: String,
    pub records_per_page: usize,
    pub identifiers_per_page: usize,
    pub sets_per_page: usize,
    pub token_lifetime: Duration,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            repository_id: "localhost".to_string(),
            repository_name: "Preprint Server".to_string(),
            admin_email: "admin@localhost".to_string(),
            records_per_page: 100,
            identifiers_per_page: 100,
            sets_per_page: 100,
            token_lifetime: Duration::hours(24),
        }
    }
}

/// Answers the harvesting verbs for one request.
///
/// Either site-wide or bound to a single venue. Venue and section lookups are
/// memoized for the lifetime of the instance, so it must not outlive the
/// request it was built for.
pub struct OaiRepository<'a> {
    store: &'a dyn PublishingStore,
    settings: &'a RepositorySettings,
    tokens: TokenIssuer<'a>,
    codec: IdentifierCodec,
    cache: ScopeCache<'a>,
    venue: Option<Venue>,
}

impl<'a> OaiRepository<'a> {
    pub fn site(
        store: &'a dyn PublishingStore,
        token_store: &'a dyn ResumptionTokenStore,
        settings: &'a RepositorySettings,
    ) -> Self {
        Self {
            store,
            settings,
            tokens: TokenIssuer::new(token_store, settings.token_lifetime),
            codec: IdentifierCodec::new(&settings.repository_id),
            cache: ScopeCache::new(store),
            venue: None,
        }
    }

    /// Binds the repository to the venue at `path`, or `None` if there is none.
    pub fn for_venue(
        store: &'a dyn PublishingStore,
        token_store: &'a dyn ResumptionTokenStore,
        settings: &'a RepositorySettings,
        path: &str,
    ) -> Result<Option<Self>> {
        let Some(venue) = store.get_venue_by_path(path)? else {
            return Ok(None);
        };
        let mut repository = Self::site(store, token_store, settings);
        repository.cache.remember_venue(&venue);
        repository.venue = Some(venue);
        Ok(Some(repository))
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.tokens = self.tokens.with_clock(clock);
        self
    }

    pub fn venue(&self) -> Option<&Venue> {
        self.venue.as_ref()
    }

    pub fn identify(&self) -> OaiResult<RepositoryInfo> {
        let (name, admin_email, filter) = match &self.venue {
            Some(venue) => (
                venue.name.clone(),
                venue
                    .contact_email
                    .clone()
                    .unwrap_or_else(|| self.settings.admin_email.clone()),
                Filter::eq(Field::VenueId, venue.id),
            ),
            None => (
                self.settings.repository_name.clone(),
                self.settings.admin_email.clone(),
                Filter::all(),
            ),
        };

        let earliest_live = self.store.earliest_live_datestamp(&filter)?;
        let earliest_deleted = self.store.earliest_tombstone_datestamp(&filter)?;
        let earliest_datestamp = earliest_live
            .into_iter()
            .chain(earliest_deleted)
            .min()
            .unwrap_or(DateTime::UNIX_EPOCH);

        Ok(RepositoryInfo {
            name,
            admin_email,
            sample_identifier: self.codec.encode(1),
            earliest_datestamp,
            toolkit_name: env!("CARGO_PKG_NAME").to_string(),
            toolkit_version: env!("CARGO_PKG_VERSION").to_string(),
            deleted_record: DELETED_RECORD_POLICY.to_string(),
            granularity: DATESTAMP_GRANULARITY.to_string(),
        })
    }

    pub fn get_record(&self, identifier: &str) -> OaiResult<Record> {
        let record_id = self
            .codec
            .decode(identifier)
            .ok_or_else(|| OaiError::MalformedIdentifier(identifier.to_string()))?;
        self.assembler()
            .assemble(record_id, self.venue.as_ref().map(|v| v.id))
    }

    pub fn list_records(&self, request: &ListRequest) -> OaiResult<ListPage<Record>> {
        self.list(ListKind::Records, request)
    }

    /// Same as [`Self::list_records`] without payloads.
    pub fn list_identifiers(&self, request: &ListRequest) -> OaiResult<ListPage<Record>> {
        self.list(ListKind::Identifiers, request)
    }

    pub fn list_sets(&self, resumption_token: Option<&str>) -> OaiResult<ListPage<OaiSet>> {
        let params = ListParams {
            kind: ListKind::Sets,
            from: None,
            until: None,
            set: None,
        };
        let offset = match resumption_token {
            Some(token) => self.resume(token, ListKind::Sets)?.1,
            None => 0,
        };

        let (sets, total) = SetCatalog::new(self.store).list_sets(
            self.venue.as_ref(),
            offset,
            self.settings.sets_per_page,
        )?;
        self.finish_page(sets, offset, total, &params)
    }

    fn list(&self, kind: ListKind, request: &ListRequest) -> OaiResult<ListPage<Record>> {
        let (params, offset) = match &request.resumption_token {
            Some(token) => {
                if request.from.is_some() || request.until.is_some() || request.set.is_some() {
                    return Err(OaiError::BadArgument(
                        "resumptionToken cannot be combined with other arguments".to_string(),
                    ));
                }
                self.resume(token, kind)?
            }
            None => {
                if let (Some(from), Some(until)) = (request.from, request.until) {
                    if from > until {
                        return Err(OaiError::BadArgument(
                            "from must not be later than until".to_string(),
                        ));
                    }
                }
                let params = ListParams {
                    kind,
                    from: request.from,
                    until: request.until,
                    set: request.set.clone(),
                };
                (params, 0)
            }
        };

        let query = self.listing_query(&params)?;
        let assembler = self.assembler();
        let lister = IncrementalLister::new(self.store, &assembler);

        let entries = lister.entries(&query)?;
        let total = entries.len();
        let page_size = match kind {
            ListKind::Records => self.settings.records_per_page,
            _ => self.settings.identifiers_per_page,
        };
        let page = entries.into_iter().skip(offset).take(page_size);
        let items = lister
            .records(page, kind == ListKind::Records)
            .collect::<OaiResult<Vec<_>>>()?;

        self.finish_page(items, offset, total, &params)
    }

    fn resume(&self, token: &str, kind: ListKind) -> OaiResult<(ListParams, usize)> {
        let state = self.tokens.resolve(token)?;
        if state.params.kind != kind {
            debug!(
                "Resumption token {} was issued for {:?}, not {:?}",
                token, state.params.kind, kind
            );
            return Err(OaiError::BadResumptionToken);
        }
        Ok((state.params, state.offset))
    }

    fn listing_query(&self, params: &ListParams) -> OaiResult<ListingQuery> {
        let selection = match &params.set {
            None => match &self.venue {
                Some(venue) => Selection::Scope {
                    scope: Scope::venue(venue.id),
                    set_specs: Vec::new(),
                },
                None => Selection::All,
            },
            Some(requested) => {
                let resolution =
                    SetCatalog::new(self.store).resolve_set_spec(requested, self.venue.as_ref())?;
                match resolution {
                    SetResolution::Scope { scope, set_spec } => {
                        let mut set_specs = Vec::new();
                        if scope.section_id.is_some() {
                            set_specs.push(set_spec);
                            if !set_specs.contains(requested) {
                                set_specs.push(requested.clone());
                            }
                        }
                        Selection::Scope { scope, set_specs }
                    }
                    SetResolution::TombstoneOnly { venue_id, set_spec } => {
                        Selection::DeletedOnly { venue_id, set_spec }
                    }
                    SetResolution::NoSuchSet => {
                        return Err(OaiError::BadSetSpec(requested.clone()))
                    }
                }
            }
        };

        Ok(ListingQuery {
            selection,
            from: params.from,
            until: params.until,
        })
    }

    fn finish_page<T>(
        &self,
        items: Vec<T>,
        offset: usize,
        total: usize,
        params: &ListParams,
    ) -> OaiResult<ListPage<T>> {
        let next_offset = offset + items.len();
        let state = if next_offset < total {
            let issued = self.tokens.issue(next_offset, params, total)?;
            PageState::Paging {
                token: issued.id,
                expires_at: issued.expires_at,
            }
        } else {
            PageState::Done
        };

        Ok(ListPage {
            items,
            cursor: offset,
            complete_list_size: total,
            state,
        })
    }

    fn assembler(&self) -> RecordAssembler<'_> {
        RecordAssembler::new(self.store, &self.codec, &self.cache)
    }
}
