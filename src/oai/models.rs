//! Values exchanged between the repository façade and its callers.

use crate::publishing_store::{Galley, Section, Submission, Venue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DELETED_RECORD_POLICY: &str = "persistent";
pub const DATESTAMP_GRANULARITY: &str = "YYYY-MM-DDThh:mm:ssZ";

/// A venue, optionally narrowed to one of its sections.
///
/// A section id is only ever set after it was resolved within `venue_id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub venue_id: i64,
    pub section_id: Option<i64>,
}

impl Scope {
    pub fn venue(venue_id: i64) -> Self {
        Self {
            venue_id,
            section_id: None,
        }
    }

    pub fn section(venue_id: i64, section_id: i64) -> Self {
        Self {
            venue_id,
            section_id: Some(section_id),
        }
    }
}

/// Full metadata of a live record.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecordPayload {
    pub submission: Submission,
    pub galleys: Vec<Galley>,
    pub venue: Venue,
    pub section: Option<Section>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Record {
    pub identifier: String,
    pub datestamp: DateTime<Utc>,
    pub set_specs: Vec<String>,
    pub deleted: bool,
    /// Always `None` for deleted records and for identifier listings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<RecordPayload>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OaiSet {
    pub spec: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RepositoryInfo {
    pub name: String,
    pub admin_email: String,
    pub sample_identifier: String,
    pub earliest_datestamp: DateTime<Utc>,
    pub toolkit_name: String,
    pub toolkit_version: String,
    pub deleted_record: String,
    pub granularity: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Records,
    Identifiers,
    Sets,
}

/// Parameters of the request that started a listing, saved with its tokens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    pub kind: ListKind,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub set: Option<String>,
}

/// Arguments of a `ListRecords` or `ListIdentifiers` call.
///
/// A resumption token is exclusive: it cannot be combined with the other
/// fields.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListRequest {
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub set: Option<String>,
    pub resumption_token: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageState {
    Paging {
        token: String,
        expires_at: DateTime<Utc>,
    },
    Done,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListPage<T> {
    pub items: Vec<T>,
    /// Offset of the first item within the complete list.
    pub cursor: usize,
    pub complete_list_size: usize,
    pub state: PageState,
}

impl<T> ListPage<T> {
    pub fn token(&self) -> Option<&str> {
        match &self.state {
            PageState::Paging { token, .. } => Some(token),
            PageState::Done => None,
        }
    }
}
