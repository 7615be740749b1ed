//! JSON adapter over the harvesting core.
//!
//! Site-wide routes live under `/oai`, venue-bound ones under
//! `/venues/{venue}/oai`. The protocol envelope itself is left to a client;
//! these routes only translate query arguments and errors.

use super::state::ServerState;
use crate::oai::{ListPage, ListRequest, OaiError, OaiRepository, OaiResult, PageState};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    from: Option<String>,
    until: Option<String>,
    set: Option<String>,
    resumption_token: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct SetsQuery {
    resumption_token: Option<String>,
}

#[derive(Serialize)]
struct ListResponse<T> {
    items: Vec<T>,
    cursor: usize,
    complete_list_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    resumption_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expiration_date: Option<DateTime<Utc>>,
}

impl<T> From<ListPage<T>> for ListResponse<T> {
    fn from(page: ListPage<T>) -> Self {
        let (resumption_token, expiration_date) = match page.state {
            PageState::Paging { token, expires_at } => (Some(token), Some(expires_at)),
            PageState::Done => (None, None),
        };
        Self {
            items: page.items,
            cursor: page.cursor,
            complete_list_size: page.complete_list_size,
            resumption_token,
            expiration_date,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

/// Error responses of the adapter.
enum ApiError {
    Oai(OaiError),
    UnknownVenue(String),
}

impl From<OaiError> for ApiError {
    fn from(err: OaiError) -> Self {
        ApiError::Oai(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Oai(OaiError::StorageFailure(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::UnknownVenue(path) => (
                StatusCode::NOT_FOUND,
                "unknownVenue".to_string(),
                format!("No venue at path {}", path),
            ),
            ApiError::Oai(OaiError::StorageFailure(err)) => {
                error!("Harvesting request failed: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storageFailure".to_string(),
                    "The repository is temporarily unavailable".to_string(),
                )
            }
            ApiError::Oai(err) => {
                let status = match err {
                    OaiError::RecordNotFound(_) | OaiError::OutOfScope(_) => StatusCode::NOT_FOUND,
                    _ => StatusCode::BAD_REQUEST,
                };
                let code = err.oai_code().unwrap_or("badArgument").to_string();
                (status, code, err.to_string())
            }
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Granularity {
    Day,
    Second,
}

/// Parses `YYYY-MM-DD` or `YYYY-MM-DDThh:mm:ssZ`.
///
/// A day-granular `until` covers the whole day.
fn parse_datestamp(
    name: &str,
    value: &str,
    end_of_day: bool,
) -> Result<(DateTime<Utc>, Granularity), OaiError> {
    if let Ok(datetime) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%SZ") {
        return Ok((datetime.and_utc(), Granularity::Second));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        let time = if end_of_day {
            NaiveTime::from_hms_opt(23, 59, 59)
        } else {
            NaiveTime::from_hms_opt(0, 0, 0)
        };
        if let Some(time) = time {
            return Ok((date.and_time(time).and_utc(), Granularity::Day));
        }
    }
    Err(OaiError::BadArgument(format!(
        "{} must be YYYY-MM-DD or YYYY-MM-DDThh:mm:ssZ, got {:?}",
        name, value
    )))
}

impl ListQuery {
    fn into_request(self) -> Result<ListRequest, OaiError> {
        let from = self
            .from
            .as_deref()
            .map(|v| parse_datestamp("from", v, false))
            .transpose()?;
        let until = self
            .until
            .as_deref()
            .map(|v| parse_datestamp("until", v, true))
            .transpose()?;

        if let (Some((_, from_granularity)), Some((_, until_granularity))) = (from, until) {
            if from_granularity != until_granularity {
                return Err(OaiError::BadArgument(
                    "from and until must have the same granularity".to_string(),
                ));
            }
        }

        Ok(ListRequest {
            from: from.map(|(date, _)| date),
            until: until.map(|(date, _)| date),
            set: self.set,
            resumption_token: self.resumption_token,
        })
    }
}

/// Builds a request-scoped repository and runs `f` against it.
fn with_repository<T, F>(state: &ServerState, venue: Option<&str>, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&OaiRepository) -> OaiResult<T>,
{
    let store = state.publishing_store.as_ref();
    let tokens = state.token_store.as_ref();
    let settings = state.oai_settings.as_ref();

    let repository = match venue {
        None => OaiRepository::site(store, tokens, settings),
        Some(path) => OaiRepository::for_venue(store, tokens, settings, path)?
            .ok_or_else(|| ApiError::UnknownVenue(path.to_string()))?,
    };
    Ok(f(&repository)?)
}

fn identify(state: &ServerState, venue: Option<&str>) -> Response {
    match with_repository(state, venue, |repo| repo.identify()) {
        Ok(info) => Json(info).into_response(),
        Err(err) => err.into_response(),
    }
}

fn get_record(state: &ServerState, venue: Option<&str>, identifier: &str) -> Response {
    debug!("GetRecord {}", identifier);
    match with_repository(state, venue, |repo| repo.get_record(identifier)) {
        Ok(record) => Json(record).into_response(),
        Err(err) => err.into_response(),
    }
}

fn list(
    state: &ServerState,
    venue: Option<&str>,
    query: ListQuery,
    with_payload: bool,
) -> Response {
    let request = match query.into_request() {
        Ok(request) => request,
        Err(err) => return ApiError::from(err).into_response(),
    };
    let result = with_repository(state, venue, |repo| {
        if with_payload {
            repo.list_records(&request)
        } else {
            repo.list_identifiers(&request)
        }
    });
    match result {
        Ok(page) => Json(ListResponse::from(page)).into_response(),
        Err(err) => err.into_response(),
    }
}

fn list_sets(state: &ServerState, venue: Option<&str>, query: SetsQuery) -> Response {
    let token = query.resumption_token.as_deref();
    match with_repository(state, venue, |repo| repo.list_sets(token)) {
        Ok(page) => Json(ListResponse::from(page)).into_response(),
        Err(err) => err.into_response(),
    }
}

// Site-wide handlers

async fn site_identify(State(state): State<ServerState>) -> Response {
    identify(&state, None)
}

async fn site_get_record(
    State(state): State<ServerState>,
    Path(identifier): Path<String>,
) -> Response {
    get_record(&state, None, &identifier)
}

async fn site_list_records(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> Response {
    list(&state, None, query, true)
}

async fn site_list_identifiers(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> Response {
    list(&state, None, query, false)
}

async fn site_list_sets(
    State(state): State<ServerState>,
    Query(query): Query<SetsQuery>,
) -> Response {
    list_sets(&state, None, query)
}

// Venue-bound handlers

async fn venue_identify(State(state): State<ServerState>, Path(venue): Path<String>) -> Response {
    identify(&state, Some(&venue))
}

async fn venue_get_record(
    State(state): State<ServerState>,
    Path((venue, identifier)): Path<(String, String)>,
) -> Response {
    get_record(&state, Some(&venue), &identifier)
}

async fn venue_list_records(
    State(state): State<ServerState>,
    Path(venue): Path<String>,
    Query(query): Query<ListQuery>,
) -> Response {
    list(&state, Some(&venue), query, true)
}

async fn venue_list_identifiers(
    State(state): State<ServerState>,
    Path(venue): Path<String>,
    Query(query): Query<ListQuery>,
) -> Response {
    list(&state, Some(&venue), query, false)
}

async fn venue_list_sets(
    State(state): State<ServerState>,
    Path(venue): Path<String>,
    Query(query): Query<SetsQuery>,
) -> Response {
    list_sets(&state, Some(&venue), query)
}

pub fn make_oai_routes(state: ServerState) -> Router {
    let site_routes: Router = Router::new()
        .route("/identify", get(site_identify))
        .route("/records", get(site_list_records))
        .route("/records/{*identifier}", get(site_get_record))
        .route("/identifiers", get(site_list_identifiers))
        .route("/sets", get(site_list_sets))
        .with_state(state.clone());

    let venue_routes: Router = Router::new()
        .route("/{venue}/oai/identify", get(venue_identify))
        .route("/{venue}/oai/records", get(venue_list_records))
        .route("/{venue}/oai/records/{*identifier}", get(venue_get_record))
        .route("/{venue}/oai/identifiers", get(venue_list_identifiers))
        .route("/{venue}/oai/sets", get(venue_list_sets))
        .with_state(state);

    Router::new()
        .nest("/oai", site_routes)
        .nest("/venues", venue_routes)
}
