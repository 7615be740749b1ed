//! Issuing and resolving resumption tokens.

use super::error::{OaiError, OaiResult};
use super::models::ListParams;
use crate::token_store::{ResumptionTokenStore, StoredToken};
use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// State carried by a valid token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResumptionState {
    pub offset: usize,
    pub complete_list_size: usize,
    pub params: ListParams,
}

/// A freshly issued token as reported to the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedToken {
    pub id: String,
    pub expires_at: DateTime<Utc>,
}

pub struct TokenIssuer<'a> {
    store: &'a dyn ResumptionTokenStore,
    lifetime: Duration,
    clock: fn() -> DateTime<Utc>,
}

impl<'a> TokenIssuer<'a> {
    pub fn new(store: &'a dyn ResumptionTokenStore, lifetime: Duration) -> Self {
        Self {
            store,
            lifetime,
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Persists paging state for the remainder of a list.
    ///
    /// A failed insert fails the request; it is never retried here since a
    /// retry could leave two tokens for the same page.
    pub fn issue(
        &self,
        offset: usize,
        params: &ListParams,
        complete_list_size: usize,
    ) -> OaiResult<IssuedToken> {
        let token = StoredToken {
            id: uuid::Uuid::new_v4().simple().to_string(),
            offset,
            complete_list_size,
            params: serde_json::to_string(params).context("Failed to serialize list parameters")?,
            expires_at: (self.clock)()
                .checked_add_signed(self.lifetime)
                .context("Token lifetime runs past the end of the calendar")?,
        };
        self.store.insert(&token)?;
        debug!("Issued resumption token {} at offset {}", token.id, offset);

        Ok(IssuedToken {
            id: token.id,
            expires_at: token.expires_at,
        })
    }

    /// Resolves a token after evicting every expired one.
    ///
    /// Unknown, expired and unreadable tokens all yield
    /// [`OaiError::BadResumptionToken`].
    pub fn resolve(&self, token_id: &str) -> OaiResult<ResumptionState> {
        self.store.evict_expired((self.clock)())?;

        let Some(token) = self.store.get(token_id)? else {
            return Err(OaiError::BadResumptionToken);
        };
        let Ok(params) = serde_json::from_str::<ListParams>(&token.params) else {
            debug!("Resumption token {} carries unreadable parameters", token_id);
            return Err(OaiError::BadResumptionToken);
        };

        Ok(ResumptionState {
            offset: token.offset,
            complete_list_size: token.complete_list_size,
            params,
        })
    }
}
