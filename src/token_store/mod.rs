mod schema;
mod sqlite_token_store;

pub use schema::TOKEN_VERSIONED_SCHEMAS;
pub use sqlite_token_store::SqliteTokenStore;

use anyhow::Result;
use chrono::{DateTime, Utc};

/// Persisted paging state of a truncated list response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredToken {
    pub id: String,
    pub offset: usize,
    pub complete_list_size: usize,
    /// Serialized parameters of the request that started the listing.
    pub params: String,
    pub expires_at: DateTime<Utc>,
}

pub trait ResumptionTokenStore: Send + Sync {
    fn insert(&self, token: &StoredToken) -> Result<()>;

    /// Deletes every token with `expires_at <= now` in one statement.
    /// Returns the number of tokens removed.
    fn evict_expired(&self, now: DateTime<Utc>) -> Result<usize>;

    fn get(&self, id: &str) -> Result<Option<StoredToken>>;
}
