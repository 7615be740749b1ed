//! Preprint OAI Server Library
//!
//! Harvesting core for a preprint server: record identifiers, sets,
//! incremental listings with resumption tokens, and the HTTP adapter on top.

pub mod config;
pub mod oai;
pub mod publishing_store;
pub mod server;
pub mod sqlite_persistence;
pub mod token_store;

// Re-export commonly used types for convenience
pub use oai::{OaiError, OaiRepository, RepositorySettings};
pub use publishing_store::{MemoryPublishingStore, PublishingStore, SqlitePublishingStore};
pub use server::{run_server, RequestsLoggingLevel};
pub use token_store::{ResumptionTokenStore, SqliteTokenStore};
