pub mod filter;
mod memory_store;
mod models;
mod schema;
mod store;
mod trait_def;

pub use filter::{Field, Filter, FilterTarget, FilterValue};
pub use memory_store::MemoryPublishingStore;
pub use models::*;
pub use schema::PUBLISHING_VERSIONED_SCHEMAS;
pub use store::SqlitePublishingStore;
pub use trait_def::PublishingStore;
