//! Harvesting core: identifiers, sets, incremental listings and paging.

mod assembler;
mod error;
mod identifier;
pub mod lister;
mod models;
mod repository;
mod scope_cache;
pub mod sets;
mod tokens;

pub use assembler::RecordAssembler;
pub use error::{OaiError, OaiResult};
pub use identifier::IdentifierCodec;
pub use lister::{IncrementalLister, ListingEntry, ListingQuery, Selection};
pub use models::*;
pub use repository::{OaiRepository, RepositorySettings};
pub use scope_cache::ScopeCache;
pub use sets::{SetCatalog, SetResolution};
pub use tokens::{IssuedToken, ResumptionState, TokenIssuer};
