//! Common test infrastructure
//!
//! This module provides all the infrastructure needed for end-to-end tests.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{identifier, TestClient, TestServer, RECORD_QC_1};
//! use reqwest::StatusCode;
//!
//! #[tokio::test]
//! async fn test_get_record() {
//!     let server = TestServer::spawn().await;
//!     let client = TestClient::new(server.base_url.clone());
//!
//!     let response = client.get_record(&identifier(RECORD_QC_1)).await;
//!     assert_eq!(response.status(), StatusCode::OK);
//! }
//! ```

mod client;
mod constants;
mod fixtures;
mod server;

// Public API - this is what tests import
#[allow(unused_imports)]
pub use client::{identifiers_of, ListArgs, TestClient};
pub use constants::*;
#[allow(unused_imports)]
pub use fixtures::{day, withdraw_submission};
pub use server::TestServer;
