//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all harvesting endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::Value;
use std::time::Duration;

/// Arguments of a list request, sent as query parameters
#[derive(Default, Clone)]
pub struct ListArgs<'a> {
    pub from: Option<&'a str>,
    pub until: Option<&'a str>,
    pub set: Option<&'a str>,
    pub resumption_token: Option<&'a str>,
}

impl<'a> ListArgs<'a> {
    pub fn token(token: &'a str) -> Self {
        Self {
            resumption_token: Some(token),
            ..Default::default()
        }
    }

    pub fn set(set: &'a str) -> Self {
        Self {
            set: Some(set),
            ..Default::default()
        }
    }

    fn query(&self) -> Vec<(&'static str, &'a str)> {
        let mut query = Vec::new();
        if let Some(from) = self.from {
            query.push(("from", from));
        }
        if let Some(until) = self.until {
            query.push(("until", until));
        }
        if let Some(set) = self.set {
            query.push(("set", set));
        }
        if let Some(token) = self.resumption_token {
            query.push(("resumptionToken", token));
        }
        query
    }
}

/// HTTP test client, optionally bound to one venue
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
    /// Prefix of every harvesting route, `/oai` or `/venues/{path}/oai`
    oai_root: String,
}

impl TestClient {
    /// Creates a client for the site-wide endpoints
    pub fn new(base_url: String) -> Self {
        Self::with_root(base_url, "/oai".to_string())
    }

    /// Creates a client for the endpoints bound to the venue at `path`
    pub fn for_venue(base_url: String, path: &str) -> Self {
        Self::with_root(base_url, format!("/venues/{}/oai", path))
    }

    fn with_root(base_url: String, oai_root: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            oai_root,
        }
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}{}", self.base_url, self.oai_root, route)
    }

    // ========================================================================
    // Harvesting Endpoints
    // ========================================================================

    /// GET /identify
    pub async fn identify(&self) -> Response {
        self.client
            .get(self.url("/identify"))
            .send()
            .await
            .expect("Identify request failed")
    }

    /// GET /records/{identifier}
    pub async fn get_record(&self, identifier: &str) -> Response {
        self.client
            .get(self.url(&format!("/records/{}", identifier)))
            .send()
            .await
            .expect("GetRecord request failed")
    }

    /// GET /records
    pub async fn list_records(&self, args: &ListArgs<'_>) -> Response {
        self.client
            .get(self.url("/records"))
            .query(&args.query())
            .send()
            .await
            .expect("ListRecords request failed")
    }

    /// GET /identifiers
    pub async fn list_identifiers(&self, args: &ListArgs<'_>) -> Response {
        self.client
            .get(self.url("/identifiers"))
            .query(&args.query())
            .send()
            .await
            .expect("ListIdentifiers request failed")
    }

    /// GET /sets
    pub async fn list_sets(&self, resumption_token: Option<&str>) -> Response {
        let mut request = self.client.get(self.url("/sets"));
        if let Some(token) = resumption_token {
            request = request.query(&[("resumptionToken", token)]);
        }
        request.send().await.expect("ListSets request failed")
    }

    // ========================================================================
    // Paging Helpers
    // ========================================================================

    /// Follows resumption tokens of a records or identifiers listing to the
    /// end. Returns every page body in order.
    pub async fn harvest(&self, with_payload: bool, args: &ListArgs<'_>) -> Vec<Value> {
        let mut pages = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let response = match &token {
                None if with_payload => self.list_records(args).await,
                None => self.list_identifiers(args).await,
                Some(token) if with_payload => self.list_records(&ListArgs::token(token)).await,
                Some(token) => self.list_identifiers(&ListArgs::token(token)).await,
            };
            assert_eq!(response.status(), reqwest::StatusCode::OK);
            let page: Value = response.json().await.expect("Invalid list body");
            token = page["resumption_token"].as_str().map(str::to_string);
            pages.push(page);
            if token.is_none() {
                return pages;
            }
        }
    }

    /// Follows resumption tokens of a sets listing to the end.
    pub async fn harvest_sets(&self) -> Vec<Value> {
        let mut pages = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let response = self.list_sets(token.as_deref()).await;
            assert_eq!(response.status(), reqwest::StatusCode::OK);
            let page: Value = response.json().await.expect("Invalid sets body");
            token = page["resumption_token"].as_str().map(str::to_string);
            pages.push(page);
            if token.is_none() {
                return pages;
            }
        }
    }
}

/// Collects the `identifier` of every item over a list of pages
pub fn identifiers_of(pages: &[Value]) -> Vec<String> {
    pages
        .iter()
        .flat_map(|page| page["items"].as_array().cloned().unwrap_or_default())
        .map(|item| item["identifier"].as_str().unwrap_or_default().to_string())
        .collect()
}
