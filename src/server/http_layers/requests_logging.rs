//! Per-request logging for the harvesting endpoints.

use super::super::ServerConfig;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::{body::Body, http::Request, middleware::Next, response::IntoResponse};
use std::time::Instant;
use tracing::info;

/// How much of each request ends up in the log.
#[derive(PartialEq, PartialOrd, Clone, Debug, Default, clap::ValueEnum)]
pub enum RequestsLoggingLevel {
    None,
    /// Method, path with query, status and latency.
    #[default]
    Path,
    /// Everything from `Path` plus request and response headers.
    Headers,
}

impl std::fmt::Display for RequestsLoggingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

fn log_headers(direction: &str, headers: &HeaderMap) {
    for (name, value) in headers {
        info!("  {} {}: {:?}", direction, name, value);
    }
}

pub async fn log_requests(
    State(config): State<ServerConfig>,
    request: Request<Body>,
    next: Next,
) -> impl IntoResponse {
    let level = config.requests_logging_level;
    if level == RequestsLoggingLevel::None {
        return next.run(request).await;
    }

    let start = Instant::now();
    let method = request.method().clone();
    // Harvesters put the whole request in the query string.
    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    info!(">>> {} {}", method, target);
    if level >= RequestsLoggingLevel::Headers {
        log_headers(">", request.headers());
    }

    let response = next.run(request).await;

    if level >= RequestsLoggingLevel::Headers {
        log_headers("<", response.headers());
    }
    info!(
        "<<< {} {} {} ({}ms)",
        method,
        target,
        response.status().as_u16(),
        start.elapsed().as_millis()
    );

    response
}
