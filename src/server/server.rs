use anyhow::Result;
use std::{sync::Arc, time::Duration, time::Instant};

use tracing::info;

use axum::{extract::State, middleware, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use super::oai_routes::make_oai_routes;
use super::{log_requests, state::*, ServerConfig};
use crate::oai::RepositorySettings;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
    pub repository_id: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        repository_id: state.oai_settings.repository_id.clone(),
    };
    Json(stats)
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        publishing_store: GuardedPublishingStore,
        token_store: GuardedTokenStore,
        oai_settings: RepositorySettings,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            publishing_store,
            token_store,
            oai_settings: Arc::new(oai_settings),
            hash: env!("GIT_HASH").to_owned(),
        }
    }
}

pub fn make_app(
    config: ServerConfig,
    publishing_store: GuardedPublishingStore,
    token_store: GuardedTokenStore,
    oai_settings: RepositorySettings,
) -> Result<Router> {
    let state = ServerState::new(config.clone(), publishing_store, token_store, oai_settings);

    let home_router: Router = Router::new()
        .route("/", get(home))
        .with_state(state.clone());

    let app: Router = home_router
        .merge(make_oai_routes(state.clone()))
        .layer(middleware::from_fn_with_state(config, log_requests));

    Ok(app)
}

pub async fn run_server(
    publishing_store: GuardedPublishingStore,
    token_store: GuardedTokenStore,
    oai_settings: RepositorySettings,
    config: ServerConfig,
) -> Result<()> {
    let port = config.port;
    let app = make_app(config, publishing_store, token_store, oai_settings)?;

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("Serving harvesting endpoints on port {}", port);

    Ok(axum::serve(listener, app).await?)
}
