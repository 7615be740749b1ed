use axum::extract::FromRef;

use crate::oai::RepositorySettings;
use crate::publishing_store::PublishingStore;
use crate::token_store::ResumptionTokenStore;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedPublishingStore = Arc<dyn PublishingStore>;
pub type GuardedTokenStore = Arc<dyn ResumptionTokenStore>;
pub type SharedRepositorySettings = Arc<RepositorySettings>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub publishing_store: GuardedPublishingStore,
    pub token_store: GuardedTokenStore,
    pub oai_settings: SharedRepositorySettings,
    pub hash: String,
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for GuardedPublishingStore {
    fn from_ref(input: &ServerState) -> Self {
        input.publishing_store.clone()
    }
}

impl FromRef<ServerState> for GuardedTokenStore {
    fn from_ref(input: &ServerState) -> Self {
        input.token_store.clone()
    }
}

impl FromRef<ServerState> for SharedRepositorySettings {
    fn from_ref(input: &ServerState) -> Self {
        input.oai_settings.clone()
    }
}
