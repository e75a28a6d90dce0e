use axum::extract::FromRef;

use crate::identity::{IdentityProvider, UserStore};
use crate::logs::LogManager;
use crate::search::SearchProvider;
use crate::tags::TagCatalog;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedIdentityProvider = Arc<dyn IdentityProvider>;
pub type GuardedUserStore = Arc<dyn UserStore>;
pub type GuardedLogManager = Arc<LogManager>;
pub type GuardedTagCatalog = Arc<TagCatalog>;
pub type GuardedSearchProvider = Arc<dyn SearchProvider>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub hash: String,
    pub identity: GuardedIdentityProvider,
    pub user_store: GuardedUserStore,
    pub log_manager: GuardedLogManager,
    pub tag_catalog: GuardedTagCatalog,
    pub search: GuardedSearchProvider,
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for GuardedIdentityProvider {
    fn from_ref(input: &ServerState) -> Self {
        input.identity.clone()
    }
}

impl FromRef<ServerState> for GuardedUserStore {
    fn from_ref(input: &ServerState) -> Self {
        input.user_store.clone()
    }
}

impl FromRef<ServerState> for GuardedLogManager {
    fn from_ref(input: &ServerState) -> Self {
        input.log_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedTagCatalog {
    fn from_ref(input: &ServerState) -> Self {
        input.tag_catalog.clone()
    }
}

impl FromRef<ServerState> for GuardedSearchProvider {
    fn from_ref(input: &ServerState) -> Self {
        input.search.clone()
    }
}
