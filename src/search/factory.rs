use super::{LastFmSearchProvider, NoOpSearchProvider, SearchProvider};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// Picks the Last.fm provider when an API key is configured, otherwise the
/// no-op one.
pub fn create_search_provider(
    api_key: Option<&str>,
    base_url: &str,
) -> Result<Arc<dyn SearchProvider>> {
    match api_key.map(str::trim).filter(|key| !key.is_empty()) {
        Some(key) => {
            info!("Using Last.fm search at {}", base_url);
            Ok(Arc::new(LastFmSearchProvider::new(key, base_url)?))
        }
        None => {
            info!("No Last.fm API key configured, search disabled");
            Ok(Arc::new(NoOpSearchProvider))
        }
    }
}
