//! Search provider trait and result types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_SOURCE: &str = "lastfm";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchedTrack {
    pub id: String,
    pub track: String,
    pub artist: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listeners: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchedArtist {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mbid: Option<String>,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listeners: Option<u64>,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search provider request failed: {0}")]
    Http(String),

    #[error("Search provider error {code}: {message}")]
    Provider { code: i64, message: String },

    #[error("Could not read search provider response: {0}")]
    Parse(String),
}

/// Looks tracks and artists up in an outside catalog. Results come back in
/// provider order.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search_tracks(
        &self,
        query: &str,
        artist: Option<&str>,
        limit: u32,
        page: u32,
    ) -> Result<Vec<SearchedTrack>, SearchError>;

    async fn search_artists(
        &self,
        query: &str,
        limit: u32,
        page: u32,
    ) -> Result<Vec<SearchedArtist>, SearchError>;
}

/// Used when no provider is configured; every search comes back empty.
pub struct NoOpSearchProvider;

#[async_trait]
impl SearchProvider for NoOpSearchProvider {
    async fn search_tracks(
        &self,
        _query: &str,
        _artist: Option<&str>,
        _limit: u32,
        _page: u32,
    ) -> Result<Vec<SearchedTrack>, SearchError> {
        Ok(Vec::new())
    }

    async fn search_artists(
        &self,
        _query: &str,
        _limit: u32,
        _page: u32,
    ) -> Result<Vec<SearchedArtist>, SearchError> {
        Ok(Vec::new())
    }
}
