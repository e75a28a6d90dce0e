//! Last.fm search (`track.search` and `artist.search`).

use super::provider::{SearchError, SearchProvider, SearchedArtist, SearchedTrack, DEFAULT_SOURCE};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const LASTFM_API_BASE: &str = "https://ws.audioscrobbler.com/2.0/";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct LastFmSearchProvider {
    http: Client,
    api_key: String,
    base_url: String,
}

// Last.fm nests results a few levels deep and collapses one-element lists
// into a bare object.

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

#[derive(Deserialize)]
struct TrackSearchResponse {
    results: Option<TrackResults>,
}

#[derive(Deserialize)]
struct TrackResults {
    trackmatches: Option<TrackMatches>,
}

#[derive(Deserialize)]
struct TrackMatches {
    track: Option<OneOrMany<LastFmTrack>>,
}

#[derive(Deserialize)]
struct LastFmTrack {
    name: Option<String>,
    artist: Option<String>,
    mbid: Option<String>,
    url: Option<String>,
    listeners: Option<String>,
}

#[derive(Deserialize)]
struct ArtistSearchResponse {
    results: Option<ArtistResults>,
}

#[derive(Deserialize)]
struct ArtistResults {
    artistmatches: Option<ArtistMatches>,
}

#[derive(Deserialize)]
struct ArtistMatches {
    artist: Option<OneOrMany<LastFmArtist>>,
}

#[derive(Deserialize)]
struct LastFmArtist {
    name: Option<String>,
    mbid: Option<String>,
    url: Option<String>,
    listeners: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Stable id for results without an MBID.
fn fallback_id(key: &str) -> String {
    key.to_lowercase().replace([' ', '/'], "_")
}

fn parse_body<T: DeserializeOwned>(body: Value) -> Result<T, SearchError> {
    if let Some(code) = body.get("error").and_then(Value::as_i64) {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(SearchError::Provider { code, message });
    }
    serde_json::from_value(body).map_err(|err| SearchError::Parse(err.to_string()))
}

fn normalize_tracks(body: Value) -> Result<Vec<SearchedTrack>, SearchError> {
    let response: TrackSearchResponse = parse_body(body)?;
    let tracks = response
        .results
        .and_then(|r| r.trackmatches)
        .and_then(|m| m.track)
        .map(OneOrMany::into_vec)
        .unwrap_or_default();

    Ok(tracks
        .into_iter()
        .filter_map(|t| {
            let track = non_blank(t.name)?;
            let artist = non_blank(t.artist)?;
            let id = non_blank(t.mbid)
                .unwrap_or_else(|| fallback_id(&format!("{}_{}", artist, track)));
            Some(SearchedTrack {
                id,
                track,
                artist,
                source: DEFAULT_SOURCE.to_string(),
                url: non_blank(t.url),
                listeners: t.listeners.and_then(|l| l.parse().ok()),
            })
        })
        .collect())
}

fn normalize_artists(body: Value) -> Result<Vec<SearchedArtist>, SearchError> {
    let response: ArtistSearchResponse = parse_body(body)?;
    let artists = response
        .results
        .and_then(|r| r.artistmatches)
        .and_then(|m| m.artist)
        .map(OneOrMany::into_vec)
        .unwrap_or_default();

    Ok(artists
        .into_iter()
        .filter_map(|a| {
            let name = non_blank(a.name)?;
            let mbid = non_blank(a.mbid);
            Some(SearchedArtist {
                id: mbid.clone().unwrap_or_else(|| fallback_id(&name)),
                name,
                mbid,
                source: DEFAULT_SOURCE.to_string(),
                url: non_blank(a.url),
                listeners: a.listeners.and_then(|l| l.parse().ok()),
            })
        })
        .collect())
}

impl LastFmSearchProvider {
    pub fn new(api_key: &str, base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("musicboxd/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
        })
    }

    async fn call(&self, method: &str, params: &[(&str, String)]) -> Result<Value, SearchError> {
        debug!("Last.fm {} {:?}", method, params);
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("method", method),
                ("api_key", self.api_key.as_str()),
                ("format", "json"),
            ])
            .query(params)
            .send()
            .await
            .map_err(|err| SearchError::Http(err.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| SearchError::Http(err.to_string()))?;
        read_body(status, &text)
    }
}

/// Last.fm also sends its `{error, message}` envelope with 4xx statuses, so
/// the body is looked at before the status decides anything.
fn read_body(status: StatusCode, text: &str) -> Result<Value, SearchError> {
    let has_error_code = |body: &Value| body.get("error").and_then(Value::as_i64).is_some();
    match serde_json::from_str::<Value>(text) {
        Ok(body) if status.is_success() || has_error_code(&body) => Ok(body),
        Ok(_) => Err(SearchError::Http(format!("Last.fm answered {}", status))),
        Err(_) if !status.is_success() => {
            Err(SearchError::Http(format!("Last.fm answered {}", status)))
        }
        Err(err) => Err(SearchError::Parse(err.to_string())),
    }
}

#[async_trait]
impl SearchProvider for LastFmSearchProvider {
    async fn search_tracks(
        &self,
        query: &str,
        artist: Option<&str>,
        limit: u32,
        page: u32,
    ) -> Result<Vec<SearchedTrack>, SearchError> {
        let mut params = vec![
            ("track", query.to_string()),
            ("limit", limit.to_string()),
            ("page", page.to_string()),
        ];
        if let Some(artist) = artist.filter(|a| !a.trim().is_empty()) {
            params.push(("artist", artist.to_string()));
        }
        let body = self.call("track.search", &params).await?;
        normalize_tracks(body)
    }

    async fn search_artists(
        &self,
        query: &str,
        limit: u32,
        page: u32,
    ) -> Result<Vec<SearchedArtist>, SearchError> {
        let params = [
            ("artist", query.to_string()),
            ("limit", limit.to_string()),
            ("page", page.to_string()),
        ];
        let body = self.call("artist.search", &params).await?;
        normalize_artists(body)
    }
}
