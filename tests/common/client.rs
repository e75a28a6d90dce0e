//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all musicboxd endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

/// HTTP test client, optionally presenting a bearer token on every request
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    /// Creates a new unauthenticated client
    pub fn new(base_url: String) -> Self {
        Self::with_headers(base_url, HeaderMap::new())
    }

    /// Creates a client that sends `Authorization: Bearer <token>`
    pub fn authenticated(base_url: String, token: &str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).expect("Invalid token"),
        );
        Self::with_headers(base_url, headers)
    }

    /// Creates a client that sends the token in the session cookie instead
    pub fn with_session_cookie(base_url: String, token: &str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::COOKIE,
            HeaderValue::from_str(&format!("session_token={}", token)).expect("Invalid token"),
        );
        Self::with_headers(base_url, headers)
    }

    fn with_headers(base_url: String, headers: HeaderMap) -> Self {
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    async fn post_json(&self, path: &str, body: &Value) -> Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("POST request failed")
    }

    async fn delete(&self, path: &str) -> Response {
        self.client
            .delete(self.url(path))
            .send()
            .await
            .expect("DELETE request failed")
    }

    // ========================================================================
    // Server
    // ========================================================================

    /// GET /
    pub async fn home(&self) -> Response {
        self.get("/").await
    }

    // ========================================================================
    // Authentication Endpoints
    // ========================================================================

    /// GET /v1/auth/session
    pub async fn get_session(&self) -> Response {
        self.get("/v1/auth/session").await
    }

    /// POST /v1/auth/logout
    pub async fn logout(&self) -> Response {
        self.client
            .post(self.url("/v1/auth/logout"))
            .send()
            .await
            .expect("Logout request failed")
    }

    // ========================================================================
    // Tag Endpoints
    // ========================================================================

    /// GET /v1/tags/preset
    pub async fn list_preset_tags(&self) -> Response {
        self.get("/v1/tags/preset").await
    }

    /// GET /v1/tags/custom
    pub async fn list_custom_tags(&self) -> Response {
        self.get("/v1/tags/custom").await
    }

    /// POST /v1/tags/custom
    pub async fn create_custom_tag(&self, name: &str) -> Response {
        self.post_json("/v1/tags/custom", &json!({ "name": name }))
            .await
    }

    /// Creates a custom tag and returns its id
    ///
    /// # Panics
    ///
    /// Panics if the server does not answer 201.
    pub async fn create_custom_tag_id(&self, name: &str) -> i64 {
        let response = self.create_custom_tag(name).await;
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        let body: Value = response.json().await.expect("Invalid JSON");
        body["id"].as_i64().expect("Custom tag without id")
    }

    // ========================================================================
    // Track Log Endpoints
    // ========================================================================

    /// POST /v1/logs/tracks
    pub async fn log_track(&self, body: Value) -> Response {
        self.post_json("/v1/logs/tracks", &body).await
    }

    /// GET /v1/logs/tracks
    pub async fn list_track_logs(&self, limit: Option<usize>, offset: Option<usize>) -> Response {
        self.get(&format!("/v1/logs/tracks{}", page_query(limit, offset)))
            .await
    }

    /// DELETE /v1/logs/tracks/{id}
    pub async fn delete_track_log(&self, id: i64) -> Response {
        self.delete(&format!("/v1/logs/tracks/{}", id)).await
    }

    /// POST /v1/logs/tracks/{id}/tags
    pub async fn tag_track_log(&self, id: i64, preset_ids: &[i64], custom_ids: &[i64]) -> Response {
        self.post_json(
            &format!("/v1/logs/tracks/{}/tags", id),
            &json!({ "preset_tag_ids": preset_ids, "custom_tag_ids": custom_ids }),
        )
        .await
    }

    // ========================================================================
    // Artist Log Endpoints
    // ========================================================================

    /// POST /v1/logs/artists
    pub async fn log_artist(&self, body: Value) -> Response {
        self.post_json("/v1/logs/artists", &body).await
    }

    /// GET /v1/logs/artists
    pub async fn list_artist_logs(&self, limit: Option<usize>, offset: Option<usize>) -> Response {
        self.get(&format!("/v1/logs/artists{}", page_query(limit, offset)))
            .await
    }

    /// DELETE /v1/logs/artists/{id}
    pub async fn delete_artist_log(&self, id: i64) -> Response {
        self.delete(&format!("/v1/logs/artists/{}", id)).await
    }

    /// POST /v1/logs/artists/{id}/tags
    pub async fn tag_artist_log(
        &self,
        id: i64,
        preset_ids: &[i64],
        custom_ids: &[i64],
    ) -> Response {
        self.post_json(
            &format!("/v1/logs/artists/{}/tags", id),
            &json!({ "preset_tag_ids": preset_ids, "custom_tag_ids": custom_ids }),
        )
        .await
    }

    // ========================================================================
    // Search Endpoints
    // ========================================================================

    /// GET /v1/search/tracks with raw query string
    pub async fn search_tracks(&self, query_string: &str) -> Response {
        self.get(&format!("/v1/search/tracks?{}", query_string))
            .await
    }

    /// GET /v1/search/artists with raw query string
    pub async fn search_artists(&self, query_string: &str) -> Response {
        self.get(&format!("/v1/search/artists?{}", query_string))
            .await
    }
}

fn page_query(limit: Option<usize>, offset: Option<usize>) -> String {
    let mut params = Vec::new();
    if let Some(limit) = limit {
        params.push(format!("limit={}", limit));
    }
    if let Some(offset) = offset {
        params.push(format!("offset={}", offset));
    }
    if params.is_empty() {
        String::new()
    } else {
        format!("?{}", params.join("&"))
    }
}
