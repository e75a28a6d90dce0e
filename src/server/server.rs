use anyhow::{Context, Result};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::{error, info, warn};

use axum_extra::extract::cookie::{Cookie, SameSite};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::metrics::{self, metrics_handler};
use super::session::COOKIE_SESSION_TOKEN_KEY;
use super::{log_requests, state::*, ServerConfig};
use crate::error::ServiceError;
use crate::identity::{require_identity, IdentityProvider, OwnerClaim, UserStore};
use crate::logs::{
    ArtistLogs, LogBook, LogFamily, LogManager, LogPayload, LogStore, NewArtistLog, NewTrackLog,
    PageRange, TrackLogs,
};
use crate::outcome::Outcome;
use crate::search::{SearchError, SearchProvider};
use crate::store::SqliteStore;
use crate::tags::{TagCatalog, TagStore};

pub const MAX_SEARCH_LIMIT: u32 = 50;
pub const DEFAULT_SEARCH_LIMIT: u32 = 10;

#[derive(Serialize)]
struct ServerStats {
    pub version: &'static str,
    pub uptime: String,
    pub hash: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::StoreRejected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            metrics::record_error("store_rejected");
        }
        error_response(status, self.to_string())
    }
}

impl IntoResponse for SearchError {
    fn into_response(self) -> Response {
        metrics::record_error("search_provider");
        error_response(StatusCode::BAD_GATEWAY, self.to_string())
    }
}

/// Counts every warning before handing the outcome to the client.
fn outcome_response<T: Serialize>(status: StatusCode, outcome: Outcome<T>) -> Response {
    for warning in &outcome.warnings {
        metrics::record_degradation(warning.kind());
    }
    (status, Json(outcome)).into_response()
}

#[derive(Deserialize, Debug, Default)]
struct ListLogsParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ListLogsParams {
    fn page_range(&self, config: &ServerConfig) -> PageRange {
        let limit = self
            .limit
            .unwrap_or(config.default_page_size)
            .clamp(1, config.max_page_size.max(1));
        PageRange::new(limit, self.offset.unwrap_or(0))
    }
}

#[derive(Deserialize, Debug)]
struct CreateCustomTagBody {
    pub name: String,
}

#[derive(Deserialize, Debug)]
struct AttachTagsBody {
    #[serde(default, alias = "tagIds")]
    pub preset_tag_ids: Vec<i64>,
    #[serde(default, alias = "customTagIds")]
    pub custom_tag_ids: Vec<i64>,
}

#[derive(Serialize)]
struct DeleteLogResponse {
    deleted: bool,
}

#[derive(Deserialize, Debug, Default)]
struct SearchParams {
    pub q: Option<String>,
    pub artist: Option<String>,
    pub limit: Option<u32>,
    pub page: Option<u32>,
}

struct ValidSearch {
    query: String,
    artist: Option<String>,
    limit: u32,
    page: u32,
}

impl SearchParams {
    fn validate(self) -> Result<ValidSearch, ServiceError> {
        let query = self
            .q
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .ok_or_else(|| {
                ServiceError::InvalidInput("Query parameter q is required".to_string())
            })?;
        let limit = self.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
        if !(1..=MAX_SEARCH_LIMIT).contains(&limit) {
            return Err(ServiceError::InvalidInput(format!(
                "limit must be between 1 and {}",
                MAX_SEARCH_LIMIT
            )));
        }
        let page = self.page.unwrap_or(1);
        if page < 1 {
            return Err(ServiceError::InvalidInput(
                "page must be at least 1".to_string(),
            ));
        }
        Ok(ValidSearch {
            query,
            artist: self
                .artist
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty()),
            limit,
            page,
        })
    }
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        version: env!("CARGO_PKG_VERSION"),
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
    };
    Json(stats)
}

async fn get_session(
    claim: OwnerClaim,
    State(identity): State<GuardedIdentityProvider>,
) -> Response {
    match require_identity(identity.as_ref(), &claim, "view your session").await {
        Ok(identity) => Json(identity).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn logout(claim: OwnerClaim, State(user_store): State<GuardedUserStore>) -> Response {
    let Some(token) = claim.token() else {
        return ServiceError::Unauthenticated("sign out").into_response();
    };
    match user_store.revoke_auth_token(token) {
        Ok(Some(revoked)) => {
            info!("User {} signed out", revoked.user_id);
            let cookie = Cookie::build(Cookie::new(COOKIE_SESSION_TOKEN_KEY, ""))
                .path("/")
                .expires(time::OffsetDateTime::now_utc() - time::Duration::days(1))
                .same_site(SameSite::Lax)
                .build();
            (
                StatusCode::OK,
                [(header::SET_COOKIE, cookie.to_string())],
            )
                .into_response()
        }
        Ok(None) => ServiceError::Unauthenticated("sign out").into_response(),
        Err(err) => ServiceError::store_rejected(&err, "Failed to sign out").into_response(),
    }
}

async fn list_preset_tags(State(tags): State<GuardedTagCatalog>) -> Response {
    match tags.list_preset_tags().await {
        Ok(tags) => Json(tags).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn list_custom_tags(claim: OwnerClaim, State(tags): State<GuardedTagCatalog>) -> Response {
    match tags.list_custom_tags(&claim).await {
        Ok(tags) => Json(tags).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn post_custom_tag(
    claim: OwnerClaim,
    State(tags): State<GuardedTagCatalog>,
    Json(body): Json<CreateCustomTagBody>,
) -> Response {
    match tags.create_custom_tag(&claim, &body.name).await {
        Ok(tag) => (StatusCode::CREATED, Json(tag)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn list_logs<F: LogFamily>(
    book: &LogBook<F>,
    config: &ServerConfig,
    claim: OwnerClaim,
    params: ListLogsParams,
) -> Response {
    match book.list_with_tags(&claim, params.page_range(config)).await {
        Ok(outcome) => outcome_response(StatusCode::OK, outcome),
        Err(err) => err.into_response(),
    }
}

async fn write_log<F: LogFamily>(
    book: &LogBook<F>,
    claim: OwnerClaim,
    payload: LogPayload<F::NewLog>,
) -> Response {
    match book.write(&claim, payload).await {
        Ok(outcome) => outcome_response(StatusCode::CREATED, outcome),
        Err(err) => err.into_response(),
    }
}

async fn delete_log<F: LogFamily>(book: &LogBook<F>, claim: OwnerClaim, id: i64) -> Response {
    match book.delete(&claim, id).await {
        Ok(deleted) => Json(DeleteLogResponse { deleted }).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn attach_tags<F: LogFamily>(
    book: &LogBook<F>,
    claim: OwnerClaim,
    id: i64,
    body: AttachTagsBody,
) -> Response {
    match book
        .attach_tags(&claim, id, &body.preset_tag_ids, &body.custom_tag_ids)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

async fn get_track_logs(
    claim: OwnerClaim,
    State(state): State<ServerState>,
    Query(params): Query<ListLogsParams>,
) -> Response {
    list_logs(state.log_manager.tracks(), &state.config, claim, params).await
}

async fn post_track_log(
    claim: OwnerClaim,
    State(logs): State<GuardedLogManager>,
    Json(payload): Json<LogPayload<NewTrackLog>>,
) -> Response {
    write_log(logs.tracks(), claim, payload).await
}

async fn delete_track_log(
    claim: OwnerClaim,
    State(logs): State<GuardedLogManager>,
    Path(id): Path<i64>,
) -> Response {
    delete_log(logs.tracks(), claim, id).await
}

async fn post_track_log_tags(
    claim: OwnerClaim,
    State(logs): State<GuardedLogManager>,
    Path(id): Path<i64>,
    Json(body): Json<AttachTagsBody>,
) -> Response {
    attach_tags(logs.tracks(), claim, id, body).await
}

async fn get_artist_logs(
    claim: OwnerClaim,
    State(state): State<ServerState>,
    Query(params): Query<ListLogsParams>,
) -> Response {
    list_logs(state.log_manager.artists(), &state.config, claim, params).await
}

async fn post_artist_log(
    claim: OwnerClaim,
    State(logs): State<GuardedLogManager>,
    Json(payload): Json<LogPayload<NewArtistLog>>,
) -> Response {
    write_log(logs.artists(), claim, payload).await
}

async fn delete_artist_log(
    claim: OwnerClaim,
    State(logs): State<GuardedLogManager>,
    Path(id): Path<i64>,
) -> Response {
    delete_log(logs.artists(), claim, id).await
}

async fn post_artist_log_tags(
    claim: OwnerClaim,
    State(logs): State<GuardedLogManager>,
    Path(id): Path<i64>,
    Json(body): Json<AttachTagsBody>,
) -> Response {
    attach_tags(logs.artists(), claim, id, body).await
}

async fn search_tracks(
    State(search): State<GuardedSearchProvider>,
    Query(params): Query<SearchParams>,
) -> Response {
    let params = match params.validate() {
        Ok(params) => params,
        Err(err) => return err.into_response(),
    };
    match search
        .search_tracks(
            &params.query,
            params.artist.as_deref(),
            params.limit,
            params.page,
        )
        .await
    {
        Ok(results) => {
            metrics::record_search("tracks", "ok");
            Json(results).into_response()
        }
        Err(err) => {
            warn!("Track search for {:?} failed: {}", params.query, err);
            metrics::record_search("tracks", "error");
            err.into_response()
        }
    }
}

async fn search_artists(
    State(search): State<GuardedSearchProvider>,
    Query(params): Query<SearchParams>,
) -> Response {
    let params = match params.validate() {
        Ok(params) => params,
        Err(err) => return err.into_response(),
    };
    match search
        .search_artists(&params.query, params.limit, params.page)
        .await
    {
        Ok(results) => {
            metrics::record_search("artists", "ok");
            Json(results).into_response()
        }
        Err(err) => {
            warn!("Artist search for {:?} failed: {}", params.query, err);
            metrics::record_search("artists", "error");
            err.into_response()
        }
    }
}

impl ServerState {
    fn new(
        config: ServerConfig,
        identity: GuardedIdentityProvider,
        user_store: GuardedUserStore,
        tag_store: Arc<dyn TagStore>,
        track_store: Arc<dyn LogStore<TrackLogs>>,
        artist_store: Arc<dyn LogStore<ArtistLogs>>,
        search: GuardedSearchProvider,
    ) -> ServerState {
        let log_manager = LogManager::new(
            identity.clone(),
            tag_store.clone(),
            track_store,
            artist_store,
        );
        let tag_catalog = TagCatalog::new(identity.clone(), tag_store);
        ServerState {
            config,
            start_time: Instant::now(),
            hash: env!("GIT_HASH").to_owned(),
            identity,
            user_store,
            log_manager: Arc::new(log_manager),
            tag_catalog: Arc::new(tag_catalog),
            search,
        }
    }
}

fn make_cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).with_context(|| format!("Invalid CORS origin {}", origin))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]))
}

pub fn make_app(
    config: ServerConfig,
    identity: GuardedIdentityProvider,
    user_store: GuardedUserStore,
    tag_store: Arc<dyn TagStore>,
    track_store: Arc<dyn LogStore<TrackLogs>>,
    artist_store: Arc<dyn LogStore<ArtistLogs>>,
    search: GuardedSearchProvider,
) -> Result<Router> {
    let state = ServerState::new(
        config.clone(),
        identity,
        user_store,
        tag_store,
        track_store,
        artist_store,
        search,
    );

    let auth_routes: Router = Router::new()
        .route("/session", get(get_session))
        .route("/logout", post(logout))
        .with_state(state.clone());

    let tag_routes: Router = Router::new()
        .route("/preset", get(list_preset_tags))
        .route("/custom", get(list_custom_tags).post(post_custom_tag))
        .with_state(state.clone());

    let log_routes: Router = Router::new()
        .route("/tracks", get(get_track_logs).post(post_track_log))
        .route("/tracks/{id}", delete(delete_track_log))
        .route("/tracks/{id}/tags", post(post_track_log_tags))
        .route("/artists", get(get_artist_logs).post(post_artist_log))
        .route("/artists/{id}", delete(delete_artist_log))
        .route("/artists/{id}/tags", post(post_artist_log_tags))
        .with_state(state.clone());

    let search_routes: Router = Router::new()
        .route("/tracks", get(search_tracks))
        .route("/artists", get(search_artists))
        .with_state(state.clone());

    let home_router: Router = match &config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    let mut app: Router = home_router
        .nest("/v1/auth", auth_routes)
        .nest("/v1/tags", tag_routes)
        .nest("/v1/logs", log_routes)
        .nest("/v1/search", search_routes);

    if !config.cors_origins.is_empty() {
        app = app.layer(make_cors_layer(&config.cors_origins)?);
    }
    app = app.layer(middleware::from_fn_with_state(state.clone(), log_requests));

    Ok(app)
}

/// Wires every store seam to the same SQLite database.
pub fn make_sqlite_app(
    config: ServerConfig,
    store: Arc<SqliteStore>,
    search: GuardedSearchProvider,
) -> Result<Router> {
    make_app(
        config,
        store.clone() as Arc<dyn IdentityProvider>,
        store.clone() as Arc<dyn UserStore>,
        store.clone() as Arc<dyn TagStore>,
        store.clone() as Arc<dyn LogStore<TrackLogs>>,
        store as Arc<dyn LogStore<ArtistLogs>>,
        search,
    )
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutting down...");
}

pub async fn run_server(
    config: ServerConfig,
    metrics_port: u16,
    store: Arc<SqliteStore>,
    search: Arc<dyn SearchProvider>,
) -> Result<()> {
    let port = config.port;
    let app = make_sqlite_app(config, store, search)?;

    let metrics_app = Router::new().route("/metrics", get(metrics_handler));
    let metrics_listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;
    tokio::spawn(async move {
        if let Err(err) = axum::serve(metrics_listener, metrics_app).await {
            error!("Metrics server stopped: {}", err);
        }
    });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
