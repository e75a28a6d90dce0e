//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own database.

use super::constants::*;
use musicboxd_server::identity::UserStore;
use musicboxd_server::search::{LastFmSearchProvider, NoOpSearchProvider, SearchProvider};
use musicboxd_server::server::{make_sqlite_app, RequestsLoggingLevel, ServerConfig};
use musicboxd_server::store::SqliteStore;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with an isolated database
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Store for direct database access in tests
    pub store: Arc<SqliteStore>,

    /// Token of the user with TEST_USER_EMAIL
    pub user_token: String,

    /// Token of the user with OTHER_USER_EMAIL
    pub other_token: String,

    /// Ids of the seeded PRESET_TAGS, in the same order
    pub preset_tag_ids: Vec<i64>,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port with search disabled
    pub async fn spawn() -> Self {
        Self::spawn_with_search(Arc::new(NoOpSearchProvider)).await
    }

    /// Spawns a test server whose search talks to a Last.fm compatible API at `base_url`
    #[allow(dead_code)]
    pub async fn spawn_with_lastfm(base_url: &str) -> Self {
        let provider = LastFmSearchProvider::new("test-api-key", base_url)
            .expect("Failed to build Last.fm provider");
        Self::spawn_with_search(Arc::new(provider)).await
    }

    /// Spawns a new test server
    ///
    /// This function:
    /// 1. Creates a temporary database with two users, their tokens and the preset tags
    /// 2. Binds to a random port (127.0.0.1:0)
    /// 3. Spawns the server in a background task
    /// 4. Waits for the server to be ready
    ///
    /// # Panics
    ///
    /// Panics if database seeding, port binding or server startup fails.
    pub async fn spawn_with_search(search: Arc<dyn SearchProvider>) -> Self {
        let temp_db_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(
            SqliteStore::new(temp_db_dir.path().join("musicboxd.db"))
                .expect("Failed to open store"),
        );

        let user_token = seed_user(&store, TEST_USER_EMAIL);
        let other_token = seed_user(&store, OTHER_USER_EMAIL);
        let preset_tag_ids = PRESET_TAGS
            .iter()
            .map(|(category, name)| {
                store
                    .add_preset_tag(category, name)
                    .expect("Failed to seed preset tag")
                    .id
            })
            .collect();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            max_page_size: TEST_MAX_PAGE_SIZE,
            default_page_size: TEST_MAX_PAGE_SIZE,
            ..Default::default()
        };

        let app = make_sqlite_app(config, store.clone(), search).expect("Failed to build app");

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            store,
            user_token,
            other_token,
            preset_tag_ids,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

fn seed_user(store: &SqliteStore, email: &str) -> String {
    let user = store.create_user(email).expect("Failed to create user");
    let token = store
        .issue_auth_token(&user.id)
        .expect("Failed to issue token");
    token.value.0
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // Send shutdown signal
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
