//! A stand-in for the Last.fm API
//!
//! Answers `track.search` and `artist.search` with canned bodies and records
//! every query it receives. The query `fail` gets an error envelope with a
//! 200 status, `forbidden` the same envelope with a 403.

use axum::{extract::Query, extract::State, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

type Requests = Arc<Mutex<Vec<HashMap<String, String>>>>;

pub struct MockLastFm {
    /// Value to pass as the provider base URL
    pub base_url: String,
    requests: Requests,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

async fn answer(
    State(requests): State<Requests>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    let method = params.get("method").cloned().unwrap_or_default();
    let query = params
        .get("track")
        .or_else(|| params.get("artist"))
        .cloned()
        .unwrap_or_default();
    requests.lock().unwrap().push(params);

    if query == "fail" {
        return (
            StatusCode::OK,
            Json(json!({"error": 6, "message": "Invalid parameters"})),
        );
    }
    if query == "forbidden" {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": 10, "message": "Invalid API key"})),
        );
    }

    let body = match method.as_str() {
        "track.search" => Json(json!({
            "results": {
                "trackmatches": {
                    "track": [
                        {
                            "name": "Starlight",
                            "artist": "Muse",
                            "mbid": "",
                            "url": "https://www.last.fm/music/Muse/_/Starlight",
                            "listeners": "1200"
                        },
                        {"name": "", "artist": "Nobody"},
                        {"name": "Uprising", "artist": "Muse", "mbid": "mbid-uprising"}
                    ]
                }
            }
        })),
        "artist.search" => Json(json!({
            "results": {
                "artistmatches": {
                    "artist": {
                        "name": "AC/DC",
                        "mbid": "",
                        "listeners": "99"
                    }
                }
            }
        })),
        _ => Json(json!({"error": 3, "message": "Invalid Method"})),
    };
    (StatusCode::OK, body)
}

impl MockLastFm {
    pub async fn spawn() -> Self {
        let requests: Requests = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/2.0/", get(answer))
            .with_state(requests.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Mock Last.fm failed");
        });

        Self {
            base_url: format!("http://127.0.0.1:{}/2.0/", port),
            requests,
            _shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Query parameters of every request received so far
    pub fn requests(&self) -> Vec<HashMap<String, String>> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for MockLastFm {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
