//! An in-process key-value server speaking the protocol the load generator targets.
//!
//! ```
//! use kvload_test::server::TestServer;
//!
//! #[tokio::main]
//! async fn main() {
//!    let server = TestServer::new().await;
//!    let url = server.url("/read?key=1");
//!    // point the load generator at `server.base_url()`...
//! }
//! ```
//!
//! The server answers like the production service:
//!
//! - `POST /create?key=<int>&value=<string>` stores the value and returns `200`.
//! - `GET /read?key=<int>` returns `200` with the value, or `404` with `Key not found`.
//! - Missing or non-numeric parameters return `400`.

use std::collections::HashMap;
use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Query, State};
use axum::http::{Method, StatusCode};
use axum::routing::{get, post};
use serde::Deserialize;

/// A request as seen by the [`TestServer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedRequest {
    /// HTTP method of the request.
    pub method: Method,
    /// Path without the query string.
    pub path: String,
    /// The `key` query parameter, if present and numeric.
    pub key: Option<i64>,
    /// The `value` query parameter, if present.
    pub value: Option<String>,
}

#[derive(Debug, Default)]
struct Store {
    values: HashMap<i64, String>,
    log: Vec<RecordedRequest>,
}

type SharedStore = Arc<Mutex<Store>>;

#[derive(Debug, Deserialize)]
struct KvParams {
    key: Option<String>,
    value: Option<String>,
}

impl KvParams {
    fn key(&self) -> Option<i64> {
        self.key.as_deref()?.parse().ok()
    }
}

/// An in-process test server for use in integration tests.
///
/// Stores values in memory and keeps a log of every request it received. It listens on a random
/// available port on localhost and stops when dropped.
#[derive(Debug)]
pub struct TestServer {
    handle: tokio::task::JoinHandle<()>,
    socket: SocketAddr,
    store: SharedStore,
}

impl TestServer {
    /// Starts a server with an empty store.
    pub async fn new() -> Self {
        Self::with_values([]).await
    }

    /// Starts a server with the given keys already stored.
    pub async fn with_values(values: impl IntoIterator<Item = (i64, String)>) -> Self {
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let listener = TcpListener::bind(addr).unwrap();
        listener.set_nonblocking(true).unwrap();
        let socket = listener.local_addr().unwrap();

        let store = SharedStore::default();
        store.lock().unwrap().values.extend(values);

        let app = router(store.clone());
        let handle = tokio::spawn(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            handle,
            socket,
            store,
        }
    }

    /// Returns the origin of this server, suitable as `BASE_URL`.
    ///
    /// This URL uses `localhost` as hostname.
    pub fn base_url(&self) -> String {
        format!("http://localhost:{}", self.socket.port())
    }

    /// Returns a full URL pointing to the given path.
    pub fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("{}/{}", self.base_url(), path)
    }

    /// All requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.store.lock().unwrap().log.clone()
    }

    /// The value currently stored under `key`.
    pub fn value(&self, key: i64) -> Option<String> {
        self.store.lock().unwrap().values.get(&key).cloned()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn router(store: SharedStore) -> Router {
    Router::new()
        .route("/create", post(create))
        .route("/read", get(read))
        .with_state(store)
}

fn record(store: &mut Store, method: Method, path: &str, params: &KvParams) {
    store.log.push(RecordedRequest {
        method,
        path: path.to_owned(),
        key: params.key(),
        value: params.value.clone(),
    });
}

async fn create(
    State(store): State<SharedStore>,
    Query(params): Query<KvParams>,
) -> (StatusCode, String) {
    let mut store = store.lock().unwrap();
    record(&mut store, Method::POST, "/create", &params);

    let (Some(key), Some(value)) = (params.key(), params.value) else {
        return (
            StatusCode::BAD_REQUEST,
            "Missing key or value parameter".to_owned(),
        );
    };

    store.values.insert(key, value);
    (StatusCode::OK, "OK".to_owned())
}

async fn read(
    State(store): State<SharedStore>,
    Query(params): Query<KvParams>,
) -> (StatusCode, String) {
    let mut store = store.lock().unwrap();
    record(&mut store, Method::GET, "/read", &params);

    let Some(key) = params.key() else {
        return (StatusCode::BAD_REQUEST, "Missing key parameter".to_owned());
    };

    match store.values.get(&key) {
        Some(value) => (StatusCode::OK, value.clone()),
        None => (StatusCode::NOT_FOUND, "Key not found".to_owned()),
    }
}
