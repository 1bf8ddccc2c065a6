// Read API: serves the files written by the monitors. Stateless apart from config.

mod http;

use axum::{Router, routing::get};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) save_dir: Arc<PathBuf>,
    pub(crate) servers: Arc<Vec<String>>,
}

impl AppState {
    pub(crate) fn is_registered(&self, server: &str) -> bool {
        self.servers.iter().any(|s| s == server)
    }
}

pub fn app(save_dir: impl Into<PathBuf>, servers: Vec<String>) -> Router {
    let state = AppState {
        save_dir: Arc::new(save_dir.into()),
        servers: Arc::new(servers),
    };
    Router::new()
        .route("/", get(http::index_handler)) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/{server}", get(http::server_handler)) // GET /{server}
        .route("/{server}/current_map", get(http::current_map_handler)) // GET /{server}/current_map
        .route("/{server}/maps/{map}", get(http::map_handler)) // GET /{server}/maps/{map}
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
