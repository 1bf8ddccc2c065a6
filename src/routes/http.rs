// GET handlers: index, version, per-server summary, current map, per-map stats

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::AppState;
use crate::history_repo::HistoryRepo;
use crate::version::{NAME, VERSION};

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!(message))).into_response()
}

/// Runs a read against the server's files on the blocking pool, mapping missing/unregistered servers.
async fn with_repo<T, F>(state: &AppState, server: String, read: F) -> Result<T, Response>
where
    T: Send + 'static,
    F: FnOnce(HistoryRepo) -> anyhow::Result<T> + Send + 'static,
{
    if !state.is_registered(&server) {
        return Err(error(
            StatusCode::FORBIDDEN,
            "Requested server not found or forbidden",
        ));
    }
    let save_dir = state.save_dir.clone();
    let result = tokio::task::spawn_blocking(move || {
        HistoryRepo::existing(save_dir.as_path(), &server).map(read)
    })
    .await;
    match result {
        Ok(Some(Ok(value))) => Ok(value),
        Ok(None) => Err(error(StatusCode::NOT_FOUND, "Requested server not found")),
        Ok(Some(Err(e))) => {
            tracing::warn!(error = %e, "read api: failed to load server data");
            Err(error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load data"))
        }
        Err(e) => {
            tracing::warn!(error = %e, "read api: load task panicked");
            Err(error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load data"))
        }
    }
}

/// GET /: API version and the servers it serves.
pub(super) async fn index_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "api_version": VERSION,
        "monitor_version": VERSION,
        "monitored_server_count": state.servers.len(),
        "monitored_servers": state.servers.as_ref(),
    }))
}

/// GET /version: returns service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

pub(super) async fn server_handler(
    State(state): State<AppState>,
    Path(server): Path<String>,
) -> Response {
    match with_repo(&state, server, |repo| repo.load_server_summary()).await {
        Ok(summary) => Json(summary).into_response(),
        Err(resp) => resp,
    }
}

pub(super) async fn current_map_handler(
    State(state): State<AppState>,
    Path(server): Path<String>,
) -> Response {
    match with_repo(&state, server, |repo| repo.load_current_map()).await {
        Ok(current) => Json(current).into_response(),
        Err(resp) => resp,
    }
}

pub(super) async fn map_handler(
    State(state): State<AppState>,
    Path((server, map)): Path<(String, String)>,
) -> Response {
    match with_repo(&state, server, move |repo| repo.load_map_stats(&map)).await {
        Ok(Some(stats)) => Json(stats).into_response(),
        Ok(None) => error(StatusCode::NOT_FOUND, "Requested map not found"),
        Err(resp) => resp,
    }
}
