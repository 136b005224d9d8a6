//! REST API implementation for the operator UI service
//!
//! All session, candidate, export and dashboard endpoints plus the SSE
//! event stream live here. Handlers return `ApiResult<T>`; `ApiError`
//! maps store/validation errors onto status codes with a JSON body.

pub mod candidates;
pub mod completion;
pub mod dashboard;
pub mod export;
pub mod sessions;
pub mod ui;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use trialog_common::events::EventBus;
use trialog_common::Error;

use crate::cache::DraftCache;
use crate::editor::Editor;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub bus: Arc<EventBus>,
    pub cache: Arc<DraftCache>,
    pub editor: Editor,
    pub port: u16,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Embedded operator UI
        .route("/", get(ui::index))
        .route("/app.js", get(ui::app_js))
        // Health check
        .route("/health", get(health_check))
        // Candidate registry
        .route("/api/candidates", get(candidates::list))
        .route("/api/candidates", post(candidates::add))
        .route("/api/candidates/select", post(candidates::select))
        // Session editor
        .route("/api/session/:candidate/:number", get(sessions::load))
        .route("/api/session/field", post(sessions::edit_field))
        .route("/api/session/save", post(sessions::save))
        .route("/api/session/navigate", post(sessions::navigate))
        .route("/api/shift/complete", post(sessions::complete_shift))
        .route("/api/editor/state", get(sessions::editor_state))
        // Completion tracker
        .route("/api/completion/:candidate", get(completion::status))
        // Export / share
        .route("/api/export/text/:candidate/:number", get(export::text))
        .route("/api/export/share/:candidate/:number", get(export::share))
        .route(
            "/api/export/document/:candidate/:number",
            get(export::document),
        )
        // Dashboard rollup + realtime events
        .route("/api/dashboard", get(dashboard::rollup))
        .route("/api/events", get(sse_events))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "module": "trialog-ui",
        "version": env!("CARGO_PKG_VERSION"),
        "port": state.port,
    }))
}

/// SSE event stream bridging the in-process bus to the dashboard
async fn sse_events(State(state): State<AppState>) -> impl IntoResponse {
    trialog_common::sse::event_bus_sse_stream(state.bus.clone(), "trialog-ui")
}

/// Error wrapper carrying status-code mapping for handlers
pub struct ApiError(Error);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({
            "status": "error",
            "message": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let not_found = ApiError(Error::NotFound("x".into())).into_response();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let invalid = ApiError(Error::InvalidInput("x".into())).into_response();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let internal = ApiError(Error::Internal("x".into())).into_response();
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
