//! Completion tracker endpoint
//!
//! Completion is count-based: a candidate is complete when all 14 distinct
//! session numbers exist in the store, regardless of block content.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use trialog_common::db::sessions;
use trialog_common::model::{compute_progress, MAX_SESSIONS};

use super::{ApiResult, AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResponse {
    candidate_name: String,
    session_count: usize,
    max_sessions: u8,
    progress: f64,
    complete: bool,
}

/// GET /api/completion/:candidate
pub async fn status(
    State(state): State<AppState>,
    Path(candidate): Path<String>,
) -> ApiResult<Json<CompletionResponse>> {
    let numbers = sessions::session_numbers(&state.db, &candidate).await?;
    let session_count = numbers.len();
    Ok(Json(CompletionResponse {
        candidate_name: candidate,
        session_count,
        max_sessions: MAX_SESSIONS,
        progress: compute_progress(session_count),
        complete: session_count == MAX_SESSIONS as usize,
    }))
}
