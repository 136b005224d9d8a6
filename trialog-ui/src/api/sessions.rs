//! Session editor endpoints
//!
//! Thin HTTP shims over the editor state machine; all sequencing, dirty
//! tracking and persist discipline lives in `crate::editor`.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use trialog_common::{Error, SessionData, MAX_SESSIONS};

use super::{ApiResult, AppState};
use crate::editor::{EditorSnapshot, FieldPath, LoadOutcome};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    session: SessionData,
    dirty_fields: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldEditRequest {
    pub candidate_name: String,
    pub session_number: u8,
    pub field: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    status: String,
    complete: bool,
}

#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    /// -1 for previous, +1 for next
    pub delta: i8,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

pub(crate) fn session_response(state: &AppState, session: SessionData) -> SessionResponse {
    let dirty_fields = state
        .cache
        .dirty_fields(&session.candidate_name, session.session_number);
    SessionResponse {
        session,
        dirty_fields,
    }
}

/// GET /api/session/:candidate/:number (load or synthesize)
pub async fn load(
    State(state): State<AppState>,
    Path((candidate, number)): Path<(String, u8)>,
) -> ApiResult<Json<SessionResponse>> {
    match state.editor.load(&candidate, number).await? {
        LoadOutcome::Loaded(session) => Ok(Json(session_response(&state, session))),
        // A newer load superseded this one while it was in flight
        LoadOutcome::Stale => Err(Error::InvalidInput(
            "load superseded by later navigation".into(),
        )
        .into()),
    }
}

/// POST /api/session/field (single-field edit, debounced persist)
pub async fn edit_field(
    State(state): State<AppState>,
    Json(request): Json<FieldEditRequest>,
) -> ApiResult<Json<EditorSnapshot>> {
    if request.session_number < 1 || request.session_number > MAX_SESSIONS {
        return Err(Error::InvalidInput(format!(
            "session number {} out of range 1..={MAX_SESSIONS}",
            request.session_number
        ))
        .into());
    }
    let field = FieldPath::parse(&request.field)?;
    state
        .editor
        .edit_field(
            &request.candidate_name,
            request.session_number,
            field,
            &request.value,
        )
        .await?;
    Ok(Json(state.editor.snapshot().await))
}

/// POST /api/session/save (full-payload upsert)
pub async fn save(
    State(state): State<AppState>,
    Json(payload): Json<SessionData>,
) -> ApiResult<Json<SaveResponse>> {
    let complete = state.editor.save(payload).await?;
    Ok(Json(SaveResponse {
        status: "ok".to_string(),
        complete,
    }))
}

/// POST /api/session/navigate (prev/next with flush, clamped to [1, 14])
pub async fn navigate(
    State(state): State<AppState>,
    Json(request): Json<NavigateRequest>,
) -> ApiResult<Json<SessionResponse>> {
    match state.editor.navigate(request.delta).await? {
        LoadOutcome::Loaded(session) => Ok(Json(session_response(&state, session))),
        LoadOutcome::Stale => Err(Error::InvalidInput(
            "load superseded by later navigation".into(),
        )
        .into()),
    }
}

/// POST /api/shift/complete
pub async fn complete_shift(
    State(state): State<AppState>,
) -> ApiResult<Json<StatusResponse>> {
    state.editor.complete_shift().await?;
    Ok(Json(StatusResponse {
        status: "ok".to_string(),
    }))
}

/// GET /api/editor/state (machine state plus unsynced fields)
pub async fn editor_state(State(state): State<AppState>) -> Json<EditorSnapshot> {
    Json(state.editor.snapshot().await)
}
