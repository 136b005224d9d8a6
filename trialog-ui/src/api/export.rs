//! Export and share endpoints
//!
//! Exports read the stored session directly (the editor is not involved);
//! an absent row exports as the synthesized empty session, matching what
//! the operator would see on load.

use axum::{
    extract::{Path, State},
    http::header,
    Json,
};
use chrono::Utc;
use serde::Serialize;

use trialog_common::db::sessions;
use trialog_common::{format, report, Error, SessionData, MAX_SESSIONS};

use super::{ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct ShareResponse {
    link: String,
}

async fn fetch_or_empty(
    state: &AppState,
    candidate: &str,
    number: u8,
) -> ApiResult<SessionData> {
    if number < 1 || number > MAX_SESSIONS {
        return Err(Error::InvalidInput(format!(
            "session number {number} out of range 1..={MAX_SESSIONS}"
        ))
        .into());
    }
    let session = sessions::get_session(&state.db, candidate, number)
        .await?
        .unwrap_or_else(|| SessionData::empty(candidate, number));
    Ok(session)
}

/// GET /api/export/text/:candidate/:number
pub async fn text(
    State(state): State<AppState>,
    Path((candidate, number)): Path<(String, u8)>,
) -> ApiResult<String> {
    let session = fetch_or_empty(&state, &candidate, number).await?;
    Ok(format::format_session_text(&session))
}

/// GET /api/export/share/:candidate/:number
pub async fn share(
    State(state): State<AppState>,
    Path((candidate, number)): Path<(String, u8)>,
) -> ApiResult<Json<ShareResponse>> {
    let session = fetch_or_empty(&state, &candidate, number).await?;
    Ok(Json(ShareResponse {
        link: format::share_link(&session),
    }))
}

/// GET /api/export/document/:candidate/:number (text/plain download)
pub async fn document(
    State(state): State<AppState>,
    Path((candidate, number)): Path<(String, u8)>,
) -> ApiResult<([(header::HeaderName, String); 2], String)> {
    let session = fetch_or_empty(&state, &candidate, number).await?;
    let doc = report::generate_document(&session, Utc::now().date_naive());
    let filename = format!(
        "{}_session_{:02}.txt",
        session.candidate_name.replace(' ', "_"),
        session.session_number
    );
    Ok((
        [
            (
                header::CONTENT_TYPE,
                "text/plain; charset=utf-8".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        doc.render(),
    ))
}
