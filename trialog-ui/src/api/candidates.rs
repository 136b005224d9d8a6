//! Candidate registry endpoints
//!
//! The visible candidate list is the union of a fixed seed roster and
//! every name observed in the session store. Registration is gated by the
//! settings-backed access code ("0" disables the check) and seeds the new
//! candidate's first session.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use trialog_common::db::{sessions, settings};
use trialog_common::events::TrialogEvent;
use trialog_common::Error;

use super::{ApiResult, AppState};
use crate::editor::LoadOutcome;

/// Roster shown before any sessions have been recorded
pub const SEED_CANDIDATES: [&str; 4] = ["Asha", "Divya", "Meera", "Ravi"];

#[derive(Debug, Serialize)]
pub struct CandidateListResponse {
    candidates: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCandidateRequest {
    pub name: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub shift: String,
    #[serde(default)]
    pub access_code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCandidateResponse {
    status: String,
    session_guid: Uuid,
}

/// GET /api/candidates
///
/// A store failure degrades to the seed roster rather than erroring.
pub async fn list(State(state): State<AppState>) -> Json<CandidateListResponse> {
    let observed = match sessions::distinct_candidates(&state.db).await {
        Ok(names) => names,
        Err(e) => {
            warn!("Candidate query failed, serving seed roster: {}", e);
            Vec::new()
        }
    };

    let mut candidates: Vec<String> = SEED_CANDIDATES.iter().map(|s| s.to_string()).collect();
    candidates.extend(observed);
    candidates.sort();
    candidates.dedup();

    Json(CandidateListResponse { candidates })
}

/// POST /api/candidates
pub async fn add(
    State(state): State<AppState>,
    Json(request): Json<AddCandidateRequest>,
) -> ApiResult<Json<AddCandidateResponse>> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("candidate name is required".into()).into());
    }

    let access_code = settings::get_access_code(&state.db).await?;
    if access_code != "0" && !access_code.is_empty() && request.access_code != access_code {
        return Err(Error::InvalidInput("invalid access code".into()).into());
    }

    let guid = sessions::create_session(&state.db, name, 1, Utc::now()).await?;
    info!(
        "Registered candidate {} (date: {}, shift: {})",
        name, request.date, request.shift
    );

    // New registrations start the editor at session 1
    state.cache.set_last_session(name, 1);
    state.editor.select_candidate(name).await?;

    state.bus.emit_lossy(TrialogEvent::CandidateAdded {
        candidate_name: name.to_string(),
        timestamp: Utc::now(),
    });

    Ok(Json(AddCandidateResponse {
        status: "ok".to_string(),
        session_guid: guid,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SelectCandidateRequest {
    pub name: String,
}

/// POST /api/candidates/select
///
/// Activate a candidate and restore their last-viewed session.
pub async fn select(
    State(state): State<AppState>,
    Json(request): Json<SelectCandidateRequest>,
) -> ApiResult<Json<crate::api::sessions::SessionResponse>> {
    match state.editor.select_candidate(&request.name).await? {
        LoadOutcome::Loaded(session) => {
            Ok(Json(crate::api::sessions::session_response(&state, session)))
        }
        LoadOutcome::Stale => Err(Error::InvalidInput(
            "load superseded by later navigation".into(),
        )
        .into()),
    }
}
