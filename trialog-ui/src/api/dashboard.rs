//! Dashboard rollup endpoint
//!
//! One aggregate over the whole session store: per candidate the session
//! count, progress percentage, completion band and per-session completed
//! block counts, sorted by session count descending. The SSE stream tells
//! the dashboard when to refetch this.

use std::collections::BTreeMap;

use axum::{extract::State, Json};
use serde::Serialize;

use trialog_common::db::sessions;
use trialog_common::model::{compute_progress, is_qualified, CompletionBand};
use trialog_common::SessionData;

use super::{ApiResult, AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    session_number: u8,
    completed_blocks: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRollup {
    name: String,
    session_count: usize,
    progress: f64,
    #[serde(flatten)]
    band: CompletionBand,
    qualified: bool,
    sessions: Vec<SessionSummary>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    candidates: Vec<CandidateRollup>,
}

pub(crate) fn build_rollup(all: Vec<SessionData>) -> Vec<CandidateRollup> {
    let mut grouped: BTreeMap<String, Vec<SessionData>> = BTreeMap::new();
    for session in all {
        grouped
            .entry(session.candidate_name.clone())
            .or_default()
            .push(session);
    }

    let mut rollup: Vec<CandidateRollup> = grouped
        .into_iter()
        .map(|(name, mut group)| {
            group.sort_by_key(|s| s.session_number);
            let session_count = group.len();
            CandidateRollup {
                name,
                session_count,
                progress: compute_progress(session_count),
                band: CompletionBand::for_session_count(session_count),
                qualified: is_qualified(session_count),
                sessions: group
                    .iter()
                    .map(|s| SessionSummary {
                        session_number: s.session_number,
                        completed_blocks: s.completed_block_count(),
                    })
                    .collect(),
            }
        })
        .collect();

    // BTreeMap iteration already gave a name order; make count the primary key
    rollup.sort_by(|a, b| b.session_count.cmp(&a.session_count).then(a.name.cmp(&b.name)));
    rollup
}

/// GET /api/dashboard
pub async fn rollup(State(state): State<AppState>) -> ApiResult<Json<DashboardResponse>> {
    let all = sessions::load_all(&state.db).await?;
    Ok(Json(DashboardResponse {
        candidates: build_rollup(all),
    }))
}
