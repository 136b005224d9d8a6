//! REST API implementation for the analyzer service

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{error, info};

use trialog_common::analysis;
use trialog_common::db::{analysis as analysis_db, sessions};
use trialog_common::SessionData;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub port: u16,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/analyze", post(analyze))
        .route("/api/analyses/:candidate", get(recent))
        .with_state(state)
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "module": "trialog-an",
        "version": env!("CARGO_PKG_VERSION"),
        "port": state.port,
    }))
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    success: bool,
    candidates: usize,
}

#[derive(Debug, Serialize)]
pub struct RecentResponse {
    analyses: Vec<analysis_db::AnalysisRecord>,
}

/// Run one summarization pass over every candidate in the store
pub async fn run_analysis(db: &SqlitePool) -> trialog_common::Result<usize> {
    let all = sessions::load_all(db).await?;
    let mut grouped: BTreeMap<String, Vec<SessionData>> = BTreeMap::new();
    for session in all {
        grouped
            .entry(session.candidate_name.clone())
            .or_default()
            .push(session);
    }

    let reports = analysis::analyze_all(&grouped);
    let count = reports.len();
    let now = Utc::now();
    for (candidate, report) in &reports {
        analysis_db::insert_analysis(db, candidate, report, now).await?;
    }
    info!("Summarization pass appended {} analysis rows", count);
    Ok(count)
}

/// POST /api/analyze
async fn analyze(
    State(state): State<AppState>,
) -> Result<Json<AnalyzeResponse>, (StatusCode, Json<serde_json::Value>)> {
    match run_analysis(&state.db).await {
        Ok(candidates) => Ok(Json(AnalyzeResponse {
            success: true,
            candidates,
        })),
        Err(e) => {
            error!("Summarization pass failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "message": e.to_string() })),
            ))
        }
    }
}

/// GET /api/analyses/:candidate (most recent rows, newest first)
async fn recent(
    State(state): State<AppState>,
    Path(candidate): Path<String>,
) -> Result<Json<RecentResponse>, (StatusCode, Json<serde_json::Value>)> {
    match analysis_db::recent_analyses(&state.db, &candidate, 10).await {
        Ok(analyses) => Ok(Json(RecentResponse { analyses })),
        Err(e) => {
            error!("Analysis query failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "message": e.to_string() })),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;
    use trialog_common::db;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();
        db::init_schema(&pool).await.unwrap();
        pool
    }

    fn session_with_blocks(candidate: &str, number: u8, completed: usize) -> SessionData {
        let mut session = SessionData::empty(candidate, number);
        for block in session.blocks.iter_mut().take(completed) {
            block.start_time = "09:00".into();
            block.end_time = "09:45".into();
        }
        session
    }

    #[tokio::test]
    async fn test_run_analysis_appends_one_row_per_candidate() {
        let pool = setup_test_db().await;
        for number in 1..=3 {
            sessions::save_session(&pool, &session_with_blocks("Asha", number, 4))
                .await
                .unwrap();
        }
        sessions::save_session(&pool, &session_with_blocks("Ravi", 1, 2))
            .await
            .unwrap();

        let count = run_analysis(&pool).await.unwrap();
        assert_eq!(count, 2);

        let rows = analysis_db::recent_analyses(&pool, "Asha", 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].analysis.contains("Strengths"));

        // A second run appends, never replaces
        run_analysis(&pool).await.unwrap();
        let rows = analysis_db::recent_analyses(&pool, "Asha", 10).await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_run_analysis_on_empty_store() {
        let pool = setup_test_db().await;
        assert_eq!(run_analysis(&pool).await.unwrap(), 0);
    }
}
