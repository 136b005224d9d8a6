//! Analysis report rows
//!
//! `session_analysis` is append-only: every summarization run inserts one
//! row per candidate. Overlapping runs interleave harmlessly.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::Result;

/// One stored analysis report
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub candidate_name: String,
    pub analysis: String,
    pub created_at: DateTime<Utc>,
}

/// Append an analysis row for a candidate
pub async fn insert_analysis(
    db: &SqlitePool,
    candidate_name: &str,
    analysis: &str,
    created_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO session_analysis (guid, candidate_name, analysis, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(candidate_name)
    .bind(analysis)
    .bind(created_at)
    .execute(db)
    .await?;
    Ok(())
}

/// Most recent analysis rows for a candidate, newest first
pub async fn recent_analyses(
    db: &SqlitePool,
    candidate_name: &str,
    limit: i64,
) -> Result<Vec<AnalysisRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT candidate_name, analysis, created_at
        FROM session_analysis
        WHERE candidate_name = ?
        ORDER BY created_at DESC
        LIMIT ?
        "#,
    )
    .bind(candidate_name)
    .bind(limit)
    .fetch_all(db)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| AnalysisRecord {
            candidate_name: row.get("candidate_name"),
            analysis: row.get("analysis"),
            created_at: row.get("created_at"),
        })
        .collect())
}
