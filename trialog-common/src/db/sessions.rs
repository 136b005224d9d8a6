//! Session queries
//!
//! All writes upsert by the natural key `(candidate_name, session_number)`;
//! the row stays present for readers throughout an update. Reads tolerate
//! NULL optional columns and absent rows.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::db::blocks;
use crate::model::{SessionData, BLOCKS_PER_SESSION, MAX_SESSIONS};
use crate::{Error, Result};

/// Look up a session row guid by natural key
pub async fn session_guid(
    db: &SqlitePool,
    candidate_name: &str,
    session_number: u8,
) -> Result<Option<Uuid>> {
    let guid: Option<String> = sqlx::query_scalar(
        "SELECT guid FROM sessions WHERE candidate_name = ? AND session_number = ?",
    )
    .bind(candidate_name)
    .bind(session_number as i64)
    .fetch_optional(db)
    .await?;

    match guid {
        Some(g) => Ok(Some(
            Uuid::parse_str(&g).map_err(|e| Error::Internal(format!("bad session guid: {e}")))?,
        )),
        None => Ok(None),
    }
}

/// Insert a bare session row if absent (add-candidate / shift reseed path)
///
/// Returns the row guid either way.
pub async fn create_session(
    db: &SqlitePool,
    candidate_name: &str,
    session_number: u8,
    started_at: DateTime<Utc>,
) -> Result<Uuid> {
    let guid = Uuid::new_v4();
    let session_id = crate::model::default_session_id(candidate_name, session_number);
    sqlx::query(
        r#"
        INSERT INTO sessions (guid, candidate_name, session_number, session_id, started_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(candidate_name, session_number) DO NOTHING
        "#,
    )
    .bind(guid.to_string())
    .bind(candidate_name)
    .bind(session_number as i64)
    .bind(session_id)
    .bind(started_at)
    .execute(db)
    .await?;

    session_guid(db, candidate_name, session_number)
        .await?
        .ok_or_else(|| Error::Internal("session row missing after insert".to_string()))
}

/// Upsert a full session payload, blocks included
///
/// Session scalars are replaced; `started_at` is set only on first insert
/// and `ended_at` is never touched here (shift close owns it). Blocks with
/// no content are not persisted.
pub async fn save_session(db: &SqlitePool, session: &SessionData) -> Result<Uuid> {
    session.validate()?;

    let guid = Uuid::new_v4();
    let started_at = session.started_at.unwrap_or_else(Utc::now);
    sqlx::query(
        r#"
        INSERT INTO sessions (guid, candidate_name, session_number, session_id,
                              impedance_h, impedance_l, started_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(candidate_name, session_number) DO UPDATE SET
            session_id = excluded.session_id,
            impedance_h = excluded.impedance_h,
            impedance_l = excluded.impedance_l
        "#,
    )
    .bind(guid.to_string())
    .bind(&session.candidate_name)
    .bind(session.session_number as i64)
    .bind(&session.session_id)
    .bind(&session.impedance_h)
    .bind(&session.impedance_l)
    .bind(started_at)
    .execute(db)
    .await?;

    let guid = session_guid(db, &session.candidate_name, session.session_number)
        .await?
        .ok_or_else(|| Error::Internal("session row missing after upsert".to_string()))?;

    for (index, block) in session.blocks.iter().enumerate() {
        if !block.is_empty() {
            blocks::upsert_block(db, guid, index, block).await?;
        }
    }

    Ok(guid)
}

/// Load one session with its blocks; `None` when no row exists
pub async fn get_session(
    db: &SqlitePool,
    candidate_name: &str,
    session_number: u8,
) -> Result<Option<SessionData>> {
    let row = sqlx::query(
        r#"
        SELECT guid, candidate_name, session_number, session_id,
               impedance_h, impedance_l, started_at, ended_at
        FROM sessions
        WHERE candidate_name = ? AND session_number = ?
        "#,
    )
    .bind(candidate_name)
    .bind(session_number as i64)
    .fetch_optional(db)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let guid: String = row.get("guid");
    let guid =
        Uuid::parse_str(&guid).map_err(|e| Error::Internal(format!("bad session guid: {e}")))?;
    let mut session = row_to_session(&row)?;
    session.blocks = blocks::load_blocks(db, guid).await?;
    Ok(Some(session))
}

/// Distinct session numbers recorded for a candidate, ascending
pub async fn session_numbers(db: &SqlitePool, candidate_name: &str) -> Result<Vec<u8>> {
    let numbers: Vec<i64> = sqlx::query_scalar(
        r#"
        SELECT DISTINCT session_number FROM sessions
        WHERE candidate_name = ?
        ORDER BY session_number ASC
        "#,
    )
    .bind(candidate_name)
    .fetch_all(db)
    .await?;

    Ok(numbers.into_iter().map(|n| n as u8).collect())
}

/// A candidate is complete iff all 14 session rows exist
///
/// Count-based: block content is irrelevant here.
pub async fn is_complete(db: &SqlitePool, candidate_name: &str) -> Result<bool> {
    let numbers = session_numbers(db, candidate_name).await?;
    Ok(numbers.len() == MAX_SESSIONS as usize)
}

/// Distinct candidate names observed in the session store, sorted
pub async fn distinct_candidates(db: &SqlitePool) -> Result<Vec<String>> {
    let names: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT candidate_name FROM sessions ORDER BY candidate_name ASC",
    )
    .fetch_all(db)
    .await?;
    Ok(names)
}

/// Reset a session row to its freshly-seeded state (shift reseed)
///
/// The row keeps its guid but loses scalars, blocks and the `ended_at`
/// stamp, as if the candidate were newly registered.
pub async fn reseed_session(
    db: &SqlitePool,
    candidate_name: &str,
    session_number: u8,
    started_at: DateTime<Utc>,
) -> Result<Uuid> {
    let guid = create_session(db, candidate_name, session_number, started_at).await?;
    let session_id = crate::model::default_session_id(candidate_name, session_number);

    sqlx::query(
        r#"
        UPDATE sessions
        SET session_id = ?, impedance_h = NULL, impedance_l = NULL,
            started_at = ?, ended_at = NULL
        WHERE guid = ?
        "#,
    )
    .bind(session_id)
    .bind(started_at)
    .bind(guid.to_string())
    .execute(db)
    .await?;

    sqlx::query("DELETE FROM blocks WHERE session_guid = ?")
        .bind(guid.to_string())
        .execute(db)
        .await?;

    Ok(guid)
}

/// Stamp `ended_at` on every session row for a candidate (shift close)
///
/// Returns the number of rows stamped.
pub async fn close_shift(
    db: &SqlitePool,
    candidate_name: &str,
    ended_at: DateTime<Utc>,
) -> Result<u64> {
    let result = sqlx::query("UPDATE sessions SET ended_at = ? WHERE candidate_name = ?")
        .bind(ended_at)
        .bind(candidate_name)
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}

/// Load every session with its blocks (dashboard rollup / analysis snapshot)
pub async fn load_all(db: &SqlitePool) -> Result<Vec<SessionData>> {
    let rows = sqlx::query(
        r#"
        SELECT guid, candidate_name, session_number, session_id,
               impedance_h, impedance_l, started_at, ended_at
        FROM sessions
        ORDER BY candidate_name ASC, session_number ASC
        "#,
    )
    .fetch_all(db)
    .await?;

    let mut sessions = Vec::with_capacity(rows.len());
    for row in rows {
        let guid: String = row.get("guid");
        let guid =
            Uuid::parse_str(&guid).map_err(|e| Error::Internal(format!("bad session guid: {e}")))?;
        let mut session = row_to_session(&row)?;
        session.blocks = blocks::load_blocks(db, guid).await?;
        sessions.push(session);
    }
    Ok(sessions)
}

/// Map a session row onto the shared value type, tolerating NULLs
fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> Result<SessionData> {
    Ok(SessionData {
        candidate_name: row.get("candidate_name"),
        session_number: row.get::<i64, _>("session_number") as u8,
        session_id: row.get::<Option<String>, _>("session_id").unwrap_or_default(),
        impedance_h: row.get::<Option<String>, _>("impedance_h").unwrap_or_default(),
        impedance_l: row.get::<Option<String>, _>("impedance_l").unwrap_or_default(),
        blocks: vec![crate::model::Block::default(); BLOCKS_PER_SESSION],
        started_at: row.get::<Option<DateTime<Utc>>, _>("started_at"),
        ended_at: row.get::<Option<DateTime<Utc>>, _>("ended_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Block;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::init_schema(&pool).await.unwrap();
        pool
    }

    fn filled_session(candidate: &str, number: u8) -> SessionData {
        let mut session = SessionData::empty(candidate, number);
        session.impedance_h = "5.1".into();
        session.impedance_l = "1.9".into();
        session.blocks[0] = Block {
            start_time: "09:00:00".into(),
            end_time: "09:45:00".into(),
            notes: "steady".into(),
            is_recording: false,
        };
        session.blocks[2] = Block {
            start_time: "10:00:00".into(),
            end_time: String::new(),
            notes: "dizzy".into(),
            is_recording: true,
        };
        session
    }

    #[tokio::test]
    async fn test_add_candidate_creates_session_one() {
        let db = setup_test_db().await;
        let guid = create_session(&db, "Asha", 1, Utc::now()).await.unwrap();

        let session = get_session(&db, "Asha", 1).await.unwrap().unwrap();
        assert_eq!(session.session_id, "AS0001");
        assert!(session.started_at.is_some());
        assert_eq!(session.completed_block_count(), 0);
        assert!(!is_complete(&db, "Asha").await.unwrap());

        // Reseeding the same number is a no-op returning the same row
        let again = create_session(&db, "Asha", 1, Utc::now()).await.unwrap();
        assert_eq!(guid, again);
    }

    #[tokio::test]
    async fn test_save_then_reload_round_trip() {
        let db = setup_test_db().await;
        let saved = filled_session("Asha", 3);
        save_session(&db, &saved).await.unwrap();

        let loaded = get_session(&db, "Asha", 3).await.unwrap().unwrap();
        assert_eq!(loaded.blocks.len(), saved.blocks.len());
        assert_eq!(loaded.impedance_h, "5.1");
        assert_eq!(loaded.impedance_l, "1.9");
        assert_eq!(loaded.blocks[0], saved.blocks[0]);
        assert_eq!(loaded.blocks[2], saved.blocks[2]);
        assert!(loaded.blocks[1].is_empty());
    }

    #[tokio::test]
    async fn test_upsert_keeps_single_row_and_latest_values() {
        let db = setup_test_db().await;
        let mut session = filled_session("Asha", 5);
        save_session(&db, &session).await.unwrap();

        session.impedance_h = "6.0".into();
        session.blocks[0].notes = "revised".into();
        save_session(&db, &session).await.unwrap();

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sessions WHERE candidate_name = 'Asha' AND session_number = 5",
        )
        .fetch_one(&db)
        .await
        .unwrap();
        assert_eq!(count, 1);

        let loaded = get_session(&db, "Asha", 5).await.unwrap().unwrap();
        assert_eq!(loaded.impedance_h, "6.0");
        assert_eq!(loaded.blocks[0].notes, "revised");
    }

    #[tokio::test]
    async fn test_started_at_survives_resave() {
        let db = setup_test_db().await;
        let session = filled_session("Asha", 2);
        save_session(&db, &session).await.unwrap();
        let first = get_session(&db, "Asha", 2).await.unwrap().unwrap();

        save_session(&db, &session).await.unwrap();
        let second = get_session(&db, "Asha", 2).await.unwrap().unwrap();
        assert_eq!(first.started_at, second.started_at);
    }

    #[tokio::test]
    async fn test_completion_requires_all_fourteen() {
        let db = setup_test_db().await;
        for n in 1..=13 {
            save_session(&db, &filled_session("Asha", n)).await.unwrap();
        }
        assert!(!is_complete(&db, "Asha").await.unwrap());

        // Session 14 with zero completed blocks still counts
        save_session(&db, &SessionData::empty("Asha", 14)).await.unwrap();
        assert!(is_complete(&db, "Asha").await.unwrap());
        assert_eq!(
            session_numbers(&db, "Asha").await.unwrap(),
            (1..=14).collect::<Vec<u8>>()
        );
    }

    #[tokio::test]
    async fn test_close_shift_stamps_every_row() {
        let db = setup_test_db().await;
        for n in 1..=3 {
            save_session(&db, &filled_session("Asha", n)).await.unwrap();
        }
        let stamped = close_shift(&db, "Asha", Utc::now()).await.unwrap();
        assert_eq!(stamped, 3);

        for n in 1..=3 {
            let session = get_session(&db, "Asha", n).await.unwrap().unwrap();
            assert!(session.ended_at.is_some());
        }
    }

    #[tokio::test]
    async fn test_reseed_session_clears_row_and_blocks() {
        let db = setup_test_db().await;
        save_session(&db, &filled_session("Asha", 1)).await.unwrap();
        close_shift(&db, "Asha", Utc::now()).await.unwrap();

        reseed_session(&db, "Asha", 1, Utc::now()).await.unwrap();

        let session = get_session(&db, "Asha", 1).await.unwrap().unwrap();
        assert_eq!(session.session_id, "AS0001");
        assert!(session.impedance_h.is_empty());
        assert!(session.ended_at.is_none());
        assert!(session.started_at.is_some());
        assert_eq!(session.completed_block_count(), 0);
        assert!(session.blocks.iter().all(|b| b.is_empty()));
    }

    #[tokio::test]
    async fn test_distinct_candidates_sorted() {
        let db = setup_test_db().await;
        save_session(&db, &filled_session("Meera", 1)).await.unwrap();
        save_session(&db, &filled_session("Asha", 1)).await.unwrap();
        save_session(&db, &filled_session("Asha", 2)).await.unwrap();

        let names = distinct_candidates(&db).await.unwrap();
        assert_eq!(names, vec!["Asha".to_string(), "Meera".to_string()]);
    }

    #[tokio::test]
    async fn test_save_rejects_invalid_payload() {
        let db = setup_test_db().await;
        let mut session = filled_session("Asha", 1);
        session.session_number = 15;
        assert!(save_session(&db, &session).await.is_err());
    }

    #[tokio::test]
    async fn test_load_all_groups_in_order() {
        let db = setup_test_db().await;
        save_session(&db, &filled_session("Meera", 2)).await.unwrap();
        save_session(&db, &filled_session("Asha", 1)).await.unwrap();
        save_session(&db, &filled_session("Meera", 1)).await.unwrap();

        let all = load_all(&db).await.unwrap();
        let keys: Vec<(String, u8)> = all
            .iter()
            .map(|s| (s.candidate_name.clone(), s.session_number))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("Asha".to_string(), 1),
                ("Meera".to_string(), 1),
                ("Meera".to_string(), 2)
            ]
        );
    }
}
