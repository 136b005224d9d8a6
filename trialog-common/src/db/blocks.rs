//! Block queries
//!
//! Blocks upsert by `(session_guid, block_index)` and are never deleted,
//! only overwritten. Loads expand sparse rows into the full fixed-size
//! block list the editor expects.

use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::model::{Block, BLOCKS_PER_SESSION};
use crate::Result;

/// Upsert one block by its position within the session
pub async fn upsert_block(
    db: &SqlitePool,
    session_guid: Uuid,
    block_index: usize,
    block: &Block,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO blocks (guid, session_guid, block_index, start_time, end_time,
                            notes, is_recording)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(session_guid, block_index) DO UPDATE SET
            start_time = excluded.start_time,
            end_time = excluded.end_time,
            notes = excluded.notes,
            is_recording = excluded.is_recording
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(session_guid.to_string())
    .bind(block_index as i64)
    .bind(&block.start_time)
    .bind(&block.end_time)
    .bind(&block.notes)
    .bind(block.is_recording as i64)
    .execute(db)
    .await?;
    Ok(())
}

/// Load a session's blocks as a dense, index-ordered list
///
/// Rows are sparse (empty blocks are never persisted); missing indexes are
/// filled with empty blocks up to at least `BLOCKS_PER_SESSION` slots.
pub async fn load_blocks(db: &SqlitePool, session_guid: Uuid) -> Result<Vec<Block>> {
    let rows = sqlx::query(
        r#"
        SELECT block_index, start_time, end_time, notes, is_recording
        FROM blocks
        WHERE session_guid = ?
        ORDER BY block_index ASC
        "#,
    )
    .bind(session_guid.to_string())
    .fetch_all(db)
    .await?;

    let max_index = rows
        .iter()
        .map(|row| row.get::<i64, _>("block_index") as usize)
        .max();
    let len = BLOCKS_PER_SESSION.max(max_index.map_or(0, |m| m + 1));
    let mut blocks = vec![Block::default(); len];

    for row in rows {
        let index = row.get::<i64, _>("block_index") as usize;
        blocks[index] = Block {
            start_time: row.get::<Option<String>, _>("start_time").unwrap_or_default(),
            end_time: row.get::<Option<String>, _>("end_time").unwrap_or_default(),
            notes: row.get::<Option<String>, _>("notes").unwrap_or_default(),
            is_recording: row.get::<i64, _>("is_recording") != 0,
        };
    }

    Ok(blocks)
}
