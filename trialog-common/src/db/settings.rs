//! Settings database access
//!
//! Read/write settings from the settings table (key-value store).
//! All settings are global/system-wide (not per-operator).

use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

use crate::Result;

/// Setting key: access code gating candidate creation ("0" disables)
pub const KEY_ACCESS_CODE: &str = "access_code";

/// Setting keys: summarization cadence bounds in minutes
pub const KEY_SUMMARIZE_MIN_MINUTES: &str = "summarize_min_minutes";
pub const KEY_SUMMARIZE_MAX_MINUTES: &str = "summarize_max_minutes";

/// Setting key: URL of the summarization service's analyze endpoint
pub const KEY_ANALYZER_URL: &str = "analyzer_url";

/// Get a setting value, parsed from its stored string
pub async fn get_setting<T: FromStr>(db: &SqlitePool, key: &str) -> Result<Option<T>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;

    Ok(value.and_then(|v| v.parse().ok()))
}

/// Set a setting value
pub async fn set_setting<T: ToString>(db: &SqlitePool, key: &str, value: T) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value) VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await?;
    Ok(())
}

/// Seed default settings on first run (existing values untouched)
pub async fn init_default_settings(db: &SqlitePool) -> Result<()> {
    let defaults: [(&str, &str); 4] = [
        (KEY_ACCESS_CODE, "0"),
        (KEY_SUMMARIZE_MIN_MINUTES, "40"),
        (KEY_SUMMARIZE_MAX_MINUTES, "80"),
        (KEY_ANALYZER_URL, "http://127.0.0.1:5811/api/analyze"),
    ];

    for (key, value) in defaults {
        let result = sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(db)
            .await?;
        if result.rows_affected() > 0 {
            info!("Seeded default setting {} = {}", key, value);
        }
    }
    Ok(())
}

/// Access code gating candidate creation; "0" or empty disables the check
pub async fn get_access_code(db: &SqlitePool) -> Result<String> {
    Ok(get_setting::<String>(db, KEY_ACCESS_CODE)
        .await?
        .unwrap_or_else(|| "0".to_string()))
}

/// Summarization cadence bounds in minutes (min, max)
///
/// Malformed or inverted values fall back to the 40/80 defaults.
pub async fn get_summarize_cadence(db: &SqlitePool) -> Result<(u64, u64)> {
    let min = get_setting::<u64>(db, KEY_SUMMARIZE_MIN_MINUTES)
        .await?
        .unwrap_or(40);
    let max = get_setting::<u64>(db, KEY_SUMMARIZE_MAX_MINUTES)
        .await?
        .unwrap_or(80);
    if min == 0 || max < min {
        return Ok((40, 80));
    }
    Ok((min, max))
}

/// URL the summarizer task POSTs to
pub async fn get_analyzer_url(db: &SqlitePool) -> Result<String> {
    Ok(get_setting::<String>(db, KEY_ANALYZER_URL)
        .await?
        .unwrap_or_else(|| "http://127.0.0.1:5811/api/analyze".to_string()))
}
