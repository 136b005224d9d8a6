//! Background summarization trigger
//!
//! Periodically asks the analyzer service to recompute its SWOT summaries.
//! The cadence is randomized between the configured bounds so repeated runs
//! do not align with operator activity. Failures are logged and the loop
//! keeps going; the next tick retries.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use trialog_common::db::settings;
use trialog_common::events::{EventBus, TrialogEvent};

/// Response body of the analyzer's analyze endpoint
#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    success: bool,
    #[serde(default)]
    candidates: usize,
}

/// Pick the next delay from the configured cadence window
fn next_delay(min_minutes: u64, max_minutes: u64) -> Duration {
    let minutes = if min_minutes >= max_minutes {
        min_minutes
    } else {
        rand::thread_rng().gen_range(min_minutes..=max_minutes)
    };
    Duration::from_secs(minutes * 60)
}

/// Run one summarization round against the analyzer service
pub async fn run_once(db: &SqlitePool, client: &reqwest::Client, bus: &EventBus) {
    let url = match settings::get_analyzer_url(db).await {
        Ok(url) => url,
        Err(e) => {
            warn!("Could not read analyzer URL: {}", e);
            return;
        }
    };

    match client.post(&url).send().await {
        Ok(response) if response.status().is_success() => {
            match response.json::<AnalyzeResponse>().await {
                Ok(body) if body.success => {
                    info!("Summarization run covered {} candidates", body.candidates);
                    bus.emit_lossy(TrialogEvent::AnalysisCompleted {
                        candidate_count: body.candidates,
                        timestamp: Utc::now(),
                    });
                }
                Ok(_) => warn!("Analyzer reported an unsuccessful run"),
                Err(e) => warn!("Could not parse analyzer response: {}", e),
            }
        }
        Ok(response) => {
            warn!("Analyzer returned HTTP {}", response.status());
        }
        Err(e) => {
            // The analyzer may simply not be running; this is not fatal
            debug!("Analyzer unreachable at {}: {}", url, e);
        }
    }
}

/// Spawn the summarization loop
pub fn spawn(db: SqlitePool, bus: Arc<EventBus>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let client = reqwest::Client::new();
        loop {
            let (min_minutes, max_minutes) = match settings::get_summarize_cadence(&db).await {
                Ok(bounds) => bounds,
                Err(e) => {
                    warn!("Could not read summarization cadence: {}", e);
                    (40, 80)
                }
            };
            let delay = next_delay(min_minutes, max_minutes);
            debug!("Next summarization run in {} s", delay.as_secs());
            tokio::time::sleep(delay).await;
            run_once(&db, &client, &bus).await;
        }
    })
}
