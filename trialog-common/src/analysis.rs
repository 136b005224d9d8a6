//! Per-candidate performance metrics and report generation
//!
//! The summarization service snapshots the session store, computes these
//! metrics per candidate, and appends one textual report row per candidate
//! per run. Reports are advisory dashboard decoration; they never gate any
//! workflow decision.

use std::collections::BTreeMap;

use crate::clock;
use crate::model::{SessionData, MAX_SESSIONS, QUALIFIED_SESSION_COUNT};

/// Ideal block duration in minutes for the time-management score
const IDEAL_BLOCK_MINUTES: f64 = 45.0;

/// Aggregate metrics for one candidate
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateMetrics {
    pub total_sessions: usize,
    /// Completed blocks / total persisted blocks, as a percentage
    pub completion_rate: f64,
    pub average_blocks_per_session: f64,
    /// 100 minus ten times the stddev of completed blocks per session
    pub consistency: f64,
    /// 100 minus the distance of the average block duration from ideal
    pub time_management: f64,
}

/// Compute aggregate metrics over one candidate's sessions
pub fn compute_metrics(sessions: &[SessionData]) -> CandidateMetrics {
    let total_sessions = sessions.len();

    let completed_per_session: Vec<usize> =
        sessions.iter().map(|s| s.completed_block_count()).collect();
    let total_completed: usize = completed_per_session.iter().sum();
    let total_blocks: usize = sessions.iter().map(|s| s.blocks.len()).sum();

    let completion_rate = if total_blocks > 0 {
        total_completed as f64 / total_blocks as f64 * 100.0
    } else {
        0.0
    };

    let average_blocks_per_session = if total_sessions > 0 {
        total_completed as f64 / total_sessions as f64
    } else {
        0.0
    };

    // Consistency from the variation in completed blocks per session
    let consistency = if total_sessions > 0 {
        let avg = total_completed as f64 / total_sessions as f64;
        let variance = completed_per_session
            .iter()
            .map(|&n| (n as f64 - avg).powi(2))
            .sum::<f64>()
            / total_sessions as f64;
        (100.0 - variance.sqrt() * 10.0).max(0.0)
    } else {
        0.0
    };

    // Time management from average completed-block duration vs ideal
    let mut durations = Vec::new();
    for session in sessions {
        for block in &session.blocks {
            if block.is_completed() {
                if let Some(minutes) = clock::duration_minutes(&block.start_time, &block.end_time) {
                    durations.push(minutes);
                }
            }
        }
    }
    let time_management = if durations.is_empty() {
        0.0
    } else {
        let avg = durations.iter().sum::<f64>() / durations.len() as f64;
        (100.0 - (IDEAL_BLOCK_MINUTES - avg).abs()).clamp(0.0, 100.0)
    };

    CandidateMetrics {
        total_sessions,
        completion_rate,
        average_blocks_per_session,
        consistency,
        time_management,
    }
}

/// Pick the top performer: highest completion rate AND consistency
fn top_performer<'a>(
    metrics: &'a BTreeMap<String, CandidateMetrics>,
) -> Option<(&'a str, &'a CandidateMetrics)> {
    let mut top: Option<(&str, &CandidateMetrics)> = None;
    for (name, m) in metrics {
        match top {
            None => top = Some((name, m)),
            Some((_, best)) => {
                if m.completion_rate > best.completion_rate && m.consistency > best.consistency {
                    top = Some((name, m));
                }
            }
        }
    }
    top
}

fn joined_or_none(items: &[&str]) -> String {
    if items.is_empty() {
        "None identified".to_string()
    } else {
        items.join(", ")
    }
}

/// Render the SWOT-style textual report for one candidate
pub fn build_report(
    candidate: &str,
    metrics: &CandidateMetrics,
    top: Option<(&str, &CandidateMetrics)>,
) -> String {
    let mut strengths = Vec::new();
    let mut weaknesses = Vec::new();
    let mut opportunities = Vec::new();
    let mut threats = Vec::new();

    if metrics.completion_rate >= 85.0 {
        strengths.push("High completion rate");
    }
    if metrics.consistency >= 85.0 {
        strengths.push("Consistent performance");
    }
    if metrics.time_management >= 85.0 {
        strengths.push("Excellent time management");
    }

    if metrics.completion_rate < 70.0 {
        weaknesses.push("Low completion rate");
    }
    if metrics.consistency < 70.0 {
        weaknesses.push("Inconsistent performance");
    }
    if metrics.time_management < 70.0 {
        weaknesses.push("Poor time management");
    }

    if metrics.total_sessions < QUALIFIED_SESSION_COUNT {
        opportunities.push("Room for session completion improvement");
    }
    let is_top = matches!(top, Some((name, _)) if name == candidate);
    if let Some((_, top_metrics)) = top {
        if metrics.consistency < top_metrics.consistency {
            opportunities.push("Can improve consistency to match top performer");
        }
    }

    if metrics.total_sessions < 8 && metrics.completion_rate < 75.0 {
        threats.push("Risk of not completing required sessions in time");
    }
    if metrics.consistency < 60.0 {
        threats.push("Inconsistency may impact overall performance");
    }

    let comparative = match top {
        Some((top_name, top_metrics)) if !is_top => {
            let completion_diff = top_metrics.completion_rate - metrics.completion_rate;
            let consistency_diff = top_metrics.consistency - metrics.consistency;
            format!(
                "\nComparison with top performer ({}):\n- Completion rate: {:.1}% lower\n- Consistency: {:.1}% lower",
                top_name, completion_diff, consistency_diff
            )
        }
        _ => String::new(),
    };

    let status = if metrics.total_sessions >= QUALIFIED_SESSION_COUNT {
        "Qualified"
    } else {
        "In Progress"
    };

    format!(
        "Performance Analysis for {candidate}:\n\
         SWOT Analysis:\n\
         Strengths: {strengths}\n\
         Weaknesses: {weaknesses}\n\
         Opportunities: {opportunities}\n\
         Threats: {threats}\n\
         \n\
         Key Metrics:\n\
         - Sessions completed: {sessions}/{max}\n\
         - Completion rate: {completion:.1}%\n\
         - Consistency score: {consistency:.1}%\n\
         - Time management score: {time:.1}%\n\
         {comparative}\n\
         \n\
         Status: {status}",
        candidate = candidate,
        strengths = joined_or_none(&strengths),
        weaknesses = joined_or_none(&weaknesses),
        opportunities = joined_or_none(&opportunities),
        threats = joined_or_none(&threats),
        sessions = metrics.total_sessions,
        max = MAX_SESSIONS,
        completion = metrics.completion_rate,
        consistency = metrics.consistency,
        time = metrics.time_management,
        comparative = comparative,
        status = status,
    )
}

/// Analyze every candidate: returns `(candidate, report_text)` pairs
///
/// Input is a snapshot grouped by candidate name; output order follows the
/// (sorted) input order so repeated runs are deterministic.
pub fn analyze_all(sessions_by_candidate: &BTreeMap<String, Vec<SessionData>>) -> Vec<(String, String)> {
    let metrics: BTreeMap<String, CandidateMetrics> = sessions_by_candidate
        .iter()
        .map(|(name, sessions)| (name.clone(), compute_metrics(sessions)))
        .collect();

    let top = top_performer(&metrics).map(|(name, m)| (name.to_string(), m.clone()));
    let top_ref = top.as_ref().map(|(n, m)| (n.as_str(), m));

    metrics
        .iter()
        .map(|(name, m)| (name.clone(), build_report(name, m, top_ref)))
        .collect()
}
