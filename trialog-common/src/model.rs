//! Session/block data model and completion rules
//!
//! One tagged value type pair (`SessionData`, `Block`) is shared across the
//! editor, completion tracker, export and analysis. Payloads are validated
//! once at the store boundary via [`SessionData::validate`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Number of recording sessions per candidate
pub const MAX_SESSIONS: u8 = 14;

/// Number of timed blocks within a session
pub const BLOCKS_PER_SESSION: usize = 7;

/// Session count at which a candidate counts as "Qualified" on the dashboard
pub const QUALIFIED_SESSION_COUNT: usize = 12;

/// A timed sub-interval within a session
///
/// Times are operator-entered clock strings (`HH:MM` or `HH:MM:SS`); they
/// are only parsed for display and duration math, never rejected on entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Block {
    pub start_time: String,
    pub end_time: String,
    pub notes: String,
    pub is_recording: bool,
}

impl Block {
    /// A block is completed iff both times are non-empty
    pub fn is_completed(&self) -> bool {
        !self.start_time.is_empty() && !self.end_time.is_empty()
    }

    /// True when nothing has been entered yet (empty blocks are not persisted)
    pub fn is_empty(&self) -> bool {
        self.start_time.is_empty()
            && self.end_time.is_empty()
            && self.notes.is_empty()
            && !self.is_recording
    }
}

/// One of the 14 numbered recording sessions for a candidate
///
/// Natural key: `(candidate_name, session_number)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionData {
    pub candidate_name: String,
    pub session_number: u8,
    pub session_id: String,
    pub impedance_h: String,
    pub impedance_l: String,
    pub blocks: Vec<Block>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl SessionData {
    /// Synthesize an empty session for a number with no stored row
    ///
    /// Absent rows are "new sessions", not errors: the editor presents a
    /// full complement of empty blocks and the derived default session id.
    pub fn empty(candidate_name: &str, session_number: u8) -> Self {
        Self {
            candidate_name: candidate_name.to_string(),
            session_number,
            session_id: default_session_id(candidate_name, session_number),
            impedance_h: String::new(),
            impedance_l: String::new(),
            blocks: vec![Block::default(); BLOCKS_PER_SESSION],
            started_at: None,
            ended_at: None,
        }
    }

    /// Validate a payload at the store boundary
    pub fn validate(&self) -> Result<()> {
        if self.candidate_name.trim().is_empty() {
            return Err(Error::InvalidInput("candidate name is required".into()));
        }
        if self.session_number < 1 || self.session_number > MAX_SESSIONS {
            return Err(Error::InvalidInput(format!(
                "session number {} out of range 1..={}",
                self.session_number, MAX_SESSIONS
            )));
        }
        if self.blocks.len() > BLOCKS_PER_SESSION {
            return Err(Error::InvalidInput(format!(
                "too many blocks: {} (max {})",
                self.blocks.len(),
                BLOCKS_PER_SESSION
            )));
        }
        Ok(())
    }

    /// Count of blocks with both start and end times recorded
    pub fn completed_block_count(&self) -> usize {
        self.blocks.iter().filter(|b| b.is_completed()).count()
    }
}

/// Natural key for a session row
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub candidate_name: String,
    pub session_number: u8,
}

/// Derive the default operator-visible session id
///
/// First two characters of the candidate name uppercased, followed by the
/// session number zero-padded to four digits (e.g. "AS0003"). Operators may
/// overwrite this with freeform text, which is stored verbatim.
pub fn default_session_id(candidate_name: &str, session_number: u8) -> String {
    let initials: String = candidate_name.chars().take(2).collect();
    format!("{}{:04}", initials.to_uppercase(), session_number)
}

/// Completion percentage for the dashboard: `count / 14 * 100`
///
/// Count-based, not content-based: a session row with zero completed blocks
/// still counts toward the 14.
pub fn compute_progress(session_count: usize) -> f64 {
    session_count as f64 / MAX_SESSIONS as f64 * 100.0
}

/// Banded dashboard color for a candidate's session count
///
/// Step function over thresholds 12/13/14, not a continuous scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionBand {
    pub color: &'static str,
    pub opacity: f64,
}

impl CompletionBand {
    pub fn for_session_count(session_count: usize) -> Self {
        match session_count {
            n if n >= 14 => Self { color: "#22c55e", opacity: 1.0 },
            13 => Self { color: "#22c55e", opacity: 0.75 },
            12 => Self { color: "#22c55e", opacity: 0.5 },
            _ => Self { color: "#6b7280", opacity: 0.3 },
        }
    }
}

/// Dashboard status label gate
pub fn is_qualified(session_count: usize) -> bool {
    session_count >= QUALIFIED_SESSION_COUNT
}
