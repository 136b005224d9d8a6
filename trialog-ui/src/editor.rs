//! Session editor state machine
//!
//! Drives the operator's pass through sessions 1-14 for a candidate:
//!
//! - Loads carry a generation token; a fetch that resolves after the
//!   operator has navigated away is discarded, never applied.
//! - Field edits update the in-memory session and the draft cache, mark the
//!   field dirty, and schedule one coalesced debounced flush for the burst.
//!   The flush persists the whole session by natural-key upsert and confirms
//!   each field against its edit sequence, so a field re-edited while a
//!   persist is in flight stays dirty and the latest value always reaches
//!   the store.
//! - Writes get one bounded retry; after final failure the fields stay
//!   dirty and remain visible in the editor snapshot until a later flush
//!   confirms them.
//! - Navigation clamps to [1, 14] and flushes dirty fields before issuing
//!   the target load.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use trialog_common::db::sessions;
use trialog_common::events::{EventBus, TrialogEvent};
use trialog_common::model::{SessionData, BLOCKS_PER_SESSION, MAX_SESSIONS};
use trialog_common::{Error, Result};

use crate::cache::DraftCache;

/// Debounce window for coalescing a field-edit burst into one write
pub const DEBOUNCE_MS: u64 = 400;

/// Delay before the single bounded persist retry
const RETRY_DELAY_MS: u64 = 500;

/// A block-level editable field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockField {
    StartTime,
    EndTime,
    Notes,
    IsRecording,
}

/// Typed address of a single editable session field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPath {
    SessionId,
    ImpedanceH,
    ImpedanceL,
    Block(usize, BlockField),
}

impl FieldPath {
    /// Every editable field path of a session
    pub fn all() -> impl Iterator<Item = FieldPath> {
        [Self::SessionId, Self::ImpedanceH, Self::ImpedanceL]
            .into_iter()
            .chain((0..BLOCKS_PER_SESSION).flat_map(|index| {
                [
                    BlockField::StartTime,
                    BlockField::EndTime,
                    BlockField::Notes,
                    BlockField::IsRecording,
                ]
                .into_iter()
                .map(move |field| Self::Block(index, field))
            }))
    }

    /// Parse the wire form: `session_id`, `impedance_h`, `impedance_l`,
    /// or `block.<index>.<start_time|end_time|notes|is_recording>`
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "session_id" => return Ok(Self::SessionId),
            "impedance_h" => return Ok(Self::ImpedanceH),
            "impedance_l" => return Ok(Self::ImpedanceL),
            _ => {}
        }

        let mut parts = raw.split('.');
        if parts.next() == Some("block") {
            let index: usize = parts
                .next()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| Error::InvalidInput(format!("bad field path: {raw}")))?;
            if index >= BLOCKS_PER_SESSION {
                return Err(Error::InvalidInput(format!(
                    "block index {index} out of range 0..{BLOCKS_PER_SESSION}"
                )));
            }
            let field = match parts.next() {
                Some("start_time") => BlockField::StartTime,
                Some("end_time") => BlockField::EndTime,
                Some("notes") => BlockField::Notes,
                Some("is_recording") => BlockField::IsRecording,
                _ => return Err(Error::InvalidInput(format!("bad field path: {raw}"))),
            };
            if parts.next().is_none() {
                return Ok(Self::Block(index, field));
            }
        }
        Err(Error::InvalidInput(format!("bad field path: {raw}")))
    }

    /// Apply a raw value to the addressed field
    pub fn apply(&self, session: &mut SessionData, value: &str) -> Result<()> {
        match self {
            Self::SessionId => session.session_id = value.to_string(),
            Self::ImpedanceH => session.impedance_h = value.to_string(),
            Self::ImpedanceL => session.impedance_l = value.to_string(),
            Self::Block(index, field) => {
                let block = session
                    .blocks
                    .get_mut(*index)
                    .ok_or_else(|| Error::InvalidInput(format!("no block {index}")))?;
                match field {
                    BlockField::StartTime => block.start_time = value.to_string(),
                    BlockField::EndTime => block.end_time = value.to_string(),
                    BlockField::Notes => block.notes = value.to_string(),
                    BlockField::IsRecording => {
                        block.is_recording = value == "true" || value == "1";
                    }
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionId => write!(f, "session_id"),
            Self::ImpedanceH => write!(f, "impedance_h"),
            Self::ImpedanceL => write!(f, "impedance_l"),
            Self::Block(index, field) => {
                let name = match field {
                    BlockField::StartTime => "start_time",
                    BlockField::EndTime => "end_time",
                    BlockField::Notes => "notes",
                    BlockField::IsRecording => "is_recording",
                };
                write!(f, "block.{index}.{name}")
            }
        }
    }
}

/// Editor machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state")]
pub enum EditorState {
    Idle,
    Loading { session_number: u8 },
    Ready { session_number: u8 },
    Saving { session_number: u8 },
}

/// Result of a load: applied, or discarded as stale
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    Loaded(SessionData),
    Stale,
}

/// Operator-visible editor snapshot (machine state plus unsynced fields)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorSnapshot {
    pub state: EditorState,
    pub candidate: Option<String>,
    pub dirty_fields: Vec<String>,
}

struct EditorInner {
    state: EditorState,
    candidate: Option<String>,
    session: Option<SessionData>,
    flush_scheduled: bool,
}

/// Shared editor handle; clones refer to the same machine
#[derive(Clone)]
pub struct Editor {
    db: SqlitePool,
    bus: Arc<EventBus>,
    cache: Arc<DraftCache>,
    inner: Arc<tokio::sync::Mutex<EditorInner>>,
    generation: Arc<AtomicU64>,
}

impl Editor {
    pub fn new(db: SqlitePool, bus: Arc<EventBus>, cache: Arc<DraftCache>) -> Self {
        Self {
            db,
            bus,
            cache,
            inner: Arc::new(tokio::sync::Mutex::new(EditorInner {
                state: EditorState::Idle,
                candidate: None,
                session: None,
                flush_scheduled: false,
            })),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Select a candidate and load their last-viewed session
    pub async fn select_candidate(&self, candidate: &str) -> Result<LoadOutcome> {
        if candidate.trim().is_empty() {
            return Err(Error::InvalidInput("candidate name is required".into()));
        }
        self.cache.set_selected_candidate(Some(candidate));
        let number = self.cache.last_session(candidate);
        self.load(candidate, number).await
    }

    /// Load a session, discarding the result if navigation raced past it
    pub async fn load(&self, candidate: &str, session_number: u8) -> Result<LoadOutcome> {
        if session_number < 1 || session_number > MAX_SESSIONS {
            return Err(Error::InvalidInput(format!(
                "session number {session_number} out of range 1..={MAX_SESSIONS}"
            )));
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut inner = self.inner.lock().await;
            inner.state = EditorState::Loading { session_number };
            inner.candidate = Some(candidate.to_string());
        }
        self.load_with_generation(candidate, session_number, generation)
            .await
    }

    /// Inner load body, parameterized on the sequencing token
    async fn load_with_generation(
        &self,
        candidate: &str,
        session_number: u8,
        generation: u64,
    ) -> Result<LoadOutcome> {
        // Fetch outside the lock; this is the await that can lose the race
        let fetched = match sessions::get_session(&self.db, candidate, session_number).await {
            Ok(row) => row,
            Err(e) => {
                // Degraded load: the draft cache (or an empty session) is
                // still presentable; the store stays authoritative later
                warn!("Session load failed, using local draft: {}", e);
                None
            }
        };

        // Dirty drafts are authoritative until their writes are confirmed
        let session = match self.cache.draft(candidate, session_number) {
            Some(draft) if !draft.dirty.is_empty() => draft.session,
            _ => fetched.unwrap_or_else(|| SessionData::empty(candidate, session_number)),
        };

        let mut inner = self.inner.lock().await;
        if generation != self.generation.load(Ordering::SeqCst) {
            debug!(
                "Discarding stale load of session {} for {} (generation {})",
                session_number, candidate, generation
            );
            return Ok(LoadOutcome::Stale);
        }

        inner.session = Some(session.clone());
        inner.state = EditorState::Ready { session_number };
        drop(inner);

        self.cache.set_last_session(candidate, session_number);
        if self.cache.dirty_fields(candidate, session_number).is_empty() {
            self.cache.put_clean(&session);
        }
        Ok(LoadOutcome::Loaded(session))
    }

    /// Apply a single field edit and schedule a debounced flush
    pub async fn edit_field(
        &self,
        candidate: &str,
        session_number: u8,
        field: FieldPath,
        value: &str,
    ) -> Result<()> {
        let mut inner = self.inner.lock().await;

        // Edits may arrive for a session the machine is not holding (e.g.
        // right after a restart); fall back to the draft or a fresh session
        let matches_current = inner.candidate.as_deref() == Some(candidate)
            && matches!(
                inner.state,
                EditorState::Ready { session_number: n } | EditorState::Saving { session_number: n }
                    if n == session_number
            );
        let mut session = if matches_current {
            inner
                .session
                .clone()
                .unwrap_or_else(|| SessionData::empty(candidate, session_number))
        } else {
            self.cache
                .draft(candidate, session_number)
                .map(|d| d.session)
                .unwrap_or_else(|| SessionData::empty(candidate, session_number))
        };

        field.apply(&mut session, value)?;

        inner.candidate = Some(candidate.to_string());
        inner.session = Some(session.clone());
        inner.state = EditorState::Ready { session_number };

        self.cache.record_edit(&session, &field.to_string());
        self.schedule_flush(&mut inner);
        Ok(())
    }

    /// Schedule one debounced flush unless one is already pending
    fn schedule_flush(&self, inner: &mut EditorInner) {
        if inner.flush_scheduled {
            return;
        }
        inner.flush_scheduled = true;
        let editor = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(DEBOUNCE_MS)).await;
            if let Err(e) = editor.flush_now().await {
                warn!("Debounced flush failed, fields remain dirty: {}", e);
            }
        });
    }

    /// Persist all dirty fields of the current session in one upsert
    ///
    /// Returns the number of fields confirmed. On failure the dirty flags
    /// are left in place for the next flush. A field re-edited while the
    /// persist was in flight has a newer edit sequence than the captured
    /// snapshot, stays dirty, and gets a follow-up flush.
    pub async fn flush_now(&self) -> Result<usize> {
        // Session and dirty snapshot are captured under one lock so the
        // sequence numbers match the session values being persisted
        let (session, dirty) = {
            let mut inner = self.inner.lock().await;
            inner.flush_scheduled = false;
            let Some(session) = inner.session.clone() else {
                return Ok(0);
            };
            let dirty = self
                .cache
                .dirty_snapshot(&session.candidate_name, session.session_number);
            (session, dirty)
        };
        if dirty.is_empty() {
            return Ok(0);
        }

        self.persist_with_retry(&session).await?;

        let confirmed =
            self.cache
                .confirm_flushed(&session.candidate_name, session.session_number, &dirty);
        if confirmed < dirty.len() {
            debug!(
                "{} field(s) re-edited during flush for {} session {}, rescheduling",
                dirty.len() - confirmed,
                session.candidate_name,
                session.session_number
            );
            let mut inner = self.inner.lock().await;
            self.schedule_flush(&mut inner);
        }
        self.bus.emit_lossy(TrialogEvent::FieldsFlushed {
            candidate_name: session.candidate_name.clone(),
            session_number: session.session_number,
            field_count: confirmed,
            timestamp: Utc::now(),
        });
        Ok(confirmed)
    }

    /// Full-payload save (the form's submit action); does not clear the form
    ///
    /// Returns whether the candidate is now complete.
    pub async fn save(&self, payload: SessionData) -> Result<bool> {
        payload.validate()?;
        {
            let mut inner = self.inner.lock().await;
            inner.state = EditorState::Saving {
                session_number: payload.session_number,
            };
            inner.candidate = Some(payload.candidate_name.clone());
            inner.session = Some(payload.clone());
        }

        if let Err(e) = self.persist_with_retry(&payload).await {
            // The payload stays authoritative in the draft until a later
            // flush confirms it, and the machine returns to Ready
            self.cache
                .record_edits(&payload, FieldPath::all().map(|f| f.to_string()));
            let mut inner = self.inner.lock().await;
            inner.state = EditorState::Ready {
                session_number: payload.session_number,
            };
            return Err(e);
        }
        self.cache.put_clean(&payload);
        {
            let mut inner = self.inner.lock().await;
            inner.state = EditorState::Ready {
                session_number: payload.session_number,
            };
        }

        self.bus.emit_lossy(TrialogEvent::SessionUpserted {
            candidate_name: payload.candidate_name.clone(),
            session_number: payload.session_number,
            timestamp: Utc::now(),
        });

        sessions::is_complete(&self.db, &payload.candidate_name).await
    }

    /// Navigate to the previous/next session, clamped to [1, 14]
    ///
    /// Dirty fields are flushed first; a flush failure is logged and the
    /// draft stays dirty (it overlays the target's stored row on return).
    pub async fn navigate(&self, delta: i8) -> Result<LoadOutcome> {
        let (candidate, current) = {
            let inner = self.inner.lock().await;
            let candidate = inner
                .candidate
                .clone()
                .ok_or_else(|| Error::InvalidInput("no candidate selected".into()))?;
            let current = match inner.state {
                EditorState::Ready { session_number }
                | EditorState::Loading { session_number }
                | EditorState::Saving { session_number } => session_number,
                EditorState::Idle => self.cache.last_session(&candidate),
            };
            (candidate, current)
        };

        if let Err(e) = self.flush_now().await {
            warn!("Flush before navigation failed: {}", e);
        }

        let target = (current as i16 + delta as i16).clamp(1, MAX_SESSIONS as i16) as u8;
        self.load(&candidate, target).await
    }

    /// Close the candidate's shift: stamp every session, reseed session 1,
    /// purge local state and return to Idle
    pub async fn complete_shift(&self) -> Result<()> {
        let candidate = {
            let inner = self.inner.lock().await;
            inner
                .candidate
                .clone()
                .ok_or_else(|| Error::InvalidInput("no candidate selected".into()))?
        };

        if let Err(e) = self.flush_now().await {
            warn!("Flush before shift completion failed: {}", e);
        }

        if !sessions::is_complete(&self.db, &candidate).await? {
            return Err(Error::InvalidInput(format!(
                "{candidate} has not recorded all {MAX_SESSIONS} sessions"
            )));
        }

        let now = Utc::now();
        let stamped = sessions::close_shift(&self.db, &candidate, now).await?;
        info!("Closed shift for {} ({} sessions stamped)", candidate, stamped);

        // A fresh session-1 row so the next pass starts clean
        sessions::reseed_session(&self.db, &candidate, 1, now).await?;

        self.cache.clear_candidate(&candidate);
        {
            let mut inner = self.inner.lock().await;
            inner.state = EditorState::Idle;
            inner.candidate = None;
            inner.session = None;
        }

        self.bus.emit_lossy(TrialogEvent::ShiftCompleted {
            candidate_name: candidate,
            timestamp: now,
        });
        Ok(())
    }

    /// Current machine state plus unsynced fields, for the editor UI
    pub async fn snapshot(&self) -> EditorSnapshot {
        let inner = self.inner.lock().await;
        let dirty_fields = match (&inner.candidate, &inner.session) {
            (Some(candidate), Some(session)) => {
                self.cache.dirty_fields(candidate, session.session_number)
            }
            _ => Vec::new(),
        };
        EditorSnapshot {
            state: inner.state,
            candidate: inner.candidate.clone(),
            dirty_fields,
        }
    }

    /// Upsert with one bounded retry
    async fn persist_with_retry(&self, session: &SessionData) -> Result<()> {
        match sessions::save_session(&self.db, session).await {
            Ok(_) => Ok(()),
            Err(first) => {
                warn!(
                    "Persist failed for {} session {}, retrying: {}",
                    session.candidate_name, session.session_number, first
                );
                tokio::time::sleep(Duration::from_millis(RETRY_DELAY_MS)).await;
                sessions::save_session(&self.db, session).await.map(|_| ())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;
    use trialog_common::db;

    async fn setup() -> Editor {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();
        db::init_schema(&pool).await.unwrap();
        Editor::new(
            pool,
            Arc::new(EventBus::new(64)),
            Arc::new(DraftCache::in_memory()),
        )
    }

    #[test]
    fn test_field_path_parse_and_display() {
        for raw in ["session_id", "impedance_h", "impedance_l", "block.0.start_time",
                    "block.6.is_recording", "block.3.notes"] {
            let path = FieldPath::parse(raw).unwrap();
            assert_eq!(path.to_string(), raw);
        }
        assert!(FieldPath::parse("block.7.start_time").is_err());
        assert!(FieldPath::parse("block.x.notes").is_err());
        assert!(FieldPath::parse("block.0.color").is_err());
        assert!(FieldPath::parse("candidate_name").is_err());
        assert!(FieldPath::parse("block.0.notes.extra").is_err());
    }

    #[test]
    fn test_field_path_apply() {
        let mut session = SessionData::empty("Asha", 1);
        FieldPath::parse("block.2.start_time")
            .unwrap()
            .apply(&mut session, "09:15")
            .unwrap();
        FieldPath::parse("block.2.is_recording")
            .unwrap()
            .apply(&mut session, "true")
            .unwrap();
        FieldPath::parse("impedance_h")
            .unwrap()
            .apply(&mut session, "4.4")
            .unwrap();
        assert_eq!(session.blocks[2].start_time, "09:15");
        assert!(session.blocks[2].is_recording);
        assert_eq!(session.impedance_h, "4.4");
    }

    #[tokio::test]
    async fn test_load_synthesizes_missing_session() {
        let editor = setup().await;
        let outcome = editor.load("Asha", 2).await.unwrap();
        let LoadOutcome::Loaded(session) = outcome else {
            panic!("expected loaded session");
        };
        assert_eq!(session.session_id, "AS0002");
        assert_eq!(session.blocks.len(), BLOCKS_PER_SESSION);

        let snapshot = editor.snapshot().await;
        assert_eq!(snapshot.state, EditorState::Ready { session_number: 2 });
    }

    #[tokio::test]
    async fn test_stale_load_is_discarded() {
        let editor = setup().await;
        let old_generation = editor.generation.fetch_add(1, Ordering::SeqCst) + 1;
        // Navigation happened meanwhile
        editor.generation.fetch_add(1, Ordering::SeqCst);

        let outcome = editor
            .load_with_generation("Asha", 1, old_generation)
            .await
            .unwrap();
        assert!(matches!(outcome, LoadOutcome::Stale));
    }

    #[tokio::test]
    async fn test_rapid_edits_last_write_wins() {
        let editor = setup().await;
        editor.load("Asha", 1).await.unwrap();

        let field = FieldPath::parse("block.0.notes").unwrap();
        editor.edit_field("Asha", 1, field, "first").await.unwrap();
        editor.edit_field("Asha", 1, field, "second").await.unwrap();

        let flushed = editor.flush_now().await.unwrap();
        assert_eq!(flushed, 1);

        let stored = sessions::get_session(&editor.db, "Asha", 1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.blocks[0].notes, "second");
    }

    #[tokio::test]
    async fn test_edit_during_inflight_flush_stays_dirty_and_repersists() {
        // Single-connection pool so an acquired connection stalls the flush
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        db::init_schema(&pool).await.unwrap();
        let editor = Editor::new(
            pool.clone(),
            Arc::new(EventBus::new(64)),
            Arc::new(DraftCache::in_memory()),
        );
        editor.load("Asha", 1).await.unwrap();

        let field = FieldPath::parse("block.0.notes").unwrap();
        editor.edit_field("Asha", 1, field, "first").await.unwrap();

        let held = pool.acquire().await.unwrap();
        let flush = tokio::spawn({
            let editor = editor.clone();
            async move { editor.flush_now().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Lands while the "first" snapshot is waiting on the connection
        editor.edit_field("Asha", 1, field, "second").await.unwrap();
        drop(held);

        // The stalled flush persisted the old snapshot and must not confirm
        // the re-edited field
        assert_eq!(flush.await.unwrap().unwrap(), 0);
        let snapshot = editor.snapshot().await;
        assert_eq!(snapshot.dirty_fields, vec!["block.0.notes"]);

        assert_eq!(editor.flush_now().await.unwrap(), 1);
        let stored = sessions::get_session(&editor.db, "Asha", 1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.blocks[0].notes, "second");
    }

    #[tokio::test]
    async fn test_edit_during_inflight_flush_survives_navigation() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        db::init_schema(&pool).await.unwrap();
        let editor = Editor::new(
            pool.clone(),
            Arc::new(EventBus::new(64)),
            Arc::new(DraftCache::in_memory()),
        );
        editor.select_candidate("Asha").await.unwrap();

        let field = FieldPath::parse("block.0.notes").unwrap();
        editor.edit_field("Asha", 1, field, "first").await.unwrap();

        let held = pool.acquire().await.unwrap();
        let flush = tokio::spawn({
            let editor = editor.clone();
            async move { editor.flush_now().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        editor.edit_field("Asha", 1, field, "second").await.unwrap();
        drop(held);
        flush.await.unwrap().unwrap();

        // Navigating away flushes the still-dirty draft, so the store ends
        // up with the latest edit, not the stalled snapshot
        editor.navigate(1).await.unwrap();
        editor.navigate(-1).await.unwrap();
        let stored = sessions::get_session(&editor.db, "Asha", 1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.blocks[0].notes, "second");
    }

    #[tokio::test]
    async fn test_edit_burst_coalesces_into_one_flush() {
        let editor = setup().await;
        editor.load("Asha", 4).await.unwrap();

        editor
            .edit_field("Asha", 4, FieldPath::parse("impedance_h").unwrap(), "5.0")
            .await
            .unwrap();
        editor
            .edit_field("Asha", 4, FieldPath::parse("block.1.start_time").unwrap(), "10:00")
            .await
            .unwrap();
        editor
            .edit_field("Asha", 4, FieldPath::parse("block.1.end_time").unwrap(), "10:30")
            .await
            .unwrap();

        assert_eq!(editor.flush_now().await.unwrap(), 3);
        assert_eq!(editor.flush_now().await.unwrap(), 0);

        let stored = sessions::get_session(&editor.db, "Asha", 4)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.impedance_h, "5.0");
        assert!(stored.blocks[1].is_completed());
    }

    #[tokio::test]
    async fn test_failed_flush_keeps_fields_dirty() {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();
        // No schema: every persist fails
        let editor = Editor::new(
            pool,
            Arc::new(EventBus::new(8)),
            Arc::new(DraftCache::in_memory()),
        );
        editor
            .edit_field("Asha", 1, FieldPath::parse("impedance_h").unwrap(), "9.9")
            .await
            .unwrap();

        assert!(editor.flush_now().await.is_err());
        let snapshot = editor.snapshot().await;
        assert_eq!(snapshot.dirty_fields, vec!["impedance_h"]);
    }

    #[tokio::test]
    async fn test_failed_save_returns_ready_and_flags_payload_dirty() {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();
        // No schema: every persist fails
        let editor = Editor::new(
            pool,
            Arc::new(EventBus::new(8)),
            Arc::new(DraftCache::in_memory()),
        );

        let mut payload = SessionData::empty("Asha", 3);
        payload.impedance_h = "4.0".into();
        assert!(editor.save(payload).await.is_err());

        let snapshot = editor.snapshot().await;
        assert_eq!(snapshot.state, EditorState::Ready { session_number: 3 });
        assert!(snapshot.dirty_fields.iter().any(|f| f == "impedance_h"));

        // The rejected payload is held as a dirty draft
        let draft = editor.cache.draft("Asha", 3).unwrap();
        assert_eq!(draft.session.impedance_h, "4.0");
    }

    #[tokio::test]
    async fn test_navigation_clamps_and_flushes() {
        let editor = setup().await;
        editor.select_candidate("Asha").await.unwrap();

        // At session 1, "previous" stays clamped at 1
        editor.navigate(-1).await.unwrap();
        let snapshot = editor.snapshot().await;
        assert_eq!(snapshot.state, EditorState::Ready { session_number: 1 });

        editor
            .edit_field("Asha", 1, FieldPath::parse("block.0.notes").unwrap(), "pre-nav")
            .await
            .unwrap();
        editor.navigate(1).await.unwrap();

        // The edit was flushed before the target load
        let stored = sessions::get_session(&editor.db, "Asha", 1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.blocks[0].notes, "pre-nav");
        let snapshot = editor.snapshot().await;
        assert_eq!(snapshot.state, EditorState::Ready { session_number: 2 });
        assert!(snapshot.dirty_fields.is_empty());
    }

    #[tokio::test]
    async fn test_select_candidate_restores_last_viewed() {
        let editor = setup().await;
        editor.cache.set_last_session("Asha", 9);
        editor.select_candidate("Asha").await.unwrap();
        let snapshot = editor.snapshot().await;
        assert_eq!(snapshot.state, EditorState::Ready { session_number: 9 });
    }

    #[tokio::test]
    async fn test_dirty_draft_overlays_stored_row_on_load() {
        let editor = setup().await;
        let mut session = SessionData::empty("Asha", 1);
        session.impedance_h = "stored".into();
        sessions::save_session(&editor.db, &session).await.unwrap();

        // Unconfirmed edit in the draft cache
        session.impedance_h = "draft".into();
        editor.cache.record_edit(&session, "impedance_h");

        let LoadOutcome::Loaded(loaded) = editor.load("Asha", 1).await.unwrap() else {
            panic!("expected loaded session");
        };
        assert_eq!(loaded.impedance_h, "draft");
    }

    #[tokio::test]
    async fn test_complete_shift_requires_all_sessions() {
        let editor = setup().await;
        editor.select_candidate("Asha").await.unwrap();
        editor
            .save(SessionData::empty("Asha", 1))
            .await
            .unwrap();
        assert!(editor.complete_shift().await.is_err());
    }

    #[tokio::test]
    async fn test_complete_shift_closes_and_reseeds() {
        let editor = setup().await;
        editor.select_candidate("Asha").await.unwrap();
        for n in 1..=MAX_SESSIONS {
            let complete = editor.save(SessionData::empty("Asha", n)).await.unwrap();
            assert_eq!(complete, n == MAX_SESSIONS);
        }

        editor.complete_shift().await.unwrap();

        // Editor back to Idle, local state purged
        let snapshot = editor.snapshot().await;
        assert_eq!(snapshot.state, EditorState::Idle);
        assert!(snapshot.candidate.is_none());
        assert!(editor.cache.selected_candidate().is_none());

        // Fresh session 1 seeded without an end stamp
        let session_one = sessions::get_session(&editor.db, "Asha", 1)
            .await
            .unwrap()
            .unwrap();
        assert!(session_one.ended_at.is_none());
        // Old rows carry the shift-close stamp
        let session_two = sessions::get_session(&editor.db, "Asha", 2)
            .await
            .unwrap()
            .unwrap();
        assert!(session_two.ended_at.is_some());
    }
}
