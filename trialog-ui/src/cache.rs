//! Draft cache: the operator's non-authoritative local store
//!
//! Replaces the ad hoc nested-map browser cache with an explicit store
//! keyed by `(candidate_name, session_number)`. Each draft carries per-field
//! dirty flags that drive reconciliation against the remote store: a field
//! stays dirty until its persist is confirmed, and dirty drafts win over
//! freshly fetched rows on load.
//!
//! Persistence to disk is best-effort; a write failure is logged and the
//! cache keeps operating in memory.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::warn;
use trialog_common::SessionData;

/// One cached session draft with its unconfirmed fields
///
/// Each dirty field carries the edit sequence number of its latest edit.
/// A flush confirms a field only if that number is unchanged, so an edit
/// that lands while a persist is in flight keeps the field dirty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Draft {
    pub session: SessionData,
    /// Field path -> edit sequence of the latest unconfirmed edit
    pub dirty: BTreeMap<String, u64>,
    /// Monotonic per-draft edit counter
    pub edit_seq: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    selected_candidate: Option<String>,
    /// Last-viewed session number per candidate
    last_session: BTreeMap<String, u8>,
    /// candidate -> session number -> draft
    drafts: BTreeMap<String, BTreeMap<u8, Draft>>,
}

pub struct DraftCache {
    path: Option<PathBuf>,
    inner: Mutex<CacheFile>,
}

impl DraftCache {
    /// Open the cache file, falling back to an empty cache on any error
    pub fn open(path: PathBuf) -> Self {
        let inner = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(file) => file,
                Err(e) => {
                    warn!("Draft cache unreadable, starting empty: {}", e);
                    CacheFile::default()
                }
            },
            Err(_) => CacheFile::default(),
        };
        Self {
            path: Some(path),
            inner: Mutex::new(inner),
        }
    }

    /// In-memory cache with no backing file
    pub fn in_memory() -> Self {
        Self {
            path: None,
            inner: Mutex::new(CacheFile::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheFile> {
        // Lock poisoning only happens if a writer panicked; the cache is
        // best-effort, so recover the data rather than propagate
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Write the cache to disk (best-effort)
    fn save(&self) {
        let Some(path) = &self.path else {
            return;
        };
        let snapshot = {
            let inner = self.lock();
            serde_json::to_string_pretty(&*inner)
        };
        match snapshot {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    warn!("Failed to persist draft cache: {}", e);
                }
            }
            Err(e) => warn!("Failed to serialize draft cache: {}", e),
        }
    }

    pub fn selected_candidate(&self) -> Option<String> {
        self.lock().selected_candidate.clone()
    }

    pub fn set_selected_candidate(&self, candidate: Option<&str>) {
        self.lock().selected_candidate = candidate.map(str::to_string);
        self.save();
    }

    /// Last-viewed session number for a candidate (1 when unknown)
    pub fn last_session(&self, candidate: &str) -> u8 {
        self.lock().last_session.get(candidate).copied().unwrap_or(1)
    }

    pub fn set_last_session(&self, candidate: &str, session_number: u8) {
        self.lock()
            .last_session
            .insert(candidate.to_string(), session_number);
        self.save();
    }

    pub fn draft(&self, candidate: &str, session_number: u8) -> Option<Draft> {
        self.lock()
            .drafts
            .get(candidate)
            .and_then(|sessions| sessions.get(&session_number))
            .cloned()
    }

    /// Store a clean draft (fresh load or confirmed save); clears dirt
    pub fn put_clean(&self, session: &SessionData) {
        {
            let mut inner = self.lock();
            inner
                .drafts
                .entry(session.candidate_name.clone())
                .or_default()
                .insert(
                    session.session_number,
                    Draft {
                        session: session.clone(),
                        dirty: BTreeMap::new(),
                        edit_seq: 0,
                    },
                );
        }
        self.save();
    }

    /// Record an edit: update the draft and mark the field dirty
    pub fn record_edit(&self, session: &SessionData, field: &str) {
        self.record_edits(session, std::iter::once(field.to_string()));
    }

    /// Record a batch of edits against one draft under a single lock
    pub fn record_edits<I: IntoIterator<Item = String>>(&self, session: &SessionData, fields: I) {
        {
            let mut inner = self.lock();
            let draft = inner
                .drafts
                .entry(session.candidate_name.clone())
                .or_default()
                .entry(session.session_number)
                .or_default();
            draft.session = session.clone();
            for field in fields {
                draft.edit_seq += 1;
                draft.dirty.insert(field, draft.edit_seq);
            }
        }
        self.save();
    }

    pub fn dirty_fields(&self, candidate: &str, session_number: u8) -> Vec<String> {
        self.draft(candidate, session_number)
            .map(|d| d.dirty.into_keys().collect())
            .unwrap_or_default()
    }

    /// Dirty fields with their edit sequence numbers, captured before a flush
    pub fn dirty_snapshot(&self, candidate: &str, session_number: u8) -> Vec<(String, u64)> {
        self.draft(candidate, session_number)
            .map(|d| d.dirty.into_iter().collect())
            .unwrap_or_default()
    }

    /// Confirm a flushed snapshot; returns the number of fields cleared
    ///
    /// A field is cleared only if its edit sequence still matches the
    /// captured one. A field re-edited while the persist was in flight has
    /// a newer sequence, so it stays dirty for the next flush.
    pub fn confirm_flushed(
        &self,
        candidate: &str,
        session_number: u8,
        fields: &[(String, u64)],
    ) -> usize {
        let mut confirmed = 0;
        {
            let mut inner = self.lock();
            if let Some(draft) = inner
                .drafts
                .get_mut(candidate)
                .and_then(|sessions| sessions.get_mut(&session_number))
            {
                for (field, seq) in fields {
                    if draft.dirty.get(field) == Some(seq) {
                        draft.dirty.remove(field);
                        confirmed += 1;
                    }
                }
            }
        }
        self.save();
        confirmed
    }

    /// Drop everything held for a candidate (shift completion)
    pub fn clear_candidate(&self, candidate: &str) {
        {
            let mut inner = self.lock();
            inner.drafts.remove(candidate);
            inner.last_session.remove(candidate);
            if inner.selected_candidate.as_deref() == Some(candidate) {
                inner.selected_candidate = None;
            }
        }
        self.save();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_lifecycle() {
        let cache = DraftCache::in_memory();
        let mut session = SessionData::empty("Asha", 2);

        cache.put_clean(&session);
        assert!(cache.dirty_fields("Asha", 2).is_empty());

        session.impedance_h = "5.0".into();
        cache.record_edit(&session, "impedance_h");
        session.blocks[0].notes = "ok".into();
        cache.record_edit(&session, "block.0.notes");

        let mut dirty = cache.dirty_fields("Asha", 2);
        dirty.sort();
        assert_eq!(dirty, vec!["block.0.notes", "impedance_h"]);
        assert_eq!(cache.draft("Asha", 2).unwrap().session.impedance_h, "5.0");

        let captured: Vec<(String, u64)> = cache
            .dirty_snapshot("Asha", 2)
            .into_iter()
            .filter(|(field, _)| field == "impedance_h")
            .collect();
        assert_eq!(cache.confirm_flushed("Asha", 2, &captured), 1);
        assert_eq!(cache.dirty_fields("Asha", 2), vec!["block.0.notes"]);
    }

    #[test]
    fn test_confirm_skips_fields_reedited_during_flush() {
        let cache = DraftCache::in_memory();
        let mut session = SessionData::empty("Asha", 1);

        session.blocks[0].notes = "first".into();
        cache.record_edit(&session, "block.0.notes");
        let captured = cache.dirty_snapshot("Asha", 1);

        // A newer edit lands while the captured snapshot is being persisted
        session.blocks[0].notes = "second".into();
        cache.record_edit(&session, "block.0.notes");

        assert_eq!(cache.confirm_flushed("Asha", 1, &captured), 0);
        assert_eq!(cache.dirty_fields("Asha", 1), vec!["block.0.notes"]);
        assert_eq!(
            cache.draft("Asha", 1).unwrap().session.blocks[0].notes,
            "second"
        );
    }

    #[test]
    fn test_clear_candidate_drops_all_state() {
        let cache = DraftCache::in_memory();
        let session = SessionData::empty("Asha", 1);
        cache.put_clean(&session);
        cache.set_selected_candidate(Some("Asha"));
        cache.set_last_session("Asha", 9);

        cache.clear_candidate("Asha");
        assert!(cache.draft("Asha", 1).is_none());
        assert!(cache.selected_candidate().is_none());
        assert_eq!(cache.last_session("Asha"), 1);
    }

    #[test]
    fn test_last_session_defaults_to_one() {
        let cache = DraftCache::in_memory();
        assert_eq!(cache.last_session("Nobody"), 1);
    }

    #[test]
    fn test_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drafts.json");

        {
            let cache = DraftCache::open(path.clone());
            let mut session = SessionData::empty("Asha", 3);
            session.impedance_l = "2.2".into();
            cache.record_edit(&session, "impedance_l");
            cache.set_selected_candidate(Some("Asha"));
        }

        let reopened = DraftCache::open(path);
        assert_eq!(reopened.selected_candidate().as_deref(), Some("Asha"));
        let draft = reopened.draft("Asha", 3).unwrap();
        assert_eq!(draft.session.impedance_l, "2.2");
        assert_eq!(reopened.dirty_fields("Asha", 3), vec!["impedance_l"]);
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drafts.json");
        std::fs::write(&path, "{not json").unwrap();

        let cache = DraftCache::open(path);
        assert!(cache.selected_candidate().is_none());
    }
}
