//! # Trialog Analyzer Library (trialog-an)
//!
//! Summarization service: on demand it recomputes per-candidate metrics
//! over the whole session store and appends one SWOT-style analysis row per
//! candidate. Invocations are append-only, so overlapping runs are safe.

pub mod api;

pub use api::AppState;
