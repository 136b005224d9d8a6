//! # Trialog Operator UI Library (trialog-ui)
//!
//! Operator-facing service for clinical-trial session logging.
//!
//! **Purpose:** serve the embedded operator UI, run the session editor
//! state machine with its draft cache and debounced persistence, expose the
//! candidate registry, exports, completion tracker and dashboard rollup,
//! and trigger the analyzer service on a randomized cadence.

pub mod api;
pub mod cache;
pub mod editor;
pub mod summarizer;

pub use api::AppState;
pub use cache::DraftCache;
pub use editor::Editor;
