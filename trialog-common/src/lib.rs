//! # Trialog Common Library
//!
//! Shared code for the Trialog services including:
//! - Session/block data model and completion rules
//! - Database schema, migrations and queries
//! - Event types (TrialogEvent enum) and EventBus
//! - Configuration loading
//! - Share-text and paginated report formatting
//! - Per-candidate analysis metrics

pub mod analysis;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod format;
pub mod model;
pub mod report;
pub mod sse;

pub use error::{Error, Result};
pub use model::{Block, SessionData, BLOCKS_PER_SESSION, MAX_SESSIONS};
