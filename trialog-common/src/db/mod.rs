//! Database layer: schema initialization, migrations and queries
//!
//! The SQLite store is the single source of truth for sessions, blocks and
//! analysis rows. All writes go through upsert-by-natural-key queries; no
//! delete-then-reinsert anywhere.

pub mod analysis;
pub mod blocks;
pub mod init;
pub mod migrations;
pub mod sessions;
pub mod settings;

pub use init::{init_database, init_schema};
