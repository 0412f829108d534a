//! SQLite storage layer: the `drafts` table in WAL mode.

pub mod draft;
