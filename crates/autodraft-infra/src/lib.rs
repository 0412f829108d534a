//! Infrastructure layer for autodraft.
//!
//! Contains implementations of the `DraftStore` trait defined in
//! `autodraft-core` (SQLite, one-file-per-key directory, in-memory), the
//! backend selection that ties them to configuration, and the config loader.

pub mod config;
pub mod filesystem;
pub mod memory;
pub mod sqlite;
pub mod store;
