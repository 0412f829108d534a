//! Shared domain types for autodraft.
//!
//! This crate contains the types passed between the draft store, the
//! autosave controller and the conflict resolver: drafts and their stored
//! envelope, server snapshots, save status, broadcast events, configuration
//! and the error enums.
//!
//! No infrastructure dependencies beyond serde, chrono and thiserror.

pub mod config;
pub mod draft;
pub mod error;
pub mod event;
