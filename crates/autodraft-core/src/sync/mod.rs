//! Connectivity tracking for drafts saved while offline.

pub mod offline;

pub use offline::OfflineSync;
