//! Local draft vs. server snapshot conflict detection and resolution.

pub mod resolver;

pub use resolver::{ConflictResolver, detect};
