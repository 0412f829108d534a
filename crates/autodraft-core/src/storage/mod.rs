//! Storage abstractions for autodraft.
//!
//! Defines the draft store trait. Implementations live in autodraft-infra.

pub mod draft_store;
