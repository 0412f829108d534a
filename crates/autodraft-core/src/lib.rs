//! Autosave logic and store trait definitions for autodraft.
//!
//! This crate defines the `DraftStore` port that the infrastructure layer
//! implements, plus the debounced autosave controller and the conflict
//! resolver built on top of it. It depends only on `autodraft-types`,
//! never on `autodraft-infra` or any database/IO crate.

pub mod autosave;
pub mod conflict;
pub mod storage;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;
