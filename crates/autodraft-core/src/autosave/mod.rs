//! Debounced draft autosave.

pub mod controller;

pub use controller::AutosaveController;
