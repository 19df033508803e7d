//! # Instance Persistence Crate
//!
//! This crate is the system's "permanent archive": the list of known instance
//! names plus one state document and one chart-data document per instance,
//! stored as JSON files under the base data directory.
//!
//! ## Public API
//!
//! - `PersistenceStore`: the async trait the registry talks to.
//! - `JsonFileStore`: the file-backed implementation.
//! - `DataLayout`: the directory layout (`instances/`, `models/`, `trainings/`).
//! - `PersistenceError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod error;
pub mod layout;
pub mod store;

// Re-export the key components to create a clean, public-facing API.
pub use error::PersistenceError;
pub use layout::DataLayout;
pub use store::{JsonFileStore, PersistenceStore};
