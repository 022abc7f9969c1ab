//! Browser-storage plumbing for the display engine.
//!
//! # Modules
//!
//! - [`backend`] — `StorageBackend` trait over session/persistent areas,
//!   with an in-memory implementation
//! - [`visitor`] — typed visitor context store (counters, dedup flags,
//!   last-served experiment variant)

pub mod backend;
pub mod visitor;

pub use backend::{MemoryStorage, StorageBackend, StorageScope};
pub use visitor::{VisitorContextStore, VisitorFlags};
