//! Browser-storage abstraction. The host backs `Session` with
//! `sessionStorage` and `Persistent` with `localStorage`; tests use the
//! in-memory backend.
//!
//! Reads and writes are read-modify-write without cross-tab locking;
//! last write wins across simultaneously open tabs.

use dashmap::DashMap;

/// Which browser storage area a key lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageScope {
    /// Cleared when the browser session ends (`sessionStorage`).
    Session,
    /// Survives across sessions (`localStorage`).
    Persistent,
}

/// Minimal key-value surface over both storage areas.
pub trait StorageBackend: Send + Sync {
    fn get(&self, scope: StorageScope, key: &str) -> Option<String>;
    fn set(&self, scope: StorageScope, key: &str, value: &str);
    fn remove(&self, scope: StorageScope, key: &str);
}

/// In-memory backend for tests and non-browser hosts.
#[derive(Default)]
pub struct MemoryStorage {
    session: DashMap<String, String>,
    persistent: DashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn area(&self, scope: StorageScope) -> &DashMap<String, String> {
        match scope {
            StorageScope::Session => &self.session,
            StorageScope::Persistent => &self.persistent,
        }
    }

    /// Drops everything in the session area, emulating the start of a new
    /// browser session.
    pub fn end_session(&self) {
        self.session.clear();
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, scope: StorageScope, key: &str) -> Option<String> {
        self.area(scope).get(key).map(|v| v.value().clone())
    }

    fn set(&self, scope: StorageScope, key: &str, value: &str) {
        self.area(scope).insert(key.to_string(), value.to_string());
    }

    fn remove(&self, scope: StorageScope, key: &str) {
        self.area(scope).remove(key);
    }
}
