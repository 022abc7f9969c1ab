//! Visitor context store — typed idempotent counters and dedup flags over
//! the raw storage backend. No single widget owns this state; every key
//! is namespaced so multiple embeds on one host page don't collide.

use crate::backend::{StorageBackend, StorageScope};
use std::sync::Arc;
use uuid::Uuid;

const KEY_PREFIX: &str = "popreach";

/// Snapshot of the flags the frequency policy evaluates for one widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitorFlags {
    pub session_visit_count: u32,
    pub shown_this_session: bool,
    pub shown_ever: bool,
    pub submitted_this_session: bool,
}

/// Typed wrapper over per-browser storage.
#[derive(Clone)]
pub struct VisitorContextStore {
    backend: Arc<dyn StorageBackend>,
}

impl VisitorContextStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Stable anonymous visitor id, created on first access.
    pub fn visitor_id(&self) -> String {
        let key = format!("{KEY_PREFIX}:visitor_id");
        if let Some(id) = self.backend.get(StorageScope::Persistent, &key) {
            return id;
        }
        let id = Uuid::new_v4().to_string();
        self.backend.set(StorageScope::Persistent, &key, &id);
        id
    }

    /// Increments the session visit counter. Called exactly once per page
    /// view, before any widget is activated.
    pub fn record_page_view(&self) -> u32 {
        let count = self.session_visit_count() + 1;
        self.backend.set(
            StorageScope::Session,
            &format!("{KEY_PREFIX}:session_visits"),
            &count.to_string(),
        );
        count
    }

    pub fn session_visit_count(&self) -> u32 {
        self.backend
            .get(StorageScope::Session, &format!("{KEY_PREFIX}:session_visits"))
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    /// Records that a widget reached `Shown`, in both session and
    /// persistent scope. Idempotent.
    pub fn mark_shown(&self, widget_id: &str) {
        self.backend.set(
            StorageScope::Session,
            &format!("{KEY_PREFIX}:shown:{widget_id}"),
            "1",
        );
        self.backend.set(
            StorageScope::Persistent,
            &format!("{KEY_PREFIX}:shown_ever:{widget_id}"),
            "1",
        );
    }

    pub fn shown_this_session(&self, widget_id: &str) -> bool {
        self.backend
            .get(StorageScope::Session, &format!("{KEY_PREFIX}:shown:{widget_id}"))
            .is_some()
    }

    pub fn shown_ever(&self, widget_id: &str) -> bool {
        self.backend
            .get(
                StorageScope::Persistent,
                &format!("{KEY_PREFIX}:shown_ever:{widget_id}"),
            )
            .is_some()
    }

    pub fn mark_submitted(&self, widget_id: &str) {
        self.backend.set(
            StorageScope::Session,
            &format!("{KEY_PREFIX}:submitted:{widget_id}"),
            "1",
        );
    }

    pub fn submitted_this_session(&self, widget_id: &str) -> bool {
        self.backend
            .get(
                StorageScope::Session,
                &format!("{KEY_PREFIX}:submitted:{widget_id}"),
            )
            .is_some()
    }

    /// Last experiment variant served to this browser for a site. Sent as
    /// a hint on the next page view's config fetch to drive round-robin
    /// rotation server side.
    pub fn last_variant_id(&self, site_id: &str) -> Option<String> {
        self.backend.get(
            StorageScope::Persistent,
            &format!("{KEY_PREFIX}:last_variant:{site_id}"),
        )
    }

    pub fn set_last_variant_id(&self, site_id: &str, variant_id: &str) {
        self.backend.set(
            StorageScope::Persistent,
            &format!("{KEY_PREFIX}:last_variant:{site_id}"),
            variant_id,
        );
    }

    /// Everything the frequency policy needs, read in one place.
    pub fn flags_for(&self, widget_id: &str) -> VisitorFlags {
        VisitorFlags {
            session_visit_count: self.session_visit_count(),
            shown_this_session: self.shown_this_session(widget_id),
            shown_ever: self.shown_ever(widget_id),
            submitted_this_session: self.submitted_this_session(widget_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryStorage;

    fn store() -> (Arc<MemoryStorage>, VisitorContextStore) {
        let backend = Arc::new(MemoryStorage::new());
        let store = VisitorContextStore::new(backend.clone());
        (backend, store)
    }

    #[test]
    fn test_visitor_id_is_stable() {
        let (_, store) = store();
        let first = store.visitor_id();
        let second = store.visitor_id();
        assert_eq!(first, second);
    }

    #[test]
    fn test_page_view_counter_resets_with_session() {
        let (backend, store) = store();
        assert_eq!(store.record_page_view(), 1);
        assert_eq!(store.record_page_view(), 2);

        backend.end_session();
        assert_eq!(store.session_visit_count(), 0);
        assert_eq!(store.record_page_view(), 1);
    }

    #[test]
    fn test_shown_flags_scope() {
        let (backend, store) = store();
        store.mark_shown("w-1");
        assert!(store.shown_this_session("w-1"));
        assert!(store.shown_ever("w-1"));
        assert!(!store.shown_this_session("w-2"));

        backend.end_session();
        assert!(!store.shown_this_session("w-1"));
        assert!(store.shown_ever("w-1"));
    }

    #[test]
    fn test_submitted_is_session_scoped() {
        let (backend, store) = store();
        store.mark_submitted("w-1");
        assert!(store.submitted_this_session("w-1"));

        backend.end_session();
        assert!(!store.submitted_this_session("w-1"));
    }

    #[test]
    fn test_last_variant_per_site() {
        let (_, store) = store();
        store.set_last_variant_id("site-1", "w-a");
        store.set_last_variant_id("site-2", "w-b");
        assert_eq!(store.last_variant_id("site-1").as_deref(), Some("w-a"));
        assert_eq!(store.last_variant_id("site-2").as_deref(), Some("w-b"));
        assert!(store.last_variant_id("site-3").is_none());
    }
}
