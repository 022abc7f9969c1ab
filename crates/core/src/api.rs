//! Collaborator seams for the in-browser engine — the Configuration API
//! and the Lead API as trait objects, plus in-memory doubles for tests
//! and in-process hosting.
//!
//! A host adapts these to `fetch` calls against the real endpoints. The
//! engine treats every call as a suspension point and applies returned
//! ids only while the owning widget instance is still live.

use crate::error::{EngineError, EngineResult};
use crate::types::{LeadRecord, LeadSaveRequest, WidgetDefinition};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

/// Retrieves widget configuration from the Configuration API.
pub trait ConfigApi: Send + Sync {
    /// `GET {configEndpoint}/{siteId}?lastVariantId=<id>` — the set of
    /// eligible definitions for a site, one variant per experiment group.
    fn fetch_config(
        &self,
        site_id: &str,
        last_variant_id: Option<&str>,
    ) -> EngineResult<Vec<WidgetDefinition>>;

    /// Fetch a single definition by id, used for widget chaining.
    fn fetch_widget(&self, widget_id: &str) -> EngineResult<Option<WidgetDefinition>>;
}

/// Persists partial and final lead saves.
pub trait LeadApi: Send + Sync {
    /// `POST {leadEndpoint}` — creates when `lead_id` is absent, merges
    /// when present. Returns the (possibly newly created) record.
    fn save_lead(&self, request: &LeadSaveRequest) -> EngineResult<LeadRecord>;
}

/// Config API backed by a fixed list of definitions. Used in tests and by
/// hosts that embed the configuration directly in the page.
#[derive(Default)]
pub struct StaticConfigApi {
    definitions: Vec<WidgetDefinition>,
}

impl StaticConfigApi {
    pub fn new(definitions: Vec<WidgetDefinition>) -> Self {
        Self { definitions }
    }
}

impl ConfigApi for StaticConfigApi {
    fn fetch_config(
        &self,
        site_id: &str,
        _last_variant_id: Option<&str>,
    ) -> EngineResult<Vec<WidgetDefinition>> {
        Ok(self
            .definitions
            .iter()
            .filter(|d| d.site_id == site_id && d.is_active)
            .cloned()
            .collect())
    }

    fn fetch_widget(&self, widget_id: &str) -> EngineResult<Option<WidgetDefinition>> {
        Ok(self.definitions.iter().find(|d| d.id == widget_id).cloned())
    }
}

/// Lead API double that records every save and hands out stable ids.
/// `fail_next` forces the next call to error, for the partial-save and
/// final-submit failure paths.
#[derive(Default)]
pub struct RecordingLeadApi {
    calls: Mutex<Vec<LeadSaveRequest>>,
    fail_next: AtomicBool,
}

impl RecordingLeadApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<LeadSaveRequest> {
        self.calls.lock().expect("lead api mutex poisoned").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("lead api mutex poisoned").len()
    }

    pub fn set_fail_next(&self, fail: bool) {
        self.fail_next.store(fail, Ordering::SeqCst);
    }
}

impl LeadApi for RecordingLeadApi {
    fn save_lead(&self, request: &LeadSaveRequest) -> EngineResult<LeadRecord> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(EngineError::Network("lead endpoint unreachable".into()));
        }

        self.calls
            .lock()
            .expect("lead api mutex poisoned")
            .push(request.clone());

        let now = Utc::now();
        Ok(LeadRecord {
            id: request
                .lead_id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            site_id: request.site_id.clone(),
            popup_id: request.popup_id.clone(),
            email: request.email.clone(),
            data: request.data.clone().unwrap_or_default(),
            created_at: now,
            updated_at: now,
        })
    }
}
