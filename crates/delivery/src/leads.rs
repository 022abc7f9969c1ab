//! Lead store — create-or-merge persistence behind the leads endpoint.
//! Partial and final saves arrive through the same request shape; a
//! request carrying a lead id merges into the existing record.

use dashmap::DashMap;
use popreach_core::api::LeadApi;
use popreach_core::types::{LeadRecord, LeadSaveRequest};
use popreach_core::{EngineError, EngineResult};
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

#[derive(Default)]
pub struct LeadStore {
    leads: DashMap<String, LeadRecord>,
}

impl LeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one save request. Returns the resulting record and whether
    /// it was freshly created.
    pub fn save(&self, request: &LeadSaveRequest) -> EngineResult<(LeadRecord, bool)> {
        if request.site_id.is_empty() || request.popup_id.is_empty() {
            return Err(EngineError::Validation(
                "siteId and popupId are required".into(),
            ));
        }

        let now = Utc::now();
        if let Some(lead_id) = request.lead_id.as_deref() {
            if let Some(mut existing) = self.leads.get_mut(lead_id) {
                if request.email.is_some() {
                    existing.email = request.email.clone();
                }
                if let Some(data) = &request.data {
                    existing.data.extend(data.clone());
                }
                existing.updated_at = now;
                debug!(lead_id, "Merged lead save");
                return Ok((existing.value().clone(), false));
            }
            // Unknown id: fall through and mint a fresh record so a
            // stale client still lands its data somewhere.
        }

        let record = LeadRecord {
            id: Uuid::new_v4().to_string(),
            site_id: request.site_id.clone(),
            popup_id: request.popup_id.clone(),
            email: request.email.clone(),
            data: request.data.clone().unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        self.leads.insert(record.id.clone(), record.clone());
        debug!(lead_id = %record.id, "Created lead");
        Ok((record, true))
    }

    pub fn get(&self, lead_id: &str) -> Option<LeadRecord> {
        self.leads.get(lead_id).map(|entry| entry.value().clone())
    }

    pub fn for_site(&self, site_id: &str) -> Vec<LeadRecord> {
        let mut records: Vec<LeadRecord> = self
            .leads
            .iter()
            .filter(|entry| entry.site_id == site_id)
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        records
    }

    pub fn len(&self) -> usize {
        self.leads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leads.is_empty()
    }
}

impl LeadApi for LeadStore {
    fn save_lead(&self, request: &LeadSaveRequest) -> EngineResult<LeadRecord> {
        self.save(request).map(|(record, _)| record)
    }
}
