//! Chaining controller — resolves a `trigger_popup` button action into a
//! fresh instance of the target widget. Chained instances skip targeting
//! and frequency checks entirely; the explicit click is the trigger.

use crate::types::WidgetInstance;
use popreach_core::api::ConfigApi;
use popreach_core::EngineResult;
use std::sync::Arc;
use tracing::warn;

pub struct ChainingController {
    config_api: Arc<dyn ConfigApi>,
}

impl ChainingController {
    pub fn new(config_api: Arc<dyn ConfigApi>) -> Self {
        Self { config_api }
    }

    /// Fetches the target definition and wraps it in a chained instance.
    /// An unknown or fetch-failed target resolves to `None`; the caller
    /// treats the click as a plain close.
    pub fn resolve(&self, target_widget_id: &str) -> EngineResult<Option<WidgetInstance>> {
        match self.config_api.fetch_widget(target_widget_id) {
            Ok(Some(definition)) => Ok(Some(WidgetInstance::chained(definition))),
            Ok(None) => {
                warn!(target_widget_id, "Chain target does not exist");
                Ok(None)
            }
            Err(e) => {
                warn!(target_widget_id, error = %e, "Chain target fetch failed");
                Err(e)
            }
        }
    }
}
