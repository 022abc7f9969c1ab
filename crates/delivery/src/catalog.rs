//! Widget catalog — the server-side store of widget definitions, keyed by
//! widget id. Backs the embed endpoint and doubles as an in-process
//! `ConfigApi` for tests and demos.

use crate::variants;
use dashmap::DashMap;
use popreach_core::api::ConfigApi;
use popreach_core::types::{
    ButtonAction, ContentBlock, FieldValidation, TargetingSettings, TeaserDisplayMode,
    TeaserSettings, WidgetChrome, WidgetDefinition, WidgetKind, WidgetPage,
};
use popreach_core::EngineResult;
use tracing::info;

#[derive(Default)]
pub struct WidgetCatalog {
    widgets: DashMap<String, WidgetDefinition>,
}

impl WidgetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, definition: WidgetDefinition) {
        self.widgets.insert(definition.id.clone(), definition);
    }

    pub fn get(&self, widget_id: &str) -> Option<WidgetDefinition> {
        self.widgets.get(widget_id).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, widget_id: &str) -> Option<WidgetDefinition> {
        self.widgets.remove(widget_id).map(|(_, def)| def)
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    /// Active definitions for a site, in id order so responses are stable
    /// across fetches.
    pub fn for_site(&self, site_id: &str) -> Vec<WidgetDefinition> {
        let mut definitions: Vec<WidgetDefinition> = self
            .widgets
            .iter()
            .filter(|entry| entry.site_id == site_id && entry.is_active)
            .map(|entry| entry.value().clone())
            .collect();
        definitions.sort_by(|a, b| a.id.cmp(&b.id));
        definitions
    }

    /// The embed payload: active definitions with each experiment group
    /// collapsed to this browser's next variant.
    pub fn config_for_site(
        &self,
        site_id: &str,
        last_variant_id: Option<&str>,
    ) -> Vec<WidgetDefinition> {
        variants::select_variants(self.for_site(site_id), last_variant_id)
    }
}

impl ConfigApi for WidgetCatalog {
    fn fetch_config(
        &self,
        site_id: &str,
        last_variant_id: Option<&str>,
    ) -> EngineResult<Vec<WidgetDefinition>> {
        Ok(self.config_for_site(site_id, last_variant_id))
    }

    fn fetch_widget(&self, widget_id: &str) -> EngineResult<Option<WidgetDefinition>> {
        Ok(self.get(widget_id))
    }
}

/// Seeds a newsletter popup, an A/B pair, and a chained offer for the
/// demo site.
pub fn seed_demo_widgets(catalog: &WidgetCatalog) {
    let email_page = WidgetPage {
        blocks: vec![
            ContentBlock::Title {
                id: "title".into(),
                text: "Join our newsletter".into(),
            },
            ContentBlock::EmailInput {
                id: "email".into(),
                label: "email".into(),
                placeholder: "you@example.com".into(),
                validation: FieldValidation {
                    required: true,
                    ..Default::default()
                },
            },
            ContentBlock::Button {
                id: "submit".into(),
                label: "Subscribe".into(),
                action: ButtonAction::Submit,
                action_url: None,
                trigger_widget_id: None,
            },
        ],
    };

    catalog.upsert(WidgetDefinition {
        id: "demo-newsletter".into(),
        site_id: "demo-site".into(),
        kind: WidgetKind::Popup,
        experiment_group_id: None,
        variant_label: None,
        chrome: WidgetChrome {
            teaser: Some(TeaserSettings {
                text: "Get 10% off".into(),
                display_mode: TeaserDisplayMode::ClosedNotFilled,
                ..Default::default()
            }),
            ..Default::default()
        },
        targeting: TargetingSettings {
            time_delay_secs: Some(5),
            ..Default::default()
        },
        pages: vec![email_page.clone()],
        thank_you_page_index: None,
        is_active: true,
    });

    for label in ["A", "B"] {
        catalog.upsert(WidgetDefinition {
            id: format!("demo-exit-{}", label.to_lowercase()),
            site_id: "demo-site".into(),
            kind: WidgetKind::Popup,
            experiment_group_id: Some("demo-exit-test".into()),
            variant_label: Some(label.into()),
            chrome: WidgetChrome::default(),
            targeting: TargetingSettings {
                exit_intent: true,
                ..Default::default()
            },
            pages: vec![email_page.clone()],
            thank_you_page_index: None,
            is_active: true,
        });
    }

    catalog.upsert(WidgetDefinition {
        id: "demo-offer".into(),
        site_id: "demo-site".into(),
        kind: WidgetKind::Notification,
        experiment_group_id: None,
        variant_label: None,
        chrome: WidgetChrome::default(),
        targeting: TargetingSettings::default(),
        pages: vec![email_page],
        thank_you_page_index: None,
        is_active: false,
    });

    info!(count = catalog.len(), "Seeded demo widgets");
}
