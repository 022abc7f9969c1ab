//! Runtime types of the display engine: the page context captured at
//! evaluation time, the typed page events the host feeds in, and the
//! per-activation widget instance.

use crate::state_machine::{DisplayState, DisplayStateMachine};
use chrono::{DateTime, Utc};
use popreach_core::types::{WidgetDefinition, WidgetPage};
use std::collections::HashMap;

/// Page context captured once at evaluation time. Values are never
/// re-read during rule evaluation, keeping targeting deterministic.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    /// URL path of the host page, e.g. `/pricing/`.
    pub path: String,
    /// Document title.
    pub title: String,
    /// Snapshot of the JS globals referenced by targeting rules.
    pub js_globals: HashMap<String, serde_json::Value>,
}

/// Typed event fed into the engine by the host. Each DOM listener on the
/// host side translates into exactly one of these; the engine itself
/// never touches a DOM.
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    /// Time advanced; deadline-based triggers are evaluated against the
    /// `now` passed alongside the event.
    Tick,
    /// The page scrolled to the given depth. Also counts as activity.
    Scroll { depth_percent: u8 },
    /// A click landed somewhere on the page. `matched_selectors` holds
    /// the configured selectors the click target (or an ancestor, per
    /// `closest`) matches. Also counts as activity.
    Click { matched_selectors: Vec<String> },
    /// Mouse movement or a keypress. Resets inactivity timers.
    Activity,
    /// The pointer left the viewport with no related target.
    MouseLeave,
    /// The visitor clicked a widget's teaser affordance.
    TeaserClicked { widget_id: String },
    /// The visitor clicked the dimmed backdrop of a shown widget.
    OverlayClicked { widget_id: String },
    /// The visitor clicked the close button of a shown widget.
    CloseRequested { widget_id: String },
    /// The visitor clicked a button block inside a shown widget.
    /// `values` carries the current values of the page's input blocks,
    /// keyed by block id.
    ButtonClicked {
        widget_id: String,
        block_id: String,
        values: HashMap<String, String>,
    },
}

/// A field-level validation failure surfaced back to the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub block_id: String,
    pub message: String,
}

/// Runtime state for one activated widget definition. Owned exclusively
/// by the orchestrator registry for its lifetime.
#[derive(Debug)]
pub struct WidgetInstance {
    pub definition: WidgetDefinition,
    pub machine: DisplayStateMachine,
    pub current_page_index: usize,
    /// Set after the first successful partial save; immutable thereafter.
    pub draft_lead_id: Option<String>,
    /// Field values collected but not yet persisted (a failed partial
    /// save retains them for the next attempt).
    pub unsaved_data: HashMap<String, String>,
    pub view_recorded: bool,
    /// Created by the chaining controller; targeting and frequency checks
    /// were bypassed.
    pub chained: bool,
    pub teaser_visible: bool,
    pub teaser_deadline: Option<DateTime<Utc>>,
    pub auto_close_deadline: Option<DateTime<Utc>>,
    pub thank_you_deadline: Option<DateTime<Utc>>,
}

impl WidgetInstance {
    pub fn new(definition: WidgetDefinition) -> Self {
        Self {
            definition,
            machine: DisplayStateMachine::new(),
            current_page_index: 0,
            draft_lead_id: None,
            unsaved_data: HashMap::new(),
            view_recorded: false,
            chained: false,
            teaser_visible: false,
            teaser_deadline: None,
            auto_close_deadline: None,
            thank_you_deadline: None,
        }
    }

    pub fn chained(definition: WidgetDefinition) -> Self {
        Self {
            chained: true,
            ..Self::new(definition)
        }
    }

    pub fn state(&self) -> DisplayState {
        self.machine.state
    }

    pub fn widget_id(&self) -> &str {
        &self.definition.id
    }

    pub fn current_page(&self) -> Option<&WidgetPage> {
        self.definition.pages.get(self.current_page_index)
    }

    /// Records the draft lead id returned by the first successful save.
    /// Later ids are ignored: the correlation id never changes for the
    /// life of the instance.
    pub fn record_draft_lead_id(&mut self, id: String) {
        if self.draft_lead_id.is_none() {
            self.draft_lead_id = Some(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use popreach_core::types::{WidgetChrome, WidgetKind};

    fn definition() -> WidgetDefinition {
        WidgetDefinition {
            id: "w-1".into(),
            site_id: "site-1".into(),
            kind: WidgetKind::Popup,
            experiment_group_id: None,
            variant_label: None,
            chrome: WidgetChrome::default(),
            targeting: Default::default(),
            pages: vec![],
            thank_you_page_index: None,
            is_active: true,
        }
    }

    #[test]
    fn test_draft_lead_id_is_write_once() {
        let mut instance = WidgetInstance::new(definition());
        instance.record_draft_lead_id("lead-1".into());
        instance.record_draft_lead_id("lead-2".into());
        assert_eq!(instance.draft_lead_id.as_deref(), Some("lead-1"));
    }

    #[test]
    fn test_chained_instance_is_flagged() {
        let instance = WidgetInstance::chained(definition());
        assert!(instance.chained);
        assert_eq!(instance.state(), DisplayState::Idle);
    }
}
