//! Shared types — widget definitions, content blocks, targeting rules, and
//! the wire payloads spoken by the embed/lead/event APIs.
//!
//! Wire JSON is camelCase; enum values are snake_case except `MatchType`,
//! which keeps the camelCase operator names the builder emits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of widget rendered on the host page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    /// Centered overlay with a dimmed backdrop.
    Popup,
    /// Slide-in notification without a backdrop.
    Notification,
}

/// Comparison operator for a single targeting rule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MatchType {
    Exact,
    Contains,
    StartsWith,
    EndsWith,
    NotContains,
    Equals,
    GreaterThan,
    LessThan,
}

/// A single targeting rule: operator plus operand. `name` is only set for
/// JS-variable rules and names the global being inspected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TargetingRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub match_type: MatchType,
    pub value: String,
}

/// How often a widget may be shown to the same visitor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyPolicy {
    /// Unrestricted, until the visitor submits during the session; a
    /// submission suppresses re-display regardless of policy.
    #[default]
    All,
    /// At most once per browser session.
    SessionUnique,
    /// At most once ever for this browser.
    PersistentUnique,
    /// Only for returning visitors (second session visit onwards).
    Repeater,
}

/// Visitor-frequency policy, page rules, and scheduling triggers for one
/// widget definition.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TargetingSettings {
    pub frequency: FrequencyPolicy,
    /// When set and > 0, the widget shows only on exactly this session
    /// visit number, superseding `frequency`.
    pub visitor_count: Option<u32>,
    pub page_url: Vec<TargetingRule>,
    pub page_title: Vec<TargetingRule>,
    pub js_variable: Vec<TargetingRule>,
    pub time_delay_secs: Option<u64>,
    pub scroll_percentage: Option<u8>,
    /// CSS selector; the widget shows when a click lands on (or inside) a
    /// matching element.
    pub click_selector: Option<String>,
    pub inactivity_secs: Option<u64>,
    pub exit_intent: bool,
}

impl TargetingSettings {
    /// True when at least one scheduling trigger is configured. Without
    /// any, an eligible widget shows immediately.
    pub fn has_schedule_triggers(&self) -> bool {
        self.time_delay_secs.is_some()
            || self.scroll_percentage.is_some()
            || self.click_selector.is_some()
            || self.inactivity_secs.is_some()
            || self.exit_intent
    }
}

/// Close-button policy for the widget chrome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CloseButton {
    pub show: bool,
    pub position: String,
    pub color: String,
}

impl Default for CloseButton {
    fn default() -> Self {
        Self {
            show: true,
            position: "top-right".to_string(),
            color: "#000000".to_string(),
        }
    }
}

/// Thank-you confirmation rendered after a successful final submit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThankYouSettings {
    pub title: String,
    pub description: String,
    /// Seconds the confirmation stays up before the widget auto-closes.
    pub display_secs: u64,
}

impl Default for ThankYouSettings {
    fn default() -> Self {
        Self {
            title: "Thank you!".to_string(),
            description: "We'll be in touch soon.".to_string(),
            display_secs: 2,
        }
    }
}

/// Display mode for the minimized teaser affordance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TeaserDisplayMode {
    /// Show regardless of frequency-policy suppression.
    #[default]
    Always,
    /// Show only while the widget has not been submitted.
    ClosedNotFilled,
    /// Show after a delay, only if the main widget was eligible but has
    /// not fired yet.
    AfterDelay,
}

/// The minimized "over-state" affordance that opens the full widget.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeaserSettings {
    pub text: String,
    pub show_close: bool,
    pub position_desktop: String,
    pub position_mobile: String,
    pub display_mode: TeaserDisplayMode,
    pub delay_secs: u64,
}

impl Default for TeaserSettings {
    fn default() -> Self {
        Self {
            text: "Open Offer".to_string(),
            show_close: true,
            position_desktop: "bottom-left".to_string(),
            position_mobile: "bottom-left".to_string(),
            display_mode: TeaserDisplayMode::Always,
            delay_secs: 0,
        }
    }
}

/// Display settings for a widget: size, colors, placement, animation,
/// close behavior, and the optional teaser.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WidgetChrome {
    pub width: String,
    pub height: String,
    pub background_color: String,
    pub border_radius: String,
    pub padding: String,
    pub overlay_color: String,
    pub position_desktop: String,
    pub position_mobile: String,
    pub animation_desktop: String,
    pub animation_mobile: String,
    pub close_button: CloseButton,
    pub close_on_overlay_click: bool,
    pub auto_close_secs: Option<u64>,
    pub thank_you: ThankYouSettings,
    pub teaser: Option<TeaserSettings>,
}

impl Default for WidgetChrome {
    fn default() -> Self {
        Self {
            width: "500px".to_string(),
            height: "auto".to_string(),
            background_color: "#ffffff".to_string(),
            border_radius: "8px".to_string(),
            padding: "2rem".to_string(),
            overlay_color: "rgba(0, 0, 0, 0.5)".to_string(),
            position_desktop: "center".to_string(),
            position_mobile: "center".to_string(),
            animation_desktop: "fade".to_string(),
            animation_mobile: "fade".to_string(),
            close_button: CloseButton::default(),
            close_on_overlay_click: true,
            auto_close_secs: None,
            thank_you: ThankYouSettings::default(),
            teaser: None,
        }
    }
}

/// Field-level validation attached to data-bearing blocks.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldValidation {
    pub required: bool,
    pub min_len: Option<usize>,
    pub max_len: Option<usize>,
    /// Regex the value must match when non-empty.
    pub pattern: Option<String>,
}

/// Marquee scroll direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MarqueeDirection {
    #[default]
    Left,
    Right,
}

/// Action a button block performs when clicked.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ButtonAction {
    Submit,
    Next,
    Prev,
    Close,
    Link,
    TriggerPopup,
}

/// One typed block inside a widget page. The engine renders a fixed
/// vocabulary of blocks, never arbitrary markup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Title {
        id: String,
        text: String,
    },
    Description {
        id: String,
        text: String,
    },
    Image {
        id: String,
        src: String,
    },
    Button {
        id: String,
        label: String,
        action: ButtonAction,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        action_url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        trigger_widget_id: Option<String>,
    },
    TextInput {
        id: String,
        label: String,
        #[serde(default)]
        placeholder: String,
        #[serde(default)]
        validation: FieldValidation,
    },
    EmailInput {
        id: String,
        label: String,
        #[serde(default)]
        placeholder: String,
        #[serde(default)]
        validation: FieldValidation,
    },
    PhoneInput {
        id: String,
        label: String,
        #[serde(default)]
        placeholder: String,
        #[serde(default)]
        validation: FieldValidation,
    },
    DateInput {
        id: String,
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
        #[serde(default)]
        validation: FieldValidation,
    },
    Timer {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_date: Option<DateTime<Utc>>,
    },
    Marquee {
        id: String,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        speed: Option<u32>,
        #[serde(default)]
        direction: MarqueeDirection,
    },
}

impl ContentBlock {
    pub fn id(&self) -> &str {
        match self {
            ContentBlock::Title { id, .. }
            | ContentBlock::Description { id, .. }
            | ContentBlock::Image { id, .. }
            | ContentBlock::Button { id, .. }
            | ContentBlock::TextInput { id, .. }
            | ContentBlock::EmailInput { id, .. }
            | ContentBlock::PhoneInput { id, .. }
            | ContentBlock::DateInput { id, .. }
            | ContentBlock::Timer { id, .. }
            | ContentBlock::Marquee { id, .. } => id,
        }
    }

    /// True for blocks that collect a value from the visitor.
    pub fn is_input(&self) -> bool {
        matches!(
            self,
            ContentBlock::TextInput { .. }
                | ContentBlock::EmailInput { .. }
                | ContentBlock::PhoneInput { .. }
                | ContentBlock::DateInput { .. }
        )
    }

    /// Key under which this block's value lands in the lead data map: the
    /// label when non-empty, otherwise the block id.
    pub fn field_key(&self) -> Option<&str> {
        let key = match self {
            ContentBlock::TextInput { id, label, .. }
            | ContentBlock::EmailInput { id, label, .. }
            | ContentBlock::PhoneInput { id, label, .. }
            | ContentBlock::DateInput { id, label, .. } => {
                if label.is_empty() {
                    id
                } else {
                    label
                }
            }
            _ => return None,
        };
        Some(key)
    }

    pub fn validation(&self) -> Option<&FieldValidation> {
        match self {
            ContentBlock::TextInput { validation, .. }
            | ContentBlock::EmailInput { validation, .. }
            | ContentBlock::PhoneInput { validation, .. }
            | ContentBlock::DateInput { validation, .. } => Some(validation),
            _ => None,
        }
    }
}

/// One step of a multi-step widget: an ordered list of content blocks.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WidgetPage {
    pub blocks: Vec<ContentBlock>,
}

/// Server-issued widget configuration, immutable for the duration of a
/// page view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetDefinition {
    pub id: String,
    pub site_id: String,
    pub kind: WidgetKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment_group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_label: Option<String>,
    #[serde(default)]
    pub chrome: WidgetChrome,
    #[serde(default)]
    pub targeting: TargetingSettings,
    #[serde(default)]
    pub pages: Vec<WidgetPage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thank_you_page_index: Option<usize>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl WidgetDefinition {
    /// Label used for experiment-group ordering; unlabeled variants order
    /// as `"A"`.
    pub fn ordering_label(&self) -> &str {
        self.variant_label.as_deref().unwrap_or("A")
    }
}

/// Analytics event kind recorded against a widget.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Visit,
    View,
    Conversion,
}

// ── Wire payloads ───────────────────────────────────────────────────────

/// Envelope returned by `GET /v1/embed/{siteId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Vec<WidgetDefinition>,
}

/// Body of `POST /v1/leads` — used identically for partial and final
/// saves; `lead_id` present means update-and-merge.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LeadSaveRequest {
    pub site_id: String,
    pub popup_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<String>,
}

/// Server-side record correlating a multi-step fill.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub site_id: String,
    pub popup_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub data: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /v1/events` — fire-and-forget.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackEventRequest {
    pub site_id: String,
    pub popup_id: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
}

/// Aggregate per-widget counters maintained from tracked events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WidgetStats {
    pub visitors: u64,
    pub views: u64,
    pub submissions: u64,
}
