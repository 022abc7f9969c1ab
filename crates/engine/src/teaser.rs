//! Teaser controller — decides when the minimized affordance of a widget
//! is visible. The affordance and the full widget are mutually exclusive:
//! the orchestrator hides the teaser the moment the widget shows and
//! re-evaluates it when the widget closes.

use crate::state_machine::DisplayState;
use chrono::{DateTime, Duration, Utc};
use popreach_core::types::{TeaserDisplayMode, TeaserSettings, WidgetDefinition};

/// Computes the deadline after which an `AfterDelay` teaser becomes
/// visible. Other modes have no deadline.
pub fn deadline_for(
    definition: &WidgetDefinition,
    activated_at: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let teaser = definition.chrome.teaser.as_ref()?;
    match teaser.display_mode {
        TeaserDisplayMode::AfterDelay => {
            Some(activated_at + Duration::seconds(teaser.delay_secs as i64))
        }
        _ => None,
    }
}

/// Whether the teaser should be visible right now, given the widget's
/// display state. A shown widget never has a visible teaser.
pub fn should_show(
    settings: &TeaserSettings,
    state: DisplayState,
    submitted: bool,
    deadline: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    if state == DisplayState::Shown {
        return false;
    }
    match settings.display_mode {
        // Visible even when the frequency policy suppressed the widget
        // itself (the instance sits in `Idle`); clicking it force-shows.
        TeaserDisplayMode::Always => state != DisplayState::Submitted && !submitted,
        TeaserDisplayMode::ClosedNotFilled => state == DisplayState::Closed && !submitted,
        TeaserDisplayMode::AfterDelay => {
            state == DisplayState::Pending && deadline.is_some_and(|d| now >= d)
        }
    }
}
