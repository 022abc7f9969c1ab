//! Trigger scheduler — arms, evaluates, and tears down the scheduling
//! listeners of `Pending` widget instances.
//!
//! Triggers are disjunctive: the first one to fire wins and every other
//! listener of that instance is torn down in the same call, before the
//! caller acts on the transition. Re-registration happens only on an
//! explicit `Closed → Pending` re-arm.

use crate::types::PageEvent;
use chrono::{DateTime, Duration, Utc};
use popreach_core::types::TargetingSettings;
use tracing::debug;

#[derive(Debug)]
struct InactivityTimer {
    duration: Duration,
    deadline: DateTime<Utc>,
}

/// The armed listeners of one widget instance.
#[derive(Debug)]
struct ArmedTriggers {
    widget_id: String,
    time_deadline: Option<DateTime<Utc>>,
    scroll_percentage: Option<u8>,
    click_selector: Option<String>,
    inactivity: Option<InactivityTimer>,
    exit_intent: bool,
}

/// Evaluates page events against armed triggers. One scheduler serves the
/// whole page; instances are keyed by widget id.
#[derive(Debug, Default)]
pub struct TriggerScheduler {
    armed: Vec<ArmedTriggers>,
    /// Exit intent fires at most once per page load, shared across every
    /// instance that requested it.
    exit_intent_fired: bool,
}

impl TriggerScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers exactly the listeners implied by the non-empty
    /// scheduling fields of `settings`. Returns `false` when there is
    /// nothing to wait for and the instance should show immediately.
    pub fn arm(
        &mut self,
        widget_id: &str,
        settings: &TargetingSettings,
        now: DateTime<Utc>,
    ) -> bool {
        if !settings.has_schedule_triggers() {
            return false;
        }
        // Re-arming replaces any previous registration.
        self.disarm(widget_id);

        self.armed.push(ArmedTriggers {
            widget_id: widget_id.to_string(),
            time_deadline: settings
                .time_delay_secs
                .map(|secs| now + Duration::seconds(secs as i64)),
            scroll_percentage: settings.scroll_percentage,
            click_selector: settings.click_selector.clone(),
            inactivity: settings.inactivity_secs.map(|secs| {
                let duration = Duration::seconds(secs as i64);
                InactivityTimer {
                    duration,
                    deadline: now + duration,
                }
            }),
            exit_intent: settings.exit_intent,
        });
        debug!(widget_id, "Armed scheduling triggers");
        true
    }

    /// Removes every listener of the given instance.
    pub fn disarm(&mut self, widget_id: &str) {
        self.armed.retain(|t| t.widget_id != widget_id);
    }

    pub fn is_armed(&self, widget_id: &str) -> bool {
        self.armed.iter().any(|t| t.widget_id == widget_id)
    }

    /// Evaluates one page event. Returns the ids of instances whose
    /// trigger fired, in arming order; their listeners are already torn
    /// down when this returns.
    pub fn handle_event(&mut self, event: &PageEvent, now: DateTime<Utc>) -> Vec<String> {
        // Any interaction counts as activity for inactivity timers.
        if matches!(
            event,
            PageEvent::Activity | PageEvent::Scroll { .. } | PageEvent::Click { .. }
        ) {
            for trigger in &mut self.armed {
                if let Some(timer) = trigger.inactivity.as_mut() {
                    timer.deadline = now + timer.duration;
                }
            }
        }

        // The shared exit-intent listener is consumed by its first fire;
        // later mouse-outs are invisible to every instance.
        if matches!(event, PageEvent::MouseLeave) && self.exit_intent_fired {
            return Vec::new();
        }
        let exit_intent_armed = self.armed.iter().any(|t| t.exit_intent);

        let fired: Vec<String> = self
            .armed
            .iter()
            .filter(|trigger| Self::fires(trigger, event, now))
            .map(|t| t.widget_id.clone())
            .collect();

        // Synchronous teardown before the caller sees the transitions.
        for widget_id in &fired {
            self.disarm(widget_id);
        }

        if matches!(event, PageEvent::MouseLeave) && exit_intent_armed {
            self.exit_intent_fired = true;
        }

        fired
    }

    fn fires(trigger: &ArmedTriggers, event: &PageEvent, now: DateTime<Utc>) -> bool {
        match event {
            PageEvent::Tick | PageEvent::Activity => {
                if trigger.time_deadline.is_some_and(|d| now >= d) {
                    return true;
                }
                // Activity just reset the inactivity deadline, so only
                // Tick can observe it expired.
                matches!(event, PageEvent::Tick)
                    && trigger.inactivity.as_ref().is_some_and(|t| now >= t.deadline)
            }
            PageEvent::Scroll { depth_percent } => {
                trigger
                    .scroll_percentage
                    .is_some_and(|threshold| *depth_percent >= threshold)
                    || trigger.time_deadline.is_some_and(|d| now >= d)
            }
            PageEvent::Click { matched_selectors } => {
                trigger
                    .click_selector
                    .as_ref()
                    .is_some_and(|sel| matched_selectors.iter().any(|m| m == sel))
                    || trigger.time_deadline.is_some_and(|d| now >= d)
            }
            PageEvent::MouseLeave => trigger.exit_intent,
            _ => false,
        }
    }

    /// True once the shared exit-intent listener has been consumed.
    pub fn exit_intent_fired(&self) -> bool {
        self.exit_intent_fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn settings() -> TargetingSettings {
        TargetingSettings::default()
    }

    #[test]
    fn test_no_triggers_means_show_immediately() {
        let mut scheduler = TriggerScheduler::new();
        assert!(!scheduler.arm("w-1", &settings(), now()));
        assert!(!scheduler.is_armed("w-1"));
    }

    #[test]
    fn test_time_delay_fires_on_tick_after_deadline() {
        let mut scheduler = TriggerScheduler::new();
        let t0 = now();
        let armed = scheduler.arm(
            "w-1",
            &TargetingSettings {
                time_delay_secs: Some(5),
                ..settings()
            },
            t0,
        );
        assert!(armed);

        assert!(scheduler
            .handle_event(&PageEvent::Tick, t0 + Duration::seconds(4))
            .is_empty());
        let fired = scheduler.handle_event(&PageEvent::Tick, t0 + Duration::seconds(5));
        assert_eq!(fired, vec!["w-1".to_string()]);
        assert!(!scheduler.is_armed("w-1"));
    }

    #[test]
    fn test_scroll_threshold() {
        let mut scheduler = TriggerScheduler::new();
        let t0 = now();
        scheduler.arm(
            "w-1",
            &TargetingSettings {
                scroll_percentage: Some(50),
                ..settings()
            },
            t0,
        );

        assert!(scheduler
            .handle_event(&PageEvent::Scroll { depth_percent: 30 }, t0)
            .is_empty());
        let fired = scheduler.handle_event(&PageEvent::Scroll { depth_percent: 60 }, t0);
        assert_eq!(fired, vec!["w-1".to_string()]);
    }

    #[test]
    fn test_click_selector_delegation() {
        let mut scheduler = TriggerScheduler::new();
        let t0 = now();
        scheduler.arm(
            "w-1",
            &TargetingSettings {
                click_selector: Some("#open-offer".into()),
                ..settings()
            },
            t0,
        );

        let miss = scheduler.handle_event(
            &PageEvent::Click {
                matched_selectors: vec![".nav".into()],
            },
            t0,
        );
        assert!(miss.is_empty());

        let hit = scheduler.handle_event(
            &PageEvent::Click {
                matched_selectors: vec!["#open-offer".into()],
            },
            t0,
        );
        assert_eq!(hit, vec!["w-1".to_string()]);
    }

    #[test]
    fn test_inactivity_resets_on_activity() {
        let mut scheduler = TriggerScheduler::new();
        let t0 = now();
        scheduler.arm(
            "w-1",
            &TargetingSettings {
                inactivity_secs: Some(10),
                ..settings()
            },
            t0,
        );

        // Activity at t+8 pushes the deadline to t+18.
        assert!(scheduler
            .handle_event(&PageEvent::Activity, t0 + Duration::seconds(8))
            .is_empty());
        assert!(scheduler
            .handle_event(&PageEvent::Tick, t0 + Duration::seconds(12))
            .is_empty());
        let fired = scheduler.handle_event(&PageEvent::Tick, t0 + Duration::seconds(18));
        assert_eq!(fired, vec!["w-1".to_string()]);
    }

    #[test]
    fn test_exit_intent_fires_once_per_page_load() {
        let mut scheduler = TriggerScheduler::new();
        let t0 = now();
        scheduler.arm(
            "w-1",
            &TargetingSettings {
                exit_intent: true,
                ..settings()
            },
            t0,
        );
        scheduler.arm(
            "w-2",
            &TargetingSettings {
                exit_intent: true,
                ..settings()
            },
            t0,
        );

        let fired = scheduler.handle_event(&PageEvent::MouseLeave, t0);
        assert_eq!(fired, vec!["w-1".to_string(), "w-2".to_string()]);
        assert!(scheduler.exit_intent_fired());

        // A later instance arming exit intent never sees the event again.
        scheduler.arm(
            "w-3",
            &TargetingSettings {
                exit_intent: true,
                ..settings()
            },
            t0,
        );
        assert!(scheduler.handle_event(&PageEvent::MouseLeave, t0).is_empty());
    }

    #[test]
    fn test_first_trigger_wins_and_tears_down_the_rest() {
        let mut scheduler = TriggerScheduler::new();
        let t0 = now();
        scheduler.arm(
            "w-1",
            &TargetingSettings {
                time_delay_secs: Some(30),
                scroll_percentage: Some(40),
                ..settings()
            },
            t0,
        );

        let fired = scheduler.handle_event(&PageEvent::Scroll { depth_percent: 45 }, t0);
        assert_eq!(fired, vec!["w-1".to_string()]);

        // The time delay was torn down with the instance.
        assert!(scheduler
            .handle_event(&PageEvent::Tick, t0 + Duration::seconds(60))
            .is_empty());
    }

    #[test]
    fn test_disarm_cancels_pending_timers() {
        let mut scheduler = TriggerScheduler::new();
        let t0 = now();
        scheduler.arm(
            "w-1",
            &TargetingSettings {
                time_delay_secs: Some(1),
                ..settings()
            },
            t0,
        );
        scheduler.disarm("w-1");
        assert!(scheduler
            .handle_event(&PageEvent::Tick, t0 + Duration::seconds(5))
            .is_empty());
    }
}
