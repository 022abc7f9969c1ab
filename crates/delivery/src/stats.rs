//! Aggregate per-widget counters maintained from tracked events. The
//! store implements `EventSink` so in-process orchestrators can feed it
//! directly; the events endpoint feeds it over the wire.

use dashmap::DashMap;
use popreach_core::event_bus::{AnalyticsEvent, EventSink};
use popreach_core::types::{EventKind, WidgetStats};

#[derive(Default)]
pub struct StatsStore {
    stats: DashMap<String, WidgetStats>,
}

impl StatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, widget_id: &str, kind: EventKind) {
        let mut entry = self.stats.entry(widget_id.to_string()).or_default();
        match kind {
            EventKind::Visit => entry.visitors += 1,
            EventKind::View => entry.views += 1,
            EventKind::Conversion => entry.submissions += 1,
        }
    }

    /// Zeroed counters for widgets with no recorded events yet.
    pub fn for_widget(&self, widget_id: &str) -> WidgetStats {
        self.stats
            .get(widget_id)
            .map(|entry| *entry.value())
            .unwrap_or_default()
    }
}

impl EventSink for StatsStore {
    fn emit(&self, event: AnalyticsEvent) {
        self.record(&event.widget_id, event.kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use popreach_core::event_bus::make_event;

    #[test]
    fn test_counters_accumulate_per_widget() {
        let store = StatsStore::new();
        store.record("w-1", EventKind::Visit);
        store.record("w-1", EventKind::Visit);
        store.record("w-1", EventKind::View);
        store.record("w-2", EventKind::Conversion);

        assert_eq!(
            store.for_widget("w-1"),
            WidgetStats {
                visitors: 2,
                views: 1,
                submissions: 0,
            }
        );
        assert_eq!(store.for_widget("w-2").submissions, 1);
        assert_eq!(store.for_widget("w-3"), WidgetStats::default());
    }

    #[test]
    fn test_sink_routes_events_into_counters() {
        let store = StatsStore::new();
        store.emit(make_event(EventKind::View, "site-1", "w-1"));
        assert_eq!(store.for_widget("w-1").views, 1);
    }
}
