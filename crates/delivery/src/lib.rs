//! Server-side delivery: the widget catalog, experiment variant
//! rotation, lead persistence, and event-derived stats.

pub mod catalog;
pub mod leads;
pub mod stats;
pub mod variants;

pub use catalog::{seed_demo_widgets, WidgetCatalog};
pub use leads::LeadStore;
pub use stats::StatsStore;
