//! Display orchestration engine for embeddable popup and notification
//! widgets.
//!
//! The engine is DOM-free and deterministic: the host captures page state
//! into a [`types::PageContext`], feeds interactions in as typed
//! [`types::PageEvent`]s with an explicit `now`, and materializes the
//! declarative [`render::RenderCommand`]s the orchestrator emits.
//!
//! One [`orchestrator::DisplayOrchestrator`] serves one page view. It owns
//! every widget instance of the page and guarantees that at most one
//! widget occupies the display slot at a time.

pub mod chaining;
pub mod form;
pub mod frequency;
pub mod orchestrator;
pub mod render;
pub mod scheduler;
pub mod state_machine;
pub mod targeting;
pub mod teaser;
pub mod types;

pub use orchestrator::DisplayOrchestrator;
pub use render::{RenderCommand, Renderer};
pub use state_machine::{DisplayState, DisplayStateMachine};
pub use types::{PageContext, PageEvent};
