//! Renderer seam — the orchestrator emits declarative render commands;
//! the host translates them into DOM mutations. Tests use the recording
//! implementation and never need a DOM.

use crate::types::FieldError;
use std::sync::{Arc, Mutex};

/// One declarative rendering instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    /// Render chrome plus the given page's content blocks.
    ShowWidget { widget_id: String, page_index: usize },
    /// Swap the interactive page of an already-shown widget.
    ShowPage { widget_id: String, page_index: usize },
    /// Surface per-field validation errors on the current page.
    FieldErrors {
        widget_id: String,
        errors: Vec<FieldError>,
    },
    /// Inline error after a failed final submit; the widget stays up.
    SubmitError { widget_id: String, message: String },
    /// Render the thank-you confirmation; `page_index` selects a custom
    /// thank-you page when the definition has one.
    ShowThankYou {
        widget_id: String,
        page_index: Option<usize>,
    },
    HideWidget { widget_id: String },
    ShowTeaser { widget_id: String },
    HideTeaser { widget_id: String },
    /// Navigate the browser to the given URL (link button action).
    Navigate { url: String },
}

/// Trait the host implements to materialize render commands.
pub trait Renderer: Send + Sync {
    fn render(&self, command: RenderCommand);
}

/// Renderer that drops every command.
pub struct NoOpRenderer;

impl Renderer for NoOpRenderer {
    fn render(&self, _command: RenderCommand) {}
}

/// In-memory renderer that captures commands for assertions.
#[derive(Default)]
pub struct RecordingRenderer {
    commands: Mutex<Vec<RenderCommand>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<RenderCommand> {
        self.commands.lock().expect("renderer mutex poisoned").clone()
    }

    pub fn count(&self) -> usize {
        self.commands.lock().expect("renderer mutex poisoned").len()
    }

    pub fn clear(&self) {
        self.commands.lock().expect("renderer mutex poisoned").clear();
    }
}

impl Renderer for RecordingRenderer {
    fn render(&self, command: RenderCommand) {
        self.commands
            .lock()
            .expect("renderer mutex poisoned")
            .push(command);
    }
}

/// Convenience: create a recording renderer for tests.
pub fn recording_renderer() -> Arc<RecordingRenderer> {
    Arc::new(RecordingRenderer::new())
}
