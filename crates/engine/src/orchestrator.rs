//! Display orchestrator — owns the per-page-view widget registry and
//! mediates between targeting, frequency, the trigger scheduler, the form
//! controller, and the renderer.
//!
//! At most one widget is shown at a time. A trigger firing while another
//! widget occupies the page defers the newcomer; deferred instances are
//! promoted in fire order when the slot frees up.

use crate::chaining::ChainingController;
use crate::form::{FormController, FormOutcome};
use crate::render::{RenderCommand, Renderer};
use crate::scheduler::TriggerScheduler;
use crate::state_machine::DisplayState;
use crate::types::{PageContext, PageEvent, WidgetInstance};
use crate::{frequency, targeting, teaser};
use chrono::{DateTime, Duration, Utc};
use popreach_core::api::{ConfigApi, LeadApi};
use popreach_core::event_bus::{make_event, EventSink};
use popreach_core::types::EventKind;
use popreach_storage::VisitorContextStore;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct DisplayOrchestrator {
    site_id: String,
    config_api: Arc<dyn ConfigApi>,
    events: Arc<dyn EventSink>,
    renderer: Arc<dyn Renderer>,
    store: VisitorContextStore,
    scheduler: TriggerScheduler,
    forms: FormController,
    chaining: ChainingController,
    instances: HashMap<String, WidgetInstance>,
    /// Id of the widget currently occupying the page, if any.
    shown: Option<String>,
    /// Instances whose trigger fired while the page was occupied, in fire
    /// order.
    deferred: VecDeque<String>,
}

impl DisplayOrchestrator {
    pub fn new(
        site_id: impl Into<String>,
        config_api: Arc<dyn ConfigApi>,
        lead_api: Arc<dyn LeadApi>,
        events: Arc<dyn EventSink>,
        renderer: Arc<dyn Renderer>,
        store: VisitorContextStore,
    ) -> Self {
        Self {
            site_id: site_id.into(),
            config_api: config_api.clone(),
            events,
            renderer,
            store,
            scheduler: TriggerScheduler::new(),
            forms: FormController::new(lead_api),
            chaining: ChainingController::new(config_api),
            instances: HashMap::new(),
            shown: None,
            deferred: VecDeque::new(),
        }
    }

    pub fn state_of(&self, widget_id: &str) -> Option<DisplayState> {
        self.instances.get(widget_id).map(|i| i.state())
    }

    pub fn shown_widget(&self) -> Option<&str> {
        self.shown.as_deref()
    }

    pub fn teaser_visible(&self, widget_id: &str) -> bool {
        self.instances
            .get(widget_id)
            .is_some_and(|i| i.teaser_visible)
    }

    /// Runs the activation pipeline for one page view: fetch the site
    /// configuration, evaluate every definition, arm triggers, and show
    /// whatever is eligible immediately. A fetch failure or an empty
    /// configuration is a silent no-op for the host page.
    pub fn activate(&mut self, page: &PageContext, now: DateTime<Utc>) {
        self.store.record_page_view();
        let last_variant = self.store.last_variant_id(&self.site_id);

        let definitions = match self
            .config_api
            .fetch_config(&self.site_id, last_variant.as_deref())
        {
            Ok(definitions) => definitions,
            Err(e) => {
                warn!(site_id = %self.site_id, error = %e, "Config fetch failed; no widgets this page view");
                return;
            }
        };
        debug!(site_id = %self.site_id, count = definitions.len(), "Activating widget definitions");

        for definition in definitions {
            let widget_id = definition.id.clone();
            self.events
                .emit(make_event(EventKind::Visit, &self.site_id, &widget_id));

            let flags = self.store.flags_for(&widget_id);
            let eligible = targeting::matches(page, &definition.targeting)
                && frequency::allows(
                    definition.targeting.frequency,
                    definition.targeting.visitor_count,
                    &flags,
                );

            let mut instance = WidgetInstance::new(definition);
            instance.teaser_deadline = teaser::deadline_for(&instance.definition, now);

            let mut show_now = false;
            if eligible {
                // Idle -> Pending is always legal on a fresh machine.
                let _ = instance.machine.transition(DisplayState::Pending);
                show_now = !self
                    .scheduler
                    .arm(&widget_id, &instance.definition.targeting, now);
            }

            self.instances.insert(widget_id.clone(), instance);
            if show_now {
                self.try_show(&widget_id, now);
            }
            self.refresh_teaser(&widget_id, now);
        }
    }

    /// Feeds one page event through the scheduler and the interaction
    /// handlers.
    pub fn handle_event(&mut self, event: &PageEvent, now: DateTime<Utc>) {
        match event {
            PageEvent::TeaserClicked { widget_id } => {
                self.handle_teaser_click(&widget_id.clone(), now)
            }
            PageEvent::OverlayClicked { widget_id } => {
                let closes = self.shown.as_deref() == Some(widget_id.as_str())
                    && self
                        .instances
                        .get(widget_id)
                        .is_some_and(|i| i.definition.chrome.close_on_overlay_click);
                if closes {
                    self.close(&widget_id.clone(), now);
                }
            }
            PageEvent::CloseRequested { widget_id } => {
                if self.shown.as_deref() == Some(widget_id.as_str()) {
                    self.close(&widget_id.clone(), now);
                }
            }
            PageEvent::ButtonClicked {
                widget_id,
                block_id,
                values,
            } => self.handle_button_click(&widget_id.clone(), block_id, values, now),
            other => {
                let fired = self.scheduler.handle_event(other, now);
                for widget_id in fired {
                    self.try_show(&widget_id, now);
                }
                if matches!(other, PageEvent::Tick) {
                    self.sweep_deadlines(now);
                }
            }
        }
    }

    /// Attempts to move a `Pending` instance to `Shown`. Defers instead
    /// when another widget occupies the page.
    fn try_show(&mut self, widget_id: &str, now: DateTime<Utc>) {
        if let Some(current) = self.shown.as_deref() {
            if current != widget_id {
                if !self.deferred.iter().any(|id| id == widget_id) {
                    debug!(widget_id, occupied_by = current, "Deferring widget");
                    self.deferred.push_back(widget_id.to_string());
                }
                return;
            }
            return;
        }

        let Some(instance) = self.instances.get_mut(widget_id) else {
            return;
        };
        if instance.machine.transition(DisplayState::Shown).is_err() {
            // Stale fire for an instance that moved on.
            return;
        }
        self.scheduler.disarm(widget_id);
        self.shown = Some(widget_id.to_string());

        if instance.teaser_visible {
            instance.teaser_visible = false;
            self.renderer.render(RenderCommand::HideTeaser {
                widget_id: widget_id.to_string(),
            });
        }
        self.renderer.render(RenderCommand::ShowWidget {
            widget_id: widget_id.to_string(),
            page_index: instance.current_page_index,
        });

        if !instance.view_recorded {
            instance.view_recorded = true;
            self.events
                .emit(make_event(EventKind::View, &self.site_id, widget_id));
        }
        self.store.mark_shown(widget_id);
        if instance.definition.experiment_group_id.is_some() {
            self.store.set_last_variant_id(&self.site_id, widget_id);
        }
        instance.auto_close_deadline = instance
            .definition
            .chrome
            .auto_close_secs
            .map(|secs| now + Duration::seconds(secs as i64));
        info!(widget_id, "Widget shown");
    }

    /// Closes the shown widget, re-evaluates its teaser, and promotes the
    /// next deferred instance.
    fn close(&mut self, widget_id: &str, now: DateTime<Utc>) {
        if let Some(instance) = self.instances.get_mut(widget_id) {
            if instance.machine.transition(DisplayState::Closed).is_err() {
                return;
            }
        } else {
            return;
        }
        self.scheduler.disarm(widget_id);
        self.renderer.render(RenderCommand::HideWidget {
            widget_id: widget_id.to_string(),
        });
        if self.shown.as_deref() == Some(widget_id) {
            self.shown = None;
        }
        self.refresh_teaser(widget_id, now);
        self.promote_deferred(now);
    }

    /// Removes a finished instance from the registry entirely.
    fn dispose(&mut self, widget_id: &str, now: DateTime<Utc>) {
        self.instances.remove(widget_id);
        self.scheduler.disarm(widget_id);
        self.renderer.render(RenderCommand::HideWidget {
            widget_id: widget_id.to_string(),
        });
        if self.shown.as_deref() == Some(widget_id) {
            self.shown = None;
        }
        self.deferred.retain(|id| id != widget_id);
        self.promote_deferred(now);
    }

    fn promote_deferred(&mut self, now: DateTime<Utc>) {
        while self.shown.is_none() {
            let Some(next) = self.deferred.pop_front() else {
                return;
            };
            self.try_show(&next, now);
        }
    }

    fn handle_teaser_click(&mut self, widget_id: &str, now: DateTime<Utc>) {
        let Some(instance) = self.instances.get_mut(widget_id) else {
            return;
        };
        match instance.state() {
            DisplayState::Shown | DisplayState::Submitted => return,
            // Re-arm after a dismissal, or force past a frequency
            // suppression that left the instance in Idle.
            DisplayState::Closed | DisplayState::Idle => {
                if instance.machine.transition(DisplayState::Pending).is_err() {
                    return;
                }
            }
            DisplayState::Pending => {}
        }
        // The click consumes the teaser immediately, even when the
        // display slot is occupied and the widget has to wait its turn.
        if instance.teaser_visible {
            instance.teaser_visible = false;
            self.renderer.render(RenderCommand::HideTeaser {
                widget_id: widget_id.to_string(),
            });
        }
        // The explicit click outranks whatever triggers were armed.
        self.scheduler.disarm(widget_id);
        self.try_show(widget_id, now);
    }

    fn handle_button_click(
        &mut self,
        widget_id: &str,
        block_id: &str,
        values: &HashMap<String, String>,
        now: DateTime<Utc>,
    ) {
        // Clicks for anything but the shown widget are stale.
        if self.shown.as_deref() != Some(widget_id) {
            return;
        }
        let Some(instance) = self.instances.get_mut(widget_id) else {
            return;
        };

        let outcome = self.forms.handle_button(instance, block_id, values);
        match outcome {
            FormOutcome::Ignored => {}
            FormOutcome::Refused { errors } => {
                self.renderer.render(RenderCommand::FieldErrors {
                    widget_id: widget_id.to_string(),
                    errors,
                });
            }
            FormOutcome::Advanced { page_index } => {
                self.renderer.render(RenderCommand::ShowPage {
                    widget_id: widget_id.to_string(),
                    page_index,
                });
            }
            FormOutcome::SubmitFailed { message } => {
                self.renderer.render(RenderCommand::SubmitError {
                    widget_id: widget_id.to_string(),
                    message,
                });
            }
            FormOutcome::Submitted => self.complete_submission(widget_id, now),
            FormOutcome::CloseRequested => self.close(widget_id, now),
            FormOutcome::Navigate { url } => {
                self.renderer.render(RenderCommand::Navigate { url });
                self.close(widget_id, now);
            }
            FormOutcome::Chain { target_widget_id } => self.chain_to(widget_id, &target_widget_id, now),
        }
    }

    fn complete_submission(&mut self, widget_id: &str, now: DateTime<Utc>) {
        let Some(instance) = self.instances.get_mut(widget_id) else {
            return;
        };
        if instance.machine.transition(DisplayState::Submitted).is_err() {
            return;
        }
        self.store.mark_submitted(widget_id);
        self.events
            .emit(make_event(EventKind::Conversion, &self.site_id, widget_id));

        let thank_you_page = instance.definition.thank_you_page_index;
        let display_secs = instance.definition.chrome.thank_you.display_secs;
        instance.thank_you_deadline = Some(now + Duration::seconds(display_secs as i64));
        if instance.teaser_visible {
            instance.teaser_visible = false;
            self.renderer.render(RenderCommand::HideTeaser {
                widget_id: widget_id.to_string(),
            });
        }
        self.renderer.render(RenderCommand::ShowThankYou {
            widget_id: widget_id.to_string(),
            page_index: thank_you_page,
        });
        info!(widget_id, "Lead submitted");
    }

    /// Closes the current widget and hands the display slot directly to
    /// the chain target, ahead of anything deferred.
    fn chain_to(&mut self, from_widget_id: &str, target_widget_id: &str, now: DateTime<Utc>) {
        if let Some(instance) = self.instances.get_mut(from_widget_id) {
            let _ = instance.machine.transition(DisplayState::Closed);
        }
        self.scheduler.disarm(from_widget_id);
        self.renderer.render(RenderCommand::HideWidget {
            widget_id: from_widget_id.to_string(),
        });
        if self.shown.as_deref() == Some(from_widget_id) {
            self.shown = None;
        }

        match self.chaining.resolve(target_widget_id) {
            Ok(Some(mut instance)) => {
                // Targeting and frequency are bypassed: the click is the
                // trigger.
                let _ = instance.machine.transition(DisplayState::Pending);
                self.instances
                    .insert(target_widget_id.to_string(), instance);
                self.try_show(target_widget_id, now);
            }
            Ok(None) | Err(_) => self.promote_deferred(now),
        }
    }

    /// Expires auto-close, thank-you, and delayed-teaser deadlines.
    fn sweep_deadlines(&mut self, now: DateTime<Utc>) {
        if let Some(widget_id) = self.shown.clone() {
            if let Some(instance) = self.instances.get(&widget_id) {
                match instance.state() {
                    DisplayState::Shown
                        if instance.auto_close_deadline.is_some_and(|d| now >= d) =>
                    {
                        self.close(&widget_id, now);
                    }
                    DisplayState::Submitted
                        if instance.thank_you_deadline.is_some_and(|d| now >= d) =>
                    {
                        self.dispose(&widget_id, now);
                    }
                    _ => {}
                }
            }
        }

        let delayed: Vec<String> = self
            .instances
            .values()
            .filter(|i| !i.teaser_visible && i.teaser_deadline.is_some())
            .map(|i| i.widget_id().to_string())
            .collect();
        for widget_id in delayed {
            self.refresh_teaser(&widget_id, now);
        }
    }

    /// Reconciles an instance's teaser visibility with what its display
    /// mode demands, emitting show/hide commands only on change.
    fn refresh_teaser(&mut self, widget_id: &str, now: DateTime<Utc>) {
        let submitted = self.store.submitted_this_session(widget_id);
        let Some(instance) = self.instances.get_mut(widget_id) else {
            return;
        };
        let Some(settings) = instance.definition.chrome.teaser.as_ref() else {
            return;
        };
        let desired = teaser::should_show(
            settings,
            instance.state(),
            submitted,
            instance.teaser_deadline,
            now,
        );
        if desired == instance.teaser_visible {
            return;
        }
        instance.teaser_visible = desired;
        let command = if desired {
            RenderCommand::ShowTeaser {
                widget_id: widget_id.to_string(),
            }
        } else {
            RenderCommand::HideTeaser {
                widget_id: widget_id.to_string(),
            }
        };
        self.renderer.render(command);
    }
}
