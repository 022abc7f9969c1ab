//! Multi-step form controller — per-page validation, flat field
//! collection, and partial saves against the Lead API.
//!
//! The first successful save creates the draft lead; its id is echoed on
//! every later save so the server merges instead of duplicating. A failed
//! partial save is warning-only: the values stay on the instance and ride
//! along with the next navigation action.

use crate::types::{FieldError, WidgetInstance};
use popreach_core::api::LeadApi;
use popreach_core::types::{ButtonAction, ContentBlock, FieldValidation, LeadSaveRequest};
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

/// What a button click resolved to. The orchestrator maps these onto
/// state transitions and render commands.
#[derive(Debug, Clone, PartialEq)]
pub enum FormOutcome {
    /// The click hit nothing actionable on the current page.
    Ignored,
    /// Validation failed; no state change, errors go to the renderer.
    Refused { errors: Vec<FieldError> },
    /// Final save failed; the widget stays shown for a retry.
    SubmitFailed { message: String },
    /// Moved to another page of the widget.
    Advanced { page_index: usize },
    /// Final save succeeded.
    Submitted,
    CloseRequested,
    /// Saved, then the browser navigates away.
    Navigate { url: String },
    /// Saved and closed; the chaining controller takes over.
    Chain { target_widget_id: String },
}

/// Drives page navigation and persistence for shown widgets.
pub struct FormController {
    lead_api: Arc<dyn LeadApi>,
}

impl FormController {
    pub fn new(lead_api: Arc<dyn LeadApi>) -> Self {
        Self { lead_api }
    }

    /// Resolves a click on the button block `block_id` of the instance's
    /// current page. `values` holds the page's input values keyed by
    /// block id.
    pub fn handle_button(
        &self,
        instance: &mut WidgetInstance,
        block_id: &str,
        values: &HashMap<String, String>,
    ) -> FormOutcome {
        let Some(page) = instance.current_page() else {
            return FormOutcome::Ignored;
        };
        let Some((action, action_url, trigger_widget_id)) =
            page.blocks.iter().find_map(|block| match block {
                ContentBlock::Button {
                    id,
                    action,
                    action_url,
                    trigger_widget_id,
                    ..
                } if id == block_id => {
                    Some((*action, action_url.clone(), trigger_widget_id.clone()))
                }
                _ => None,
            })
        else {
            return FormOutcome::Ignored;
        };

        match action {
            ButtonAction::Prev => {
                if instance.current_page_index == 0 {
                    return FormOutcome::Ignored;
                }
                instance.current_page_index -= 1;
                FormOutcome::Advanced {
                    page_index: instance.current_page_index,
                }
            }
            ButtonAction::Close => FormOutcome::CloseRequested,
            ButtonAction::Next => {
                let errors = self.validate_page(instance, values);
                if !errors.is_empty() {
                    return FormOutcome::Refused { errors };
                }
                // Partial-save failure is tolerated; the values are
                // retained and retried on the next action.
                let _ = self.save_page(instance, values);
                if instance.current_page_index + 1 < instance.definition.pages.len() {
                    instance.current_page_index += 1;
                }
                FormOutcome::Advanced {
                    page_index: instance.current_page_index,
                }
            }
            ButtonAction::Submit => {
                let errors = self.validate_page(instance, values);
                if !errors.is_empty() {
                    return FormOutcome::Refused { errors };
                }
                match self.save_page(instance, values) {
                    Ok(()) => FormOutcome::Submitted,
                    Err(message) => FormOutcome::SubmitFailed { message },
                }
            }
            ButtonAction::Link => {
                let _ = self.save_page(instance, values);
                match action_url {
                    Some(url) => FormOutcome::Navigate { url },
                    None => FormOutcome::Ignored,
                }
            }
            ButtonAction::TriggerPopup => {
                let _ = self.save_page(instance, values);
                match trigger_widget_id {
                    Some(target_widget_id) => FormOutcome::Chain { target_widget_id },
                    None => FormOutcome::Ignored,
                }
            }
        }
    }

    /// Validates every data-bearing block on the current page.
    pub fn validate_page(
        &self,
        instance: &WidgetInstance,
        values: &HashMap<String, String>,
    ) -> Vec<FieldError> {
        let Some(page) = instance.current_page() else {
            return Vec::new();
        };

        let mut errors = Vec::new();
        for block in page.blocks.iter().filter(|b| b.is_input()) {
            let value = values.get(block.id()).map(String::as_str).unwrap_or("");
            if let Some(validation) = block.validation() {
                if let Some(message) = validate_value(value, validation) {
                    errors.push(FieldError {
                        block_id: block.id().to_string(),
                        message,
                    });
                    continue;
                }
            }
            // Email inputs always get a format check when non-empty.
            if matches!(block, ContentBlock::EmailInput { .. })
                && !value.is_empty()
                && !matches_pattern(value, EMAIL_PATTERN)
            {
                errors.push(FieldError {
                    block_id: block.id().to_string(),
                    message: "Invalid email address".to_string(),
                });
            }
        }
        errors
    }

    /// Collects the current page's fields into a flat key→value map and
    /// posts a partial save. On success the returned lead id is recorded
    /// (first call only) and the retained values are cleared; on failure
    /// the merged values stay on the instance for the next attempt.
    fn save_page(
        &self,
        instance: &mut WidgetInstance,
        values: &HashMap<String, String>,
    ) -> Result<(), String> {
        let mut data = std::mem::take(&mut instance.unsaved_data);
        let mut email = None;
        if let Some(page) = instance.current_page() {
            for block in page.blocks.iter().filter(|b| b.is_input()) {
                let Some(value) = values.get(block.id()) else {
                    continue;
                };
                if matches!(block, ContentBlock::EmailInput { .. }) && email.is_none() {
                    email = Some(value.clone());
                }
                if let Some(key) = block.field_key() {
                    data.insert(key.to_string(), value.clone());
                }
            }
        }

        let request = LeadSaveRequest {
            site_id: instance.definition.site_id.clone(),
            popup_id: instance.definition.id.clone(),
            email,
            data: Some(data.clone()),
            lead_id: instance.draft_lead_id.clone(),
        };

        match self.lead_api.save_lead(&request) {
            Ok(record) => {
                instance.record_draft_lead_id(record.id);
                Ok(())
            }
            Err(e) => {
                warn!(
                    widget_id = %instance.definition.id,
                    error = %e,
                    "Partial lead save failed; retaining form state"
                );
                instance.unsaved_data = data;
                Err(e.to_string())
            }
        }
    }
}

fn validate_value(value: &str, validation: &FieldValidation) -> Option<String> {
    if validation.required && value.trim().is_empty() {
        return Some("This field is required".to_string());
    }
    if value.is_empty() {
        return None;
    }
    if let Some(min) = validation.min_len {
        if value.chars().count() < min {
            return Some(format!("Must be at least {min} characters"));
        }
    }
    if let Some(max) = validation.max_len {
        if value.chars().count() > max {
            return Some(format!("Must be at most {max} characters"));
        }
    }
    if let Some(pattern) = validation.pattern.as_deref() {
        // An invalid pattern disables the check rather than failing the
        // field.
        if let Ok(re) = Regex::new(pattern) {
            if !re.is_match(value) {
                return Some("Invalid format".to_string());
            }
        }
    }
    None
}

fn matches_pattern(value: &str, pattern: &str) -> bool {
    Regex::new(pattern).map(|re| re.is_match(value)).unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WidgetInstance;
    use popreach_core::api::RecordingLeadApi;
    use popreach_core::types::{
        ButtonAction, ContentBlock, FieldValidation, WidgetChrome, WidgetDefinition, WidgetKind,
        WidgetPage,
    };

    fn two_page_definition() -> WidgetDefinition {
        WidgetDefinition {
            id: "w-1".into(),
            site_id: "site-1".into(),
            kind: WidgetKind::Popup,
            experiment_group_id: None,
            variant_label: None,
            chrome: WidgetChrome::default(),
            targeting: Default::default(),
            pages: vec![
                WidgetPage {
                    blocks: vec![
                        ContentBlock::EmailInput {
                            id: "email".into(),
                            label: "email".into(),
                            placeholder: String::new(),
                            validation: FieldValidation {
                                required: true,
                                ..Default::default()
                            },
                        },
                        ContentBlock::Button {
                            id: "next".into(),
                            label: "Next".into(),
                            action: ButtonAction::Next,
                            action_url: None,
                            trigger_widget_id: None,
                        },
                    ],
                },
                WidgetPage {
                    blocks: vec![
                        ContentBlock::TextInput {
                            id: "name".into(),
                            label: "name".into(),
                            placeholder: String::new(),
                            validation: FieldValidation::default(),
                        },
                        ContentBlock::Button {
                            id: "prev".into(),
                            label: "Back".into(),
                            action: ButtonAction::Prev,
                            action_url: None,
                            trigger_widget_id: None,
                        },
                        ContentBlock::Button {
                            id: "submit".into(),
                            label: "Subscribe".into(),
                            action: ButtonAction::Submit,
                            action_url: None,
                            trigger_widget_id: None,
                        },
                    ],
                },
            ],
            thank_you_page_index: None,
            is_active: true,
        }
    }

    fn controller() -> (Arc<RecordingLeadApi>, FormController) {
        let api = Arc::new(RecordingLeadApi::new());
        let controller = FormController::new(api.clone());
        (api, controller)
    }

    #[test]
    fn test_next_refused_when_required_field_empty() {
        let (api, controller) = controller();
        let mut instance = WidgetInstance::new(two_page_definition());

        let outcome = controller.handle_button(&mut instance, "next", &HashMap::new());
        match outcome {
            FormOutcome::Refused { errors } => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].block_id, "email");
            }
            other => panic!("Expected Refused, got {other:?}"),
        }
        assert_eq!(instance.current_page_index, 0);
        assert_eq!(api.call_count(), 0);
    }

    #[test]
    fn test_next_saves_without_lead_id_then_submit_reuses_it() {
        let (api, controller) = controller();
        let mut instance = WidgetInstance::new(two_page_definition());

        let values = HashMap::from([("email".to_string(), "a@b.co".to_string())]);
        let outcome = controller.handle_button(&mut instance, "next", &values);
        assert_eq!(outcome, FormOutcome::Advanced { page_index: 1 });

        let lead_id = instance.draft_lead_id.clone().expect("draft lead id set");

        let values = HashMap::from([("name".to_string(), "Ada".to_string())]);
        let outcome = controller.handle_button(&mut instance, "submit", &values);
        assert_eq!(outcome, FormOutcome::Submitted);

        let calls = api.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].lead_id, None);
        assert_eq!(calls[1].lead_id, Some(lead_id));
        assert_eq!(calls[0].email.as_deref(), Some("a@b.co"));
        assert_eq!(calls[1].data.as_ref().unwrap().get("name").unwrap(), "Ada");
    }

    #[test]
    fn test_invalid_email_refused() {
        let (_, controller) = controller();
        let mut instance = WidgetInstance::new(two_page_definition());

        let values = HashMap::from([("email".to_string(), "not-an-email".to_string())]);
        let outcome = controller.handle_button(&mut instance, "next", &values);
        assert!(matches!(outcome, FormOutcome::Refused { .. }));
    }

    #[test]
    fn test_prev_does_not_save(){
        let (api, controller) = controller();
        let mut instance = WidgetInstance::new(two_page_definition());
        instance.current_page_index = 1;

        let outcome = controller.handle_button(&mut instance, "prev", &HashMap::new());
        assert_eq!(outcome, FormOutcome::Advanced { page_index: 0 });
        assert_eq!(api.call_count(), 0);
    }

    #[test]
    fn test_partial_save_failure_retains_values_and_retries() {
        let (api, controller) = controller();
        let mut instance = WidgetInstance::new(two_page_definition());

        api.set_fail_next(true);
        let values = HashMap::from([("email".to_string(), "a@b.co".to_string())]);
        let outcome = controller.handle_button(&mut instance, "next", &values);
        // Navigation still succeeds; the failure is warning-only.
        assert_eq!(outcome, FormOutcome::Advanced { page_index: 1 });
        assert!(instance.draft_lead_id.is_none());
        assert_eq!(instance.unsaved_data.get("email").unwrap(), "a@b.co");

        // The next action retries with the same (still-null) lead id and
        // carries the retained values along.
        let values = HashMap::from([("name".to_string(), "Ada".to_string())]);
        let outcome = controller.handle_button(&mut instance, "submit", &values);
        assert_eq!(outcome, FormOutcome::Submitted);

        let calls = api.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].lead_id, None);
        let data = calls[0].data.as_ref().unwrap();
        assert_eq!(data.get("email").unwrap(), "a@b.co");
        assert_eq!(data.get("name").unwrap(), "Ada");
        assert!(instance.unsaved_data.is_empty());
    }

    #[test]
    fn test_submit_failure_surfaces_inline_error() {
        let (api, controller) = controller();
        let mut instance = WidgetInstance::new(two_page_definition());
        instance.current_page_index = 1;

        api.set_fail_next(true);
        let outcome = controller.handle_button(&mut instance, "submit", &HashMap::new());
        assert!(matches!(outcome, FormOutcome::SubmitFailed { .. }));
    }

    #[test]
    fn test_min_max_and_pattern_validation() {
        let validation = FieldValidation {
            required: false,
            min_len: Some(3),
            max_len: Some(5),
            pattern: Some("^[a-z]+$".into()),
        };
        assert!(validate_value("", &validation).is_none());
        assert!(validate_value("ab", &validation).is_some());
        assert!(validate_value("abcdef", &validation).is_some());
        assert!(validate_value("ABC", &validation).is_some());
        assert!(validate_value("abc", &validation).is_none());
    }

    #[test]
    fn test_invalid_pattern_disables_check() {
        let validation = FieldValidation {
            pattern: Some("(".into()),
            ..Default::default()
        };
        assert!(validate_value("anything", &validation).is_none());
    }
}
