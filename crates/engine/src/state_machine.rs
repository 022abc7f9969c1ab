use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Lifecycle states of a widget instance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DisplayState {
    /// Registered, targeting passed, frequency not yet granted or
    /// permanently suppressed.
    Idle,
    /// Eligible; waiting for a scheduling trigger to fire.
    Pending,
    /// Overlay rendered on the page.
    Shown,
    /// Final submit succeeded. Terminal.
    Submitted,
    /// Dismissed. Terminal unless a teaser or chain explicitly re-arms.
    Closed,
}

/// Describes a single valid state transition for a widget instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: DisplayState,
    pub to: DisplayState,
    pub trigger: String,
}

/// Guards the widget-instance lifecycle by enforcing a finite set of
/// valid state transitions.
#[derive(Debug, Clone)]
pub struct DisplayStateMachine {
    pub state: DisplayState,
    pub transitions: Vec<StateTransition>,
}

impl DisplayStateMachine {
    /// Creates a new state machine starting in `Idle` with all valid
    /// transitions pre-configured.
    pub fn new() -> Self {
        let transitions = vec![
            StateTransition {
                from: DisplayState::Idle,
                to: DisplayState::Pending,
                trigger: "eligible".to_string(),
            },
            StateTransition {
                from: DisplayState::Pending,
                to: DisplayState::Shown,
                trigger: "trigger_fired".to_string(),
            },
            StateTransition {
                from: DisplayState::Shown,
                to: DisplayState::Closed,
                trigger: "dismissed".to_string(),
            },
            StateTransition {
                from: DisplayState::Shown,
                to: DisplayState::Submitted,
                trigger: "final_submit".to_string(),
            },
            // Only the teaser and chaining controllers request this.
            StateTransition {
                from: DisplayState::Closed,
                to: DisplayState::Pending,
                trigger: "re_arm".to_string(),
            },
        ];

        Self {
            state: DisplayState::Idle,
            transitions,
        }
    }

    /// Returns `true` if the given transition is allowed.
    pub fn can_transition(&self, from: DisplayState, to: DisplayState) -> bool {
        self.transitions
            .iter()
            .any(|t| t.from == from && t.to == to)
    }

    /// Attempts to move the state machine to `to`. Returns an error if
    /// the transition is not permitted.
    pub fn transition(&mut self, to: DisplayState) -> Result<()> {
        if self.can_transition(self.state, to) {
            self.state = to;
            Ok(())
        } else {
            Err(anyhow!(
                "Invalid display transition from {:?} to {:?}",
                self.state,
                to
            ))
        }
    }
}

impl Default for DisplayStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_to_submitted() {
        let mut m = DisplayStateMachine::new();
        m.transition(DisplayState::Pending).unwrap();
        m.transition(DisplayState::Shown).unwrap();
        m.transition(DisplayState::Submitted).unwrap();
        assert_eq!(m.state, DisplayState::Submitted);
    }

    #[test]
    fn test_submitted_is_terminal() {
        let mut m = DisplayStateMachine::new();
        m.transition(DisplayState::Pending).unwrap();
        m.transition(DisplayState::Shown).unwrap();
        m.transition(DisplayState::Submitted).unwrap();

        assert!(m.transition(DisplayState::Pending).is_err());
        assert!(m.transition(DisplayState::Shown).is_err());
        assert!(m.transition(DisplayState::Closed).is_err());
    }

    #[test]
    fn test_closed_re_arms_to_pending_only() {
        let mut m = DisplayStateMachine::new();
        m.transition(DisplayState::Pending).unwrap();
        m.transition(DisplayState::Shown).unwrap();
        m.transition(DisplayState::Closed).unwrap();

        assert!(!m.can_transition(DisplayState::Closed, DisplayState::Shown));
        m.transition(DisplayState::Pending).unwrap();
        m.transition(DisplayState::Shown).unwrap();
        assert_eq!(m.state, DisplayState::Shown);
    }

    #[test]
    fn test_idle_cannot_skip_to_shown() {
        let mut m = DisplayStateMachine::new();
        assert!(m.transition(DisplayState::Shown).is_err());
        assert_eq!(m.state, DisplayState::Idle);
    }
}
