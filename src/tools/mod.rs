//! Tool UI flows: doctor consultation, appointment scheduling, symptom logging.
//!
//! Each flow is a small state machine over `FlowStage`. A flow is opened
//! (by the user or by a model directive), waits for one form submission or
//! cancellation, and ends in a terminal stage that produces a confirmation
//! string. Opening a finished flow starts a fresh request.

pub mod appointment;
pub mod consultation;
pub mod symptoms;

pub use appointment::{AppointmentFlow, AppointmentForm};
pub use consultation::{
    ConsultationFlow, ConsultationOutcome, ContactLaunch, ContactMethod, DOCTORS, Doctor,
    Urgency,
};
pub use symptoms::{SymptomFlow, SymptomForm};

use serde::{Deserialize, Serialize};

use crate::error::ToolFlowError;

/// Stage of a tool flow.
///
/// Progresses Idle → AwaitingInput → (Confirmed | Cancelled). Terminal
/// stages may reopen to AwaitingInput when a new request arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FlowStage {
    #[default]
    Idle,
    AwaitingInput,
    Confirmed,
    Cancelled,
}

impl FlowStage {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: FlowStage) -> bool {
        use FlowStage::*;
        matches!(
            (self, target),
            (Idle, AwaitingInput)
                | (AwaitingInput, Confirmed)
                | (AwaitingInput, Cancelled)
                | (Confirmed, AwaitingInput)
                | (Cancelled, AwaitingInput)
        )
    }

    /// Whether the flow has finished.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Cancelled)
    }

    /// Whether the flow's form should be visible.
    pub fn is_awaiting_input(&self) -> bool {
        matches!(self, Self::AwaitingInput)
    }
}

impl std::fmt::Display for FlowStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::AwaitingInput => "awaiting_input",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// Move `stage` to `target`, or report which tool refused the transition.
pub(crate) fn transition(
    tool: &str,
    stage: &mut FlowStage,
    target: FlowStage,
) -> Result<(), ToolFlowError> {
    if *stage == FlowStage::AwaitingInput && target == FlowStage::AwaitingInput {
        // Re-opening an open form keeps it open.
        return Ok(());
    }
    if !stage.can_transition_to(target) {
        return Err(ToolFlowError::NotAwaitingInput {
            tool: tool.to_string(),
            stage: stage.to_string(),
        });
    }
    *stage = target;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_transitions() {
        use FlowStage::*;
        let transitions = [
            (Idle, AwaitingInput),
            (AwaitingInput, Confirmed),
            (AwaitingInput, Cancelled),
            (Confirmed, AwaitingInput),
            (Cancelled, AwaitingInput),
        ];
        for (from, to) in transitions {
            assert!(from.can_transition_to(to), "{from} should transition to {to}");
        }
    }

    #[test]
    fn invalid_transitions() {
        use FlowStage::*;
        assert!(!Idle.can_transition_to(Confirmed));
        assert!(!Idle.can_transition_to(Cancelled));
        assert!(!Confirmed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Confirmed));
        assert!(!AwaitingInput.can_transition_to(Idle));
    }

    #[test]
    fn transition_reports_tool_and_stage() {
        let mut stage = FlowStage::Idle;
        let err = transition("symptom tracker", &mut stage, FlowStage::Confirmed).unwrap_err();
        assert_eq!(
            err.to_string(),
            "symptom tracker is not awaiting input (stage: idle)"
        );
        assert_eq!(stage, FlowStage::Idle);
    }

    #[test]
    fn reopening_an_open_flow_is_a_no_op() {
        let mut stage = FlowStage::AwaitingInput;
        assert!(transition("appointments", &mut stage, FlowStage::AwaitingInput).is_ok());
        assert_eq!(stage, FlowStage::AwaitingInput);
    }

    #[test]
    fn display_matches_serde() {
        use FlowStage::*;
        for stage in [Idle, AwaitingInput, Confirmed, Cancelled] {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(format!("\"{stage}\""), json);
        }
    }
}
