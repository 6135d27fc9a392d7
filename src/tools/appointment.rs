//! Appointment scheduling flow.

use chrono::{DateTime, Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::{FlowStage, transition};
use crate::error::ToolFlowError;
use crate::session::model::{Appointment, AppointmentKind};

const TOOL: &str = "appointment scheduler";

/// Appointment form as submitted by the user.
#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentForm {
    pub specialist: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    #[serde(default)]
    pub kind: AppointmentKind,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AppointmentFlow {
    stage: FlowStage,
}

impl AppointmentFlow {
    pub fn stage(&self) -> FlowStage {
        self.stage
    }

    /// Show the scheduling form.
    pub fn open(&mut self) {
        let _ = transition(TOOL, &mut self.stage, FlowStage::AwaitingInput);
    }

    /// Book the appointment. Returns the record and its confirmation text.
    pub fn confirm(
        &mut self,
        form: AppointmentForm,
        now: DateTime<Local>,
    ) -> Result<(Appointment, String), ToolFlowError> {
        if !self.stage.is_awaiting_input() {
            return Err(ToolFlowError::NotAwaitingInput {
                tool: TOOL.to_string(),
                stage: self.stage.to_string(),
            });
        }
        let specialist = form.specialist.trim();
        if specialist.is_empty() {
            return Err(ToolFlowError::InvalidInput {
                field: "specialist".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        let appointment = Appointment {
            timestamp: now,
            specialist: specialist.to_string(),
            date: form.date,
            time: form.time,
            kind: form.kind,
            notes: form.notes.trim().to_string(),
        };
        let mut confirmation = format!(
            "Appointment scheduled with {} on {} at {} ({})",
            appointment.specialist,
            appointment.date.format("%Y-%m-%d"),
            appointment.time.format("%H:%M"),
            appointment.kind,
        );
        if !appointment.notes.is_empty() {
            confirmation.push_str(&format!(". Notes: {}", appointment.notes));
        }

        transition(TOOL, &mut self.stage, FlowStage::Confirmed)?;
        Ok((appointment, confirmation))
    }

    pub fn cancel(&mut self) -> Result<String, ToolFlowError> {
        transition(TOOL, &mut self.stage, FlowStage::Cancelled)?;
        Ok("Appointment scheduling cancelled.".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> AppointmentForm {
        AppointmentForm {
            specialist: "Dr. Williams (Depression Specialist)".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 11, 3).unwrap(),
            time: NaiveTime::from_hms_opt(14, 30, 0).unwrap(),
            kind: AppointmentKind::Video,
            notes: String::new(),
        }
    }

    #[test]
    fn confirm_formats_confirmation() {
        let mut flow = AppointmentFlow::default();
        flow.open();
        let (appointment, text) = flow.confirm(form(), Local::now()).unwrap();
        assert_eq!(appointment.kind, AppointmentKind::Video);
        assert_eq!(
            text,
            "Appointment scheduled with Dr. Williams (Depression Specialist) on 2026-11-03 \
             at 14:30 (Video consultation)"
        );
        assert_eq!(flow.stage(), FlowStage::Confirmed);
    }

    #[test]
    fn notes_are_appended() {
        let mut flow = AppointmentFlow::default();
        flow.open();
        let mut f = form();
        f.notes = "  bring sleep diary ".to_string();
        let (_, text) = flow.confirm(f, Local::now()).unwrap();
        assert!(text.ends_with(". Notes: bring sleep diary"));
    }

    #[test]
    fn confirm_before_open_is_rejected() {
        let mut flow = AppointmentFlow::default();
        assert!(matches!(
            flow.confirm(form(), Local::now()),
            Err(ToolFlowError::NotAwaitingInput { .. })
        ));
    }

    #[test]
    fn empty_specialist_is_rejected() {
        let mut flow = AppointmentFlow::default();
        flow.open();
        let mut f = form();
        f.specialist = " ".to_string();
        assert!(flow.confirm(f, Local::now()).is_err());
        assert_eq!(flow.stage(), FlowStage::AwaitingInput);
    }

    #[test]
    fn form_deserializes_with_defaults() {
        let f: AppointmentForm = serde_json::from_str(
            r#"{"specialist": "Dr. Smith", "date": "2026-12-01", "time": "09:15:00"}"#,
        )
        .unwrap();
        assert_eq!(f.kind, AppointmentKind::InPerson);
        assert!(f.notes.is_empty());
    }
}
