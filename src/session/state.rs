//! Per-session context: everything one conversation accumulates.

use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::Serialize;
use uuid::Uuid;

use crate::error::SessionError;
use crate::session::model::{
    Appointment, HealthEntry, Message, MessageRole, SymptomLog, UserProfile,
};
use crate::tools::{AppointmentFlow, ConsultationFlow, FlowStage, SymptomFlow};

/// State owned by one user session. Handlers receive it explicitly.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    profile: Option<UserProfile>,
    pub messages: Vec<Message>,
    pub health_log: Vec<HealthEntry>,
    pub symptom_logs: Vec<SymptomLog>,
    pub appointments: Vec<Appointment>,
    /// Opening of the last visible reply, fed into the next prompt.
    pub summary: String,
    pub uploaded_files: Vec<PathBuf>,
    pub consultation: ConsultationFlow,
    pub appointment: AppointmentFlow,
    pub symptoms: SymptomFlow,
    pub created_at: DateTime<Local>,
}

impl Session {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            profile: None,
            messages: Vec::new(),
            health_log: Vec::new(),
            symptom_logs: Vec::new(),
            appointments: Vec::new(),
            summary: String::new(),
            uploaded_files: Vec::new(),
            consultation: ConsultationFlow::default(),
            appointment: AppointmentFlow::default(),
            symptoms: SymptomFlow::default(),
            created_at: Local::now(),
        }
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    /// Record the intake profile. It can only be set once.
    pub fn set_profile(&mut self, profile: UserProfile) -> Result<(), SessionError> {
        if self.profile.is_some() {
            return Err(SessionError::ProfileAlreadyCollected);
        }
        self.profile = Some(profile);
        Ok(())
    }

    /// The profile, or `ProfileRequired` before intake.
    pub fn require_profile(&self) -> Result<&UserProfile, SessionError> {
        self.profile.as_ref().ok_or(SessionError::ProfileRequired)
    }

    pub fn latest_health(&self) -> Option<&HealthEntry> {
        self.health_log.last()
    }

    /// Text of the most recent user message.
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
    }

    pub fn tool_visibility(&self) -> ToolVisibility {
        ToolVisibility {
            consultation: self.consultation.stage().is_awaiting_input(),
            appointment: self.appointment.stage().is_awaiting_input(),
            symptoms: self.symptoms.stage().is_awaiting_input(),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            profile: self.profile.clone(),
            messages: self.messages.clone(),
            health_log: self.health_log.clone(),
            symptom_logs: self.symptom_logs.clone(),
            appointments: self.appointments.clone(),
            summary: self.summary.clone(),
            uploaded_files: self.uploaded_files.clone(),
            tools: self.tool_visibility(),
            consultation: ConsultationStatus {
                stage: self.consultation.stage(),
                message: self.consultation.status_message(),
            },
            created_at: self.created_at,
        }
    }
}

/// Which tool panels are currently open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ToolVisibility {
    pub consultation: bool,
    pub appointment: bool,
    pub symptoms: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsultationStatus {
    pub stage: FlowStage,
    pub message: String,
}

/// Read-only view of a session returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub profile: Option<UserProfile>,
    pub messages: Vec<Message>,
    pub health_log: Vec<HealthEntry>,
    pub symptom_logs: Vec<SymptomLog>,
    pub appointments: Vec<Appointment>,
    pub summary: String,
    pub uploaded_files: Vec<PathBuf>,
    pub tools: ToolVisibility,
    pub consultation: ConsultationStatus,
    pub created_at: DateTime<Local>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Urgency;

    fn profile() -> UserProfile {
        UserProfile {
            name: "Sam".to_string(),
            age: 40,
            ethnicity: Some("Irish".to_string()),
        }
    }

    #[test]
    fn profile_is_set_once() {
        let mut session = Session::new(Uuid::new_v4());
        assert!(matches!(
            session.require_profile(),
            Err(SessionError::ProfileRequired)
        ));

        session.set_profile(profile()).unwrap();
        assert_eq!(session.require_profile().unwrap().name, "Sam");
        assert!(matches!(
            session.set_profile(profile()),
            Err(SessionError::ProfileAlreadyCollected)
        ));
    }

    #[test]
    fn last_user_message_skips_assistant() {
        let mut session = Session::new(Uuid::new_v4());
        assert!(session.last_user_message().is_none());
        session.messages.push(Message::user("first"));
        session.messages.push(Message::user("second"));
        session.messages.push(Message::assistant("reply"));
        assert_eq!(session.last_user_message(), Some("second"));
    }

    #[test]
    fn snapshot_reports_open_tools() {
        let mut session = Session::new(Uuid::new_v4());
        assert_eq!(session.snapshot().tools, ToolVisibility::default());

        session.consultation.open("low mood", Urgency::Urgent);
        session.symptoms.open();
        let snapshot = session.snapshot();
        assert!(snapshot.tools.consultation);
        assert!(!snapshot.tools.appointment);
        assert!(snapshot.tools.symptoms);
        assert_eq!(snapshot.consultation.stage, FlowStage::AwaitingInput);
        assert!(snapshot.consultation.message.contains("Connect Now"));
    }

    #[test]
    fn snapshot_serializes() {
        let mut session = Session::new(Uuid::new_v4());
        session.set_profile(profile()).unwrap();
        let json = serde_json::to_value(session.snapshot()).unwrap();
        assert_eq!(json["profile"]["name"], "Sam");
        assert_eq!(json["consultation"]["stage"], "idle");
        assert_eq!(json["tools"]["symptoms"], false);
    }
}
