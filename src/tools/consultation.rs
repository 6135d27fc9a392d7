//! Doctor consultation flow.
//!
//! Opened by the user or by a `[CALL_DOCTOR]` directive in a model reply.
//! The user picks a specialist from a fixed directory and a contact method;
//! confirming produces the confirmation text and the contact to launch.

use serde::{Deserialize, Serialize};

use super::{FlowStage, transition};
use crate::error::ToolFlowError;

const TOOL: &str = "doctor consultation";

/// Shown while the flow waits for the user to connect.
pub const PENDING_MESSAGE: &str =
    "Doctor consultation pending. Please click 'Connect Now' to proceed.";

/// How pressing a consultation request is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    #[default]
    Normal,
    Urgent,
    Emergency,
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Normal => "normal",
            Self::Urgent => "urgent",
            Self::Emergency => "emergency",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Urgency {
    type Err = ToolFlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "urgent" => Ok(Self::Urgent),
            "emergency" => Ok(Self::Emergency),
            other => Err(ToolFlowError::InvalidInput {
                field: "urgency".to_string(),
                message: format!("expected normal, urgent or emergency, got '{other}'"),
            }),
        }
    }
}

/// A specialist the user can be connected with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Doctor {
    pub id: &'static str,
    pub name: &'static str,
    pub specialty: &'static str,
    pub phone: &'static str,
}

impl Doctor {
    /// Label shown in the specialist picker, e.g. `Dr. Smith (General Psychiatrist)`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.specialty)
    }

    /// Find a doctor by id or picker label (case-insensitive).
    pub fn find(key: &str) -> Option<&'static Doctor> {
        let key = key.trim();
        DOCTORS.iter().find(|d| {
            d.id.eq_ignore_ascii_case(key)
                || d.name.eq_ignore_ascii_case(key)
                || d.label().eq_ignore_ascii_case(key)
        })
    }
}

/// The specialist directory.
pub const DOCTORS: &[Doctor] = &[
    Doctor {
        id: "smith",
        name: "Dr. Smith",
        specialty: "General Psychiatrist",
        phone: "+1-555-0123",
    },
    Doctor {
        id: "johnson",
        name: "Dr. Johnson",
        specialty: "Anxiety Specialist",
        phone: "+1-555-0124",
    },
    Doctor {
        id: "williams",
        name: "Dr. Williams",
        specialty: "Depression Specialist",
        phone: "+1-555-0125",
    },
];

/// How to reach the doctor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContactMethod {
    #[default]
    PhoneCall,
    VideoCall,
}

impl std::fmt::Display for ContactMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PhoneCall => write!(f, "Phone Call"),
            Self::VideoCall => write!(f, "Video Call"),
        }
    }
}

impl std::str::FromStr for ContactMethod {
    type Err = ToolFlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(' ', "_").as_str() {
            "phone" | "phone_call" => Ok(Self::PhoneCall),
            "video" | "video_call" => Ok(Self::VideoCall),
            other => Err(ToolFlowError::InvalidInput {
                field: "method".to_string(),
                message: format!("expected phone or video, got '{other}'"),
            }),
        }
    }
}

/// What the client should launch once the consultation is confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContactLaunch {
    /// Open the host's telephony handler.
    Tel { uri: String },
    /// Video calls are a placeholder notice for now.
    Video { notice: String },
}

/// Why a consultation was requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsultationRequest {
    pub reason: String,
    pub urgency: Urgency,
}

/// Result of confirming a consultation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsultationOutcome {
    pub doctor: String,
    pub method: ContactMethod,
    pub reason: String,
    pub urgency: Urgency,
    pub confirmation: String,
    pub launch: ContactLaunch,
}

/// Consultation flow state for one session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConsultationFlow {
    stage: FlowStage,
    request: Option<ConsultationRequest>,
    outcome: Option<ConsultationOutcome>,
}

impl ConsultationFlow {
    pub fn stage(&self) -> FlowStage {
        self.stage
    }

    pub fn request(&self) -> Option<&ConsultationRequest> {
        self.request.as_ref()
    }

    pub fn outcome(&self) -> Option<&ConsultationOutcome> {
        self.outcome.as_ref()
    }

    /// Recommend a consultation and show the specialist picker.
    ///
    /// A request arriving while the picker is already open replaces the
    /// pending reason and urgency.
    pub fn open(&mut self, reason: impl Into<String>, urgency: Urgency) {
        // Every stage may move to AwaitingInput, so this cannot fail.
        let _ = transition(TOOL, &mut self.stage, FlowStage::AwaitingInput);
        self.request = Some(ConsultationRequest {
            reason: reason.into(),
            urgency,
        });
        self.outcome = None;
    }

    /// Connect with the chosen doctor.
    pub fn confirm(
        &mut self,
        doctor_key: &str,
        method: ContactMethod,
    ) -> Result<ConsultationOutcome, ToolFlowError> {
        if !self.stage.is_awaiting_input() {
            return Err(ToolFlowError::NotAwaitingInput {
                tool: TOOL.to_string(),
                stage: self.stage.to_string(),
            });
        }
        let doctor = Doctor::find(doctor_key)
            .ok_or_else(|| ToolFlowError::UnknownDoctor(doctor_key.to_string()))?;
        let request = self.request.clone().unwrap_or(ConsultationRequest {
            reason: "General consultation".to_string(),
            urgency: Urgency::Normal,
        });

        let label = doctor.label();
        let launch = match method {
            ContactMethod::PhoneCall => ContactLaunch::Tel {
                uri: format!("tel:{}", doctor.phone),
            },
            ContactMethod::VideoCall => ContactLaunch::Video {
                notice: format!("Initiating video call with {label}"),
            },
        };
        let outcome = ConsultationOutcome {
            confirmation: format!(
                "Consultation arranged with {label} via {method} for {} (Urgency: {})",
                request.reason, request.urgency
            ),
            doctor: label,
            method,
            reason: request.reason,
            urgency: request.urgency,
            launch,
        };

        transition(TOOL, &mut self.stage, FlowStage::Confirmed)?;
        self.outcome = Some(outcome.clone());
        Ok(outcome)
    }

    /// Dismiss the picker without connecting.
    pub fn cancel(&mut self) -> Result<String, ToolFlowError> {
        transition(TOOL, &mut self.stage, FlowStage::Cancelled)?;
        Ok("Doctor consultation cancelled.".to_string())
    }

    /// Status line for the current stage.
    pub fn status_message(&self) -> String {
        match self.stage {
            FlowStage::Idle => "No doctor consultation requested.".to_string(),
            FlowStage::AwaitingInput => PENDING_MESSAGE.to_string(),
            FlowStage::Confirmed => self
                .outcome
                .as_ref()
                .map(|o| o.confirmation.clone())
                .unwrap_or_default(),
            FlowStage::Cancelled => "Doctor consultation cancelled.".to_string(),
        }
    }
}
