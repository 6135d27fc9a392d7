//! Symptom tracker flow.

use std::collections::BTreeSet;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::{FlowStage, transition};
use crate::error::ToolFlowError;
use crate::session::model::SymptomLog;

const TOOL: &str = "symptom tracker";

/// Symptoms offered by the tracker's picker. Free-text entries are accepted too.
pub const COMMON_SYMPTOMS: &[&str] = &[
    "Headache",
    "Fatigue",
    "Anxiety",
    "Low mood",
    "Insomnia",
    "Nausea",
    "Dizziness",
    "Chest pain",
    "Loss of appetite",
];

/// Symptom form as submitted by the user.
#[derive(Debug, Clone, Deserialize)]
pub struct SymptomForm {
    pub symptoms: Vec<String>,
    pub intensity: i64,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SymptomFlow {
    stage: FlowStage,
}

impl SymptomFlow {
    pub fn stage(&self) -> FlowStage {
        self.stage
    }

    pub fn open(&mut self) {
        let _ = transition(TOOL, &mut self.stage, FlowStage::AwaitingInput);
    }

    /// Log the reported symptoms. Returns the record and its confirmation text.
    pub fn confirm(
        &mut self,
        form: SymptomForm,
        now: DateTime<Local>,
    ) -> Result<(SymptomLog, String), ToolFlowError> {
        if !self.stage.is_awaiting_input() {
            return Err(ToolFlowError::NotAwaitingInput {
                tool: TOOL.to_string(),
                stage: self.stage.to_string(),
            });
        }

        let symptoms: BTreeSet<String> = form
            .symptoms
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        if symptoms.is_empty() {
            return Err(invalid("symptoms", "select at least one symptom"));
        }
        if !(1..=10).contains(&form.intensity) {
            return Err(invalid("intensity", "must be between 1 and 10"));
        }

        let log = SymptomLog {
            timestamp: now,
            symptoms,
            intensity: form.intensity as u8,
            duration: form.duration.trim().to_string(),
            notes: form.notes.trim().to_string(),
        };

        let listed = log.symptoms.iter().cloned().collect::<Vec<_>>().join(", ");
        let duration = if log.duration.is_empty() {
            "unspecified duration".to_string()
        } else {
            log.duration.clone()
        };
        let confirmation = format!(
            "Logged symptoms at {}: {} (intensity {}/10, {})",
            log.timestamp.format(crate::session::model::TIMESTAMP_FORMAT),
            listed,
            log.intensity,
            duration
        );

        transition(TOOL, &mut self.stage, FlowStage::Confirmed)?;
        Ok((log, confirmation))
    }

    pub fn cancel(&mut self) -> Result<String, ToolFlowError> {
        transition(TOOL, &mut self.stage, FlowStage::Cancelled)?;
        Ok("Symptom logging cancelled.".to_string())
    }
}

fn invalid(field: &str, message: &str) -> ToolFlowError {
    ToolFlowError::InvalidInput {
        field: field.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at_noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
    }

    fn form(symptoms: &[&str], intensity: i64) -> SymptomForm {
        SymptomForm {
            symptoms: symptoms.iter().map(|s| s.to_string()).collect(),
            intensity,
            duration: "3 days".to_string(),
            notes: "worse at night".to_string(),
        }
    }

    #[test]
    fn confirm_deduplicates_and_sorts_symptoms() {
        let mut flow = SymptomFlow::default();
        flow.open();
        let (log, text) = flow
            .confirm(form(&["Insomnia", "Headache", "Insomnia", " "], 6), at_noon())
            .unwrap();
        assert_eq!(log.symptoms.len(), 2);
        assert_eq!(
            text,
            "Logged symptoms at 2026-10-16 12:00: Headache, Insomnia (intensity 6/10, 3 days)"
        );
        assert_eq!(log.notes, "worse at night");
        assert_eq!(flow.stage(), FlowStage::Confirmed);
    }

    #[test]
    fn intensity_must_be_in_range() {
        let mut flow = SymptomFlow::default();
        flow.open();
        assert!(flow.confirm(form(&["Fatigue"], 0), at_noon()).is_err());
        assert!(flow.confirm(form(&["Fatigue"], 11), at_noon()).is_err());
        assert!(flow.confirm(form(&["Fatigue"], 10), at_noon()).is_ok());
    }

    #[test]
    fn at_least_one_symptom_required() {
        let mut flow = SymptomFlow::default();
        flow.open();
        let err = flow.confirm(form(&[], 5), at_noon()).unwrap_err();
        assert!(err.to_string().contains("symptoms"));
    }

    #[test]
    fn blank_duration_is_described() {
        let mut flow = SymptomFlow::default();
        flow.open();
        let mut f = form(&["Nausea"], 3);
        f.duration = String::new();
        let (_, text) = flow.confirm(f, at_noon()).unwrap();
        assert!(text.ends_with("(intensity 3/10, unspecified duration)"));
    }

    #[test]
    fn cancel_requires_open_flow() {
        let mut flow = SymptomFlow::default();
        assert!(flow.cancel().is_err());
        flow.open();
        assert_eq!(flow.cancel().unwrap(), "Symptom logging cancelled.");
    }
}
