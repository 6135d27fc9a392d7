//! Session data models: profile, conversation, and health logs.

use std::collections::BTreeSet;

use chrono::{DateTime, Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Display format used for log timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Basic demographics collected once at the start of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub age: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ethnicity: Option<String>,
}

impl UserProfile {
    /// Ethnicity as shown in prompts.
    pub fn ethnicity_or_default(&self) -> &str {
        self.ethnicity.as_deref().unwrap_or("Not provided")
    }
}

/// Raw profile intake form as submitted by the user.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileForm {
    pub name: String,
    pub age: i64,
    #[serde(default)]
    pub ethnicity: Option<String>,
}

impl ProfileForm {
    /// Validate the form into a `UserProfile`.
    pub fn into_profile(self) -> Result<UserProfile, SessionError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(SessionError::invalid("name", "must not be empty"));
        }
        if !(1..=120).contains(&self.age) {
            return Err(SessionError::invalid("age", "must be between 1 and 120"));
        }
        let ethnicity = self
            .ethnicity
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());

        Ok(UserProfile {
            name: name.to_string(),
            age: self.age as u8,
            ethnicity,
        })
    }
}

/// Author of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A message in the visible conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Self-reported mood on a three-point scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Low,
    #[default]
    Neutral,
    High,
}

impl Mood {
    /// Emoji shown on the mood slider.
    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Low => "😞",
            Self::Neutral => "😐",
            Self::High => "😊",
        }
    }
}

impl std::fmt::Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Neutral => "neutral",
            Self::High => "high",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Mood {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" | "😞" => Ok(Self::Low),
            "neutral" | "😐" => Ok(Self::Neutral),
            "high" | "😊" => Ok(Self::High),
            other => Err(SessionError::invalid(
                "mood",
                format!("expected low, neutral or high, got '{other}'"),
            )),
        }
    }
}

/// One health-tracker entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthEntry {
    pub timestamp: DateTime<Local>,
    pub weight_kg: f64,
    pub mood: Mood,
    pub sleep_hours: f64,
}

impl HealthEntry {
    pub fn display_timestamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Health-tracker form as submitted by the user.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HealthForm {
    pub weight_kg: f64,
    #[serde(default)]
    pub mood: Mood,
    pub sleep_hours: f64,
}

impl HealthForm {
    /// Validate against the tracker's input ranges and stamp the entry.
    pub fn into_entry(self, timestamp: DateTime<Local>) -> Result<HealthEntry, SessionError> {
        if !(0.0..=200.0).contains(&self.weight_kg) {
            return Err(SessionError::invalid("weight_kg", "must be between 0 and 200"));
        }
        if !(0.0..=24.0).contains(&self.sleep_hours) {
            return Err(SessionError::invalid("sleep_hours", "must be between 0 and 24"));
        }
        Ok(HealthEntry {
            timestamp,
            weight_kg: self.weight_kg,
            mood: self.mood,
            sleep_hours: self.sleep_hours,
        })
    }
}

/// A confirmed symptom report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymptomLog {
    pub timestamp: DateTime<Local>,
    pub symptoms: BTreeSet<String>,
    pub intensity: u8,
    pub duration: String,
    pub notes: String,
}

/// How an appointment takes place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentKind {
    #[default]
    InPerson,
    Video,
    Phone,
}

impl std::fmt::Display for AppointmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InPerson => "In-person visit",
            Self::Video => "Video consultation",
            Self::Phone => "Phone consultation",
        };
        write!(f, "{s}")
    }
}

/// A confirmed appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub timestamp: DateTime<Local>,
    pub specialist: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub kind: AppointmentKind,
    pub notes: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, age: i64, ethnicity: Option<&str>) -> ProfileForm {
        ProfileForm {
            name: name.to_string(),
            age,
            ethnicity: ethnicity.map(String::from),
        }
    }

    #[test]
    fn profile_form_validates_age_range() {
        assert!(form("Ana", 1, None).into_profile().is_ok());
        assert!(form("Ana", 120, None).into_profile().is_ok());
        assert!(matches!(
            form("Ana", 0, None).into_profile(),
            Err(SessionError::InvalidInput { ref field, .. }) if field == "age"
        ));
        assert!(form("Ana", 121, None).into_profile().is_err());
    }

    #[test]
    fn profile_form_trims_and_drops_blank_ethnicity() {
        let profile = form("  Ana  ", 34, Some("   ")).into_profile().unwrap();
        assert_eq!(profile.name, "Ana");
        assert!(profile.ethnicity.is_none());
        assert_eq!(profile.ethnicity_or_default(), "Not provided");

        let profile = form("Ana", 34, Some(" Hispanic ")).into_profile().unwrap();
        assert_eq!(profile.ethnicity.as_deref(), Some("Hispanic"));
    }

    #[test]
    fn profile_form_rejects_empty_name() {
        assert!(form("   ", 30, None).into_profile().is_err());
    }

    #[test]
    fn mood_parses_words_and_emoji() {
        assert_eq!("low".parse::<Mood>().unwrap(), Mood::Low);
        assert_eq!(" HIGH ".parse::<Mood>().unwrap(), Mood::High);
        assert_eq!("😐".parse::<Mood>().unwrap(), Mood::Neutral);
        assert!("ecstatic".parse::<Mood>().is_err());
    }

    #[test]
    fn mood_display_matches_serde() {
        for mood in [Mood::Low, Mood::Neutral, Mood::High] {
            let json = serde_json::to_string(&mood).unwrap();
            assert_eq!(format!("\"{mood}\""), json);
        }
    }

    #[test]
    fn health_form_enforces_ranges() {
        let now = Local::now();
        let ok = HealthForm {
            weight_kg: 70.5,
            mood: Mood::High,
            sleep_hours: 7.0,
        };
        let entry = ok.into_entry(now).unwrap();
        assert_eq!(entry.mood, Mood::High);
        assert_eq!(entry.display_timestamp().len(), 16);

        let heavy = HealthForm {
            weight_kg: 250.0,
            mood: Mood::Low,
            sleep_hours: 7.0,
        };
        assert!(heavy.into_entry(now).is_err());

        let sleepy = HealthForm {
            weight_kg: 70.0,
            mood: Mood::Low,
            sleep_hours: 25.0,
        };
        assert!(sleepy.into_entry(now).is_err());
    }

    #[test]
    fn health_form_mood_defaults_to_neutral() {
        let form: HealthForm =
            serde_json::from_str(r#"{"weight_kg": 80, "sleep_hours": 6}"#).unwrap();
        assert_eq!(form.mood, Mood::Neutral);
    }
}
