//! Sessions: per-user context, data models, and the live-session registry.

pub mod model;
pub mod state;
pub mod store;

pub use model::{
    Appointment, AppointmentKind, HealthEntry, HealthForm, Message, MessageRole, Mood,
    ProfileForm, SymptomLog, UserProfile,
};
pub use state::{Session, SessionSnapshot, ToolVisibility};
pub use store::{SessionStore, spawn_idle_sweep};
