//! Interaction handlers shared by the HTTP API and the terminal REPL.
//!
//! Every handler takes the session it acts on explicitly. Callers obtain the
//! session from the `SessionStore` and hold its lock for the whole call, so
//! one session sees at most one handler at a time.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use serde::Serialize;
use tracing::{info, warn};

use crate::agent::directive::{DirectiveOutcome, ToolDirective, extract_directive};
use crate::agent::prompts::{
    QuickQuery, chat_prompt, followup_prompt, health_check_prompt, summarize_reply,
    truncate_response,
};
use crate::agent::WellnessAgent;
use crate::config::AppConfig;
use crate::documents::{DocumentReader, DocumentSummary, save_upload};
use crate::error::{Result, SessionError};
use crate::language::{LanguageDetector, detect_language};
use crate::session::{
    Appointment, HealthForm, Message, ProfileForm, Session, SessionStore, SymptomLog,
    ToolVisibility, UserProfile,
};
use crate::tools::{AppointmentForm, ConsultationOutcome, ContactMethod, SymptomForm, Urgency};

/// Prefix put in front of the reply to a saved health entry.
pub const HEALTH_CHECK_PREFIX: &str = "**Health Check**:\n";

/// What the user sees after an agent turn.
#[derive(Debug, Clone, Serialize)]
pub struct Reply {
    /// Visible assistant message, as appended to the conversation.
    pub message: String,
    /// Consultation request found in the model output, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directive: Option<ToolDirective>,
    /// The model emitted a directive marker that could not be parsed.
    pub malformed_directive: bool,
    pub tools: ToolVisibility,
}

/// Result of processing an uploaded document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReply {
    pub document: DocumentSummary,
    pub reply: Reply,
}

pub struct WellnessService {
    agent: WellnessAgent,
    detector: Box<dyn LanguageDetector>,
    documents: DocumentReader,
    sessions: Arc<SessionStore>,
    uploads_dir: PathBuf,
    max_response_words: usize,
    default_language: String,
}

impl WellnessService {
    pub fn new(
        agent: WellnessAgent,
        detector: Box<dyn LanguageDetector>,
        sessions: Arc<SessionStore>,
        config: &AppConfig,
    ) -> Self {
        Self {
            agent,
            detector,
            documents: DocumentReader,
            sessions,
            uploads_dir: config.uploads_dir.clone(),
            max_response_words: config.max_response_words,
            default_language: config.default_language.clone(),
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn model_name(&self) -> &str {
        self.agent.model_name()
    }

    // ── Intake ──────────────────────────────────────────────────────

    pub fn submit_profile(&self, session: &mut Session, form: ProfileForm) -> Result<UserProfile> {
        let profile = form.into_profile()?;
        session.set_profile(profile.clone())?;
        info!(session_id = %session.id, "Profile collected");
        Ok(profile)
    }

    // ── Conversation ────────────────────────────────────────────────

    /// Answer a message typed into the chat box.
    pub async fn chat(&self, session: &mut Session, text: &str) -> Result<Reply> {
        let profile = session.require_profile()?.clone();
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::invalid("message", "must not be empty").into());
        }

        session.messages.push(Message::user(text));
        let language = detect_language(self.detector.as_ref(), text, &self.default_language);
        let prompt = chat_prompt(
            &profile,
            session.latest_health(),
            &language,
            &session.summary,
            text,
        );
        let raw = self.agent.run(session.id, &prompt).await;
        Ok(self.deliver_reply(session, &raw, None))
    }

    /// Send one of the canned queries.
    pub async fn quick_query(&self, session: &mut Session, query: QuickQuery) -> Result<Reply> {
        session.require_profile()?;
        session.messages.push(Message::user(query.message()));
        self.reply_to_latest(session).await
    }

    /// Log a health-tracker entry and ask the agent to comment on it.
    pub async fn save_progress(&self, session: &mut Session, form: HealthForm) -> Result<Reply> {
        let profile = session.require_profile()?.clone();
        let entry = form.into_entry(Local::now())?;
        let prompt = health_check_prompt(&profile, &entry);
        session.health_log.push(entry);
        info!(session_id = %session.id, entries = session.health_log.len(), "Progress saved");

        let raw = self.agent.run(session.id, &prompt).await;
        Ok(self.deliver_reply(session, &raw, Some(HEALTH_CHECK_PREFIX)))
    }

    // ── Documents ───────────────────────────────────────────────────

    pub fn upload_document(
        &self,
        session: &mut Session,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<PathBuf> {
        session.require_profile()?;
        let path = save_upload(&self.uploads_dir, file_name, bytes, Local::now())?;
        session.uploaded_files.push(path.clone());
        Ok(path)
    }

    /// Read an uploaded document and hand its contents to the agent.
    pub async fn process_document(&self, session: &mut Session, path: &Path) -> Result<DocumentReply> {
        session.require_profile()?;
        if !session.uploaded_files.iter().any(|p| p == path) {
            return Err(SessionError::invalid("path", "not a file uploaded in this session").into());
        }

        let document = self.documents.read(path);
        if let Some(error) = &document.error {
            warn!(path = %path.display(), error = %error, "Document could not be read");
        }
        session
            .messages
            .push(Message::user(format!("Process this file: {}", document.to_prompt_text())));
        let reply = self.reply_to_latest(session).await?;
        Ok(DocumentReply { document, reply })
    }

    // ── Doctor consultation ─────────────────────────────────────────

    /// Open the consultation picker on the user's own initiative.
    pub fn open_consultation(
        &self,
        session: &mut Session,
        reason: Option<&str>,
        urgency: Urgency,
    ) -> Result<String> {
        session.require_profile()?;
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or("Requested by user");
        session.consultation.open(reason, urgency);
        Ok(session.consultation.status_message())
    }

    pub fn confirm_consultation(
        &self,
        session: &mut Session,
        doctor: &str,
        method: ContactMethod,
    ) -> Result<ConsultationOutcome> {
        session.require_profile()?;
        let outcome = session.consultation.confirm(doctor, method)?;
        session.messages.push(Message::assistant(&outcome.confirmation));
        info!(session_id = %session.id, doctor = %outcome.doctor, method = %outcome.method, "Consultation arranged");
        Ok(outcome)
    }

    pub fn cancel_consultation(&self, session: &mut Session) -> Result<String> {
        Ok(session.consultation.cancel()?)
    }

    // ── Appointments ────────────────────────────────────────────────

    pub fn open_appointment(&self, session: &mut Session) -> Result<()> {
        session.require_profile()?;
        session.appointment.open();
        Ok(())
    }

    pub fn confirm_appointment(
        &self,
        session: &mut Session,
        form: AppointmentForm,
    ) -> Result<(Appointment, String)> {
        session.require_profile()?;
        let (appointment, confirmation) = session.appointment.confirm(form, Local::now())?;
        session.appointments.push(appointment.clone());
        session.messages.push(Message::assistant(&confirmation));
        Ok((appointment, confirmation))
    }

    pub fn cancel_appointment(&self, session: &mut Session) -> Result<String> {
        Ok(session.appointment.cancel()?)
    }

    // ── Symptoms ────────────────────────────────────────────────────

    pub fn open_symptoms(&self, session: &mut Session) -> Result<()> {
        session.require_profile()?;
        session.symptoms.open();
        Ok(())
    }

    pub fn confirm_symptoms(
        &self,
        session: &mut Session,
        form: SymptomForm,
    ) -> Result<(SymptomLog, String)> {
        session.require_profile()?;
        let (log, confirmation) = session.symptoms.confirm(form, Local::now())?;
        session.symptom_logs.push(log.clone());
        session.messages.push(Message::assistant(&confirmation));
        Ok((log, confirmation))
    }

    pub fn cancel_symptoms(&self, session: &mut Session) -> Result<String> {
        Ok(session.symptoms.cancel()?)
    }

    // ── Reply delivery ──────────────────────────────────────────────

    /// Follow-up turn answering the latest user message in the history.
    async fn reply_to_latest(&self, session: &mut Session) -> Result<Reply> {
        let profile = session.require_profile()?.clone();
        let latest = session.last_user_message().unwrap_or_default().to_string();
        let language = detect_language(self.detector.as_ref(), &latest, &self.default_language);
        let prompt = followup_prompt(&profile, &language, &session.summary, &latest);
        let raw = self.agent.run(session.id, &prompt).await;
        Ok(self.deliver_reply(session, &raw, None))
    }

    /// Turn raw model output into the visible reply.
    ///
    /// The assistant message is recorded before the consultation flow is
    /// touched, so a directive can never cost the user the reply.
    fn deliver_reply(&self, session: &mut Session, raw: &str, prefix: Option<&str>) -> Reply {
        let outcome = extract_directive(raw);
        let visible = truncate_response(outcome.visible_text(), self.max_response_words);
        let message = match prefix {
            Some(prefix) => format!("{prefix}{visible}"),
            None => visible.clone(),
        };

        session.messages.push(Message::assistant(&message));
        session.summary = summarize_reply(&visible);

        let mut malformed = false;
        match &outcome {
            DirectiveOutcome::Directive { directive, .. } => {
                info!(
                    session_id = %session.id,
                    urgency = %directive.urgency,
                    "Agent requested a doctor consultation"
                );
                session
                    .consultation
                    .open(directive.reason.clone(), directive.urgency);
            }
            DirectiveOutcome::MalformedDirective { reason, .. } => {
                warn!(session_id = %session.id, %reason, "Ignoring malformed directive");
                malformed = true;
            }
            DirectiveOutcome::NoDirective { .. } => {}
        }

        Reply {
            message,
            directive: outcome.directive().cloned(),
            malformed_directive: malformed,
            tools: session.tool_visibility(),
        }
    }
}
