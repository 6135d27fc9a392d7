//! REST endpoints for sessions, the conversation, and the tool flows.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{FromRequest, OptionalFromRequest, Path, Request, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::agent::QuickQuery;
use crate::documents::decode_upload;
use crate::error::{DocumentError, Error, SessionError, ToolFlowError};
use crate::service::WellnessService;
use crate::session::{HealthForm, ProfileForm, Session};
use crate::tools::symptoms::COMMON_SYMPTOMS;
use crate::tools::{AppointmentForm, ContactMethod, DOCTORS, SymptomForm, Urgency};

/// Shared state for the API routes.
#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<WellnessService>,
}

/// Build the Axum router with all wellness API routes.
pub fn api_routes(service: Arc<WellnessService>) -> Router {
    let state = ApiState { service };

    Router::new()
        .route("/health", get(health))
        .route("/api/doctors", get(list_doctors))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", get(get_session).delete(end_session))
        .route("/api/sessions/{id}/profile", post(submit_profile))
        .route("/api/sessions/{id}/chat", post(chat))
        .route("/api/sessions/{id}/quick/{kind}", post(quick_query))
        .route("/api/sessions/{id}/health", post(save_progress))
        .route("/api/sessions/{id}/documents", post(upload_document))
        .route("/api/sessions/{id}/documents/process", post(process_document))
        .route("/api/sessions/{id}/consultation", post(open_consultation))
        .route("/api/sessions/{id}/consultation/confirm", post(confirm_consultation))
        .route("/api/sessions/{id}/consultation/cancel", post(cancel_consultation))
        .route("/api/sessions/{id}/appointments", post(open_appointment))
        .route("/api/sessions/{id}/appointments/confirm", post(confirm_appointment))
        .route("/api/sessions/{id}/appointments/cancel", post(cancel_appointment))
        .route("/api/sessions/{id}/symptoms", post(open_symptoms))
        .route("/api/sessions/{id}/symptoms/confirm", post(confirm_symptoms))
        .route("/api/sessions/{id}/symptoms/cancel", post(cancel_symptoms))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Errors ──────────────────────────────────────────────────────────────

/// An error rendered as `{"error": ...}` with a matching status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::Session(SessionError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Error::Session(SessionError::ProfileRequired)
            | Error::Session(SessionError::ProfileAlreadyCollected)
            | Error::ToolFlow(ToolFlowError::NotAwaitingInput { .. }) => StatusCode::CONFLICT,
            Error::Session(SessionError::InvalidInput { .. })
            | Error::ToolFlow(ToolFlowError::UnknownDoctor(_))
            | Error::ToolFlow(ToolFlowError::InvalidInput { .. })
            | Error::Document(DocumentError::UnsupportedType(_))
            | Error::Document(DocumentError::InvalidEncoding(_)) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %err, "Request failed");
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        Error::from(err).into()
    }
}

impl From<ToolFlowError> for ApiError {
    fn from(err: ToolFlowError) -> Self {
        Error::from(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

type ApiResult = Result<Response, ApiError>;

/// `Json` body extractor whose rejections render as `ApiError`.
struct ApiJson<T>(T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

impl<T, S> OptionalFromRequest<S> for ApiJson<T>
where
    Json<T>: OptionalFromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Option<Self>, Self::Rejection> {
        let value = <Json<T> as OptionalFromRequest<S>>::from_request(req, state).await?;
        Ok(value.map(|Json(value)| Self(value)))
    }
}

fn parse_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| ApiError::bad_request("Invalid session ID"))
}

async fn session(state: &ApiState, id: &str) -> Result<Arc<Mutex<Session>>, ApiError> {
    let id = parse_id(id)?;
    Ok(state.service.sessions().require(id).await?)
}

// ── Service ─────────────────────────────────────────────────────────────

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "wellness-assist",
        "model": state.service.model_name(),
    }))
}

async fn list_doctors() -> impl IntoResponse {
    let doctors: Vec<_> = DOCTORS
        .iter()
        .map(|d| {
            json!({
                "id": d.id,
                "name": d.name,
                "specialty": d.specialty,
                "phone": d.phone,
                "label": d.label(),
            })
        })
        .collect();
    Json(doctors)
}

// ── Sessions ────────────────────────────────────────────────────────────

async fn create_session(State(state): State<ApiState>) -> impl IntoResponse {
    let id = state.service.sessions().create().await;
    (StatusCode::CREATED, Json(json!({ "session_id": id })))
}

async fn get_session(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult {
    let session = session(&state, &id).await?;
    let snapshot = session.lock().await.snapshot();
    Ok(Json(snapshot).into_response())
}

async fn end_session(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult {
    let id = parse_id(&id)?;
    if state.service.sessions().remove(id).await {
        Ok(Json(json!({ "status": "ended" })).into_response())
    } else {
        Err(SessionError::NotFound { id }.into())
    }
}

async fn submit_profile(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    ApiJson(form): ApiJson<ProfileForm>,
) -> ApiResult {
    let session = session(&state, &id).await?;
    let mut session = session.lock().await;
    let profile = state.service.submit_profile(&mut session, form)?;
    Ok(Json(json!({ "profile": profile })).into_response())
}

// ── Conversation ────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
}

async fn chat(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ChatRequest>,
) -> ApiResult {
    let session = session(&state, &id).await?;
    let mut session = session.lock().await;
    let reply = state.service.chat(&mut session, &req.message).await?;
    Ok(Json(reply).into_response())
}

async fn quick_query(
    State(state): State<ApiState>,
    Path((id, kind)): Path<(String, String)>,
) -> ApiResult {
    let query: QuickQuery = kind.parse().map_err(ApiError::bad_request)?;
    let session = session(&state, &id).await?;
    let mut session = session.lock().await;
    let reply = state.service.quick_query(&mut session, query).await?;
    Ok(Json(reply).into_response())
}

async fn save_progress(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    ApiJson(form): ApiJson<HealthForm>,
) -> ApiResult {
    let session = session(&state, &id).await?;
    let mut session = session.lock().await;
    let reply = state.service.save_progress(&mut session, form).await?;
    Ok(Json(reply).into_response())
}

// ── Documents ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct UploadRequest {
    file_name: String,
    content_base64: String,
}

async fn upload_document(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UploadRequest>,
) -> ApiResult {
    let bytes = decode_upload(&req.content_base64).map_err(Error::from)?;
    let session = session(&state, &id).await?;
    let mut session = session.lock().await;
    let path = state
        .service
        .upload_document(&mut session, &req.file_name, &bytes)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "path": path, "size": bytes.len() })),
    )
        .into_response())
}

#[derive(Deserialize)]
struct ProcessRequest {
    path: PathBuf,
}

async fn process_document(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ProcessRequest>,
) -> ApiResult {
    let session = session(&state, &id).await?;
    let mut session = session.lock().await;
    let result = state.service.process_document(&mut session, &req.path).await?;
    Ok(Json(result).into_response())
}

// ── Doctor consultation ─────────────────────────────────────────────────

#[derive(Deserialize, Default)]
struct ConsultationRequest {
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    urgency: Urgency,
}

async fn open_consultation(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    body: Option<ApiJson<ConsultationRequest>>,
) -> ApiResult {
    let req = body.map(|ApiJson(req)| req).unwrap_or_default();
    let session = session(&state, &id).await?;
    let mut session = session.lock().await;
    let status = state
        .service
        .open_consultation(&mut session, req.reason.as_deref(), req.urgency)?;
    Ok(Json(json!({ "status": status, "doctors": DOCTORS })).into_response())
}

#[derive(Deserialize)]
struct ConnectRequest {
    doctor: String,
    #[serde(default)]
    method: ContactMethod,
}

async fn confirm_consultation(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ConnectRequest>,
) -> ApiResult {
    let session = session(&state, &id).await?;
    let mut session = session.lock().await;
    let outcome = state
        .service
        .confirm_consultation(&mut session, &req.doctor, req.method)?;
    Ok(Json(outcome).into_response())
}

async fn cancel_consultation(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult {
    let session = session(&state, &id).await?;
    let mut session = session.lock().await;
    let message = state.service.cancel_consultation(&mut session)?;
    Ok(Json(json!({ "message": message })).into_response())
}

// ── Appointments ────────────────────────────────────────────────────────

async fn open_appointment(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult {
    let session = session(&state, &id).await?;
    let mut session = session.lock().await;
    state.service.open_appointment(&mut session)?;
    Ok(Json(json!({ "stage": session.appointment.stage() })).into_response())
}

async fn confirm_appointment(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    ApiJson(form): ApiJson<AppointmentForm>,
) -> ApiResult {
    let session = session(&state, &id).await?;
    let mut session = session.lock().await;
    let (appointment, confirmation) = state.service.confirm_appointment(&mut session, form)?;
    Ok(Json(json!({ "appointment": appointment, "confirmation": confirmation })).into_response())
}

async fn cancel_appointment(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult {
    let session = session(&state, &id).await?;
    let mut session = session.lock().await;
    let message = state.service.cancel_appointment(&mut session)?;
    Ok(Json(json!({ "message": message })).into_response())
}

// ── Symptoms ────────────────────────────────────────────────────────────

async fn open_symptoms(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult {
    let session = session(&state, &id).await?;
    let mut session = session.lock().await;
    state.service.open_symptoms(&mut session)?;
    Ok(Json(json!({
        "stage": session.symptoms.stage(),
        "common_symptoms": COMMON_SYMPTOMS,
    }))
    .into_response())
}

async fn confirm_symptoms(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    ApiJson(form): ApiJson<SymptomForm>,
) -> ApiResult {
    let session = session(&state, &id).await?;
    let mut session = session.lock().await;
    let (log, confirmation) = state.service.confirm_symptoms(&mut session, form)?;
    Ok(Json(json!({ "log": log, "confirmation": confirmation })).into_response())
}

async fn cancel_symptoms(State(state): State<ApiState>, Path(id): Path<String>) -> ApiResult {
    let session = session(&state, &id).await?;
    let mut session = session.lock().await;
    let message = state.service.cancel_symptoms(&mut session)?;
    Ok(Json(json!({ "message": message })).into_response())
}
