use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use tracing::{error, info};
use uuid::Uuid;

use doctor_cell::models::DoctorError;
use doctor_cell::services::DoctorAccounts;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::messages;
use shared_utils::extractor::require_doctor;

use crate::models::{
    BookFreeSessionRequest, BookingError, CreatePaymentSessionRequest, DoctorSessionView,
    DoctorSessionsQuery, FreeSessionBookedResponse, PatientSessionView, PaymentSessionResponse,
    SessionNotesRequest, SessionParticipantRequest, SessionStatusResponse, WebhookQuery,
};
use crate::router::BookingState;
use crate::services::{
    BookingWriter, CheckoutService, PaymentReconciler, ReconcileOutcome, SessionLifecycleService,
};

/// Maps booking failures to user-safe responses. `fallback` is the message
/// for failures the caller cannot act on.
pub fn to_app_error(e: BookingError, fallback: &str) -> AppError {
    match e {
        BookingError::PatientNotFound => AppError::NotFound(messages::PATIENT_NOT_FOUND.to_string()),
        BookingError::DoctorNotFound => AppError::NotFound(messages::DOCTOR_NOT_FOUND.to_string()),
        BookingError::SessionNotFound => AppError::NotFound(messages::SESSION_NOT_FOUND.to_string()),
        BookingError::FreeSessionAlreadyUsed => {
            AppError::BusinessRule(messages::FREE_SESSION_ALREADY_USED.to_string())
        }
        BookingError::ScheduledInPast
        | BookingError::InvalidIntake(_)
        | BookingError::InvalidSessionType(_) => {
            AppError::ValidationError(messages::INVALID_BOOKING_REQUEST.to_string())
        }
        BookingError::InvalidStatusTransition { .. } | BookingError::SessionNotJoinable(_) => {
            AppError::Conflict(messages::INVALID_SESSION_STATE.to_string())
        }
        BookingError::PaymentRequired => AppError::PaymentRequired(messages::PAYMENT_REQUIRED.to_string()),
        BookingError::NotSessionDoctor => AppError::Forbidden(messages::FORBIDDEN.to_string()),
        BookingError::InvalidSignature => AppError::Auth(messages::UNAUTHORIZED.to_string()),
        BookingError::Payment(detail) => {
            error!("[Booking] Payment provider failure: {}", detail);
            AppError::ExternalService(messages::PAYMENT_SESSION_FAILED.to_string())
        }
        BookingError::DatabaseError(detail) => {
            error!("[Booking] Storage failure: {}", detail);
            AppError::Internal(fallback.to_string())
        }
    }
}

/// Profile id of the doctor behind a staff token.
async fn current_doctor(state: &BookingState, user: &User) -> Result<i64, AppError> {
    let user_id = require_doctor(user)?;

    DoctorAccounts::new(state.supabase.clone())
        .doctor_id_for_user(user_id)
        .await
        .map_err(|e| match e {
            DoctorError::NotFound => AppError::Forbidden(messages::FORBIDDEN.to_string()),
            DoctorError::DatabaseError(detail) => {
                error!("[Booking] Doctor lookup failed: {}", detail);
                AppError::Internal(messages::INTERNAL_ERROR.to_string())
            }
        })
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_free_session(
    State(state): State<BookingState>,
    Json(request): Json<BookFreeSessionRequest>,
) -> Result<Json<Value>, AppError> {
    let writer = BookingWriter::new(&state.config, state.supabase.clone(), state.directory.clone());

    let session = writer.book_free(request.into())
        .await
        .map_err(|e| to_app_error(e, messages::BOOKING_FAILED))?;

    Ok(Json(json!(FreeSessionBookedResponse {
        session_id: session.id,
        message: messages::FREE_SESSION_BOOKED.to_string(),
    })))
}

#[axum::debug_handler]
pub async fn create_payment_session(
    State(state): State<BookingState>,
    Json(request): Json<CreatePaymentSessionRequest>,
) -> Result<Json<Value>, AppError> {
    let writer = BookingWriter::new(&state.config, state.supabase.clone(), state.directory.clone());
    let checkout = CheckoutService::new(&state.config, state.supabase.clone(), writer, state.paymob.clone());

    let result = checkout.create_payment_session(request)
        .await
        .map_err(|e| to_app_error(e, messages::PAYMENT_SESSION_FAILED))?;

    Ok(Json(json!(PaymentSessionResponse {
        session_id: result.session.id,
        checkout_url: result.checkout_url,
        order_id: result.order_id,
        message: messages::PAYMENT_SESSION_CREATED.to_string(),
    })))
}

/// Paymob transaction processed callback.
#[axum::debug_handler]
pub async fn payment_webhook(
    State(state): State<BookingState>,
    Query(query): Query<WebhookQuery>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let reconciler = PaymentReconciler::new(&state.config, state.supabase.clone(), state.paymob.clone());

    let outcome = reconciler.handle_callback(&body, &query.hmac)
        .await
        .map_err(|e| to_app_error(e, messages::INTERNAL_ERROR))?;

    info!("Paymob callback processed: {:?}", outcome);
    let applied = matches!(outcome, ReconcileOutcome::Applied(_));

    Ok(Json(json!({
        "received": true,
        "applied": applied
    })))
}

// ==============================================================================
// SESSION HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn start_session(
    State(state): State<BookingState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SessionParticipantRequest>,
) -> Result<Json<Value>, AppError> {
    let lifecycle = SessionLifecycleService::new(state.supabase.clone());

    let session = lifecycle.start_session(session_id, &request.patient_id)
        .await
        .map_err(|e| to_app_error(e, messages::INTERNAL_ERROR))?;

    Ok(Json(json!(SessionStatusResponse::from(session))))
}

#[axum::debug_handler]
pub async fn end_session(
    State(state): State<BookingState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SessionParticipantRequest>,
) -> Result<Json<Value>, AppError> {
    let lifecycle = SessionLifecycleService::new(state.supabase.clone());

    let session = lifecycle.end_session(session_id, &request.patient_id)
        .await
        .map_err(|e| to_app_error(e, messages::INTERNAL_ERROR))?;

    Ok(Json(json!({
        "session": SessionStatusResponse::from(session),
        "message": messages::SESSION_COMPLETED
    })))
}

/// Sessions booked under an anonymous id, so the patient can find the room.
#[axum::debug_handler]
pub async fn get_patient_sessions(
    State(state): State<BookingState>,
    Path(anonymous_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let lifecycle = SessionLifecycleService::new(state.supabase.clone());

    let sessions: Vec<PatientSessionView> = lifecycle.list_patient_sessions(&anonymous_id)
        .await
        .map_err(|e| to_app_error(e, messages::INTERNAL_ERROR))?
        .into_iter()
        .map(PatientSessionView::from)
        .collect();

    Ok(Json(json!({
        "sessions": sessions,
        "total": sessions.len()
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_sessions(
    State(state): State<BookingState>,
    Extension(user): Extension<User>,
    Query(query): Query<DoctorSessionsQuery>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = current_doctor(&state, &user).await?;
    let lifecycle = SessionLifecycleService::new(state.supabase.clone());

    let sessions: Vec<DoctorSessionView> = lifecycle.list_doctor_sessions(doctor_id, query.status)
        .await
        .map_err(|e| to_app_error(e, messages::INTERNAL_ERROR))?
        .into_iter()
        .map(DoctorSessionView::from)
        .collect();

    Ok(Json(json!({
        "sessions": sessions,
        "total": sessions.len()
    })))
}

#[axum::debug_handler]
pub async fn save_session_notes(
    State(state): State<BookingState>,
    Extension(user): Extension<User>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SessionNotesRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = current_doctor(&state, &user).await?;
    let lifecycle = SessionLifecycleService::new(state.supabase.clone());

    let session = lifecycle.save_notes(session_id, doctor_id, request)
        .await
        .map_err(|e| to_app_error(e, messages::INTERNAL_ERROR))?;

    Ok(Json(json!({
        "session": DoctorSessionView::from(session),
        "message": messages::NOTES_SAVED
    })))
}

#[axum::debug_handler]
pub async fn cancel_session(
    State(state): State<BookingState>,
    Extension(user): Extension<User>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = current_doctor(&state, &user).await?;
    let lifecycle = SessionLifecycleService::new(state.supabase.clone());

    let session = lifecycle.cancel_session(session_id, doctor_id)
        .await
        .map_err(|e| to_app_error(e, messages::INTERNAL_ERROR))?;

    Ok(Json(json!(SessionStatusResponse::from(session))))
}
