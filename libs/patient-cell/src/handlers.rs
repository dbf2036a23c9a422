use std::net::IpAddr;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap},
    Json,
};
use serde_json::{json, Value};
use tracing::error;

use shared_models::error::AppError;
use shared_models::messages;

use crate::models::{
    AnonymousPatientRequest, AnonymousPatientResponse, ConsentOrigin, ConsentRequest, ConsentView,
    PatientError,
};
use crate::router::PatientState;
use crate::services::{ConsentService, PatientIdentityService};

#[axum::debug_handler]
pub async fn get_anonymous_patient(
    State(state): State<PatientState>,
    Json(request): Json<AnonymousPatientRequest>,
) -> Result<Json<Value>, AppError> {
    let service = PatientIdentityService::new(&state.config, state.supabase.clone());

    let patient = service.resolve(&request.phone_number)
        .await
        .map_err(|e| match e {
            PatientError::InvalidPhone => AppError::ValidationError(messages::INVALID_PHONE.to_string()),
            other => {
                error!("[Patient] Failed to resolve anonymous patient: {}", other);
                AppError::Internal(messages::ANONYMOUS_ID_FAILED.to_string())
            }
        })?;

    Ok(Json(json!(AnonymousPatientResponse::from(patient))))
}

#[axum::debug_handler]
pub async fn record_consent(
    State(state): State<PatientState>,
    Path(anonymous_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<ConsentRequest>,
) -> Result<Json<Value>, AppError> {
    let identity = PatientIdentityService::new(&state.config, state.supabase.clone());
    let service = ConsentService::new(state.supabase.clone(), identity);

    let records = service.record(&anonymous_id, &request, &consent_origin(&headers))
        .await
        .map_err(|e| match e {
            PatientError::ConsentRequired => AppError::ValidationError(messages::CONSENT_REQUIRED.to_string()),
            PatientError::NotFound => AppError::NotFound(messages::PATIENT_NOT_FOUND.to_string()),
            other => {
                error!("[Patient] Failed to record consent: {}", other);
                AppError::Internal(messages::CONSENT_FAILED.to_string())
            }
        })?;

    let consents: Vec<ConsentView> = records.into_iter().map(ConsentView::from).collect();

    Ok(Json(json!({
        "consents": consents,
        "message": messages::CONSENT_RECORDED
    })))
}

/// Client address as reported by the proxy, and the browser's user agent.
fn consent_origin(headers: &HeaderMap) -> ConsentOrigin {
    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse::<IpAddr>().ok())
        .map(|ip| ip.to_string());

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    ConsentOrigin { ip_address, user_agent }
}
