use axum::{extract::State, Json};
use serde_json::{json, Value};
use tracing::error;

use shared_models::error::AppError;
use shared_models::messages;

use crate::router::DoctorState;

#[axum::debug_handler]
pub async fn get_available_doctors(
    State(state): State<DoctorState>,
) -> Result<Json<Value>, AppError> {
    let doctors = state.directory.list_available()
        .await
        .map_err(|e| {
            error!("[Doctors] Failed to get doctors: {}", e);
            AppError::Internal(messages::DOCTORS_FETCH_FAILED.to_string())
        })?;

    Ok(Json(json!(doctors)))
}
