use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use booking_cell::handlers::to_app_error;
use booking_cell::services::SessionLifecycleService;
use shared_models::error::AppError;
use shared_models::messages;

use crate::models::{RoomConfig, RoomConfigQuery};
use crate::router::RoomApiState;

#[axum::debug_handler]
pub async fn get_room_config(
    State(state): State<RoomApiState>,
    Path(session_id): Path<Uuid>,
    Query(query): Query<RoomConfigQuery>,
) -> Result<Json<Value>, AppError> {
    let lifecycle = SessionLifecycleService::new(state.supabase.clone());

    let session = lifecycle.joinable_session(session_id, &query.patient_id)
        .await
        .map_err(|e| to_app_error(e, messages::INTERNAL_ERROR))?;

    debug!("[Room] Patient {} joining session {}", query.patient_id, session.id);

    Ok(Json(json!(RoomConfig {
        session_id: session.id,
        duration_seconds: state.config.session_duration_seconds(),
        ice_servers: state.config.stun_servers.clone(),
    })))
}
