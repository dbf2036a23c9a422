use std::sync::Arc;
use axum::{routing::get, Router};

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::handlers::*;

#[derive(Clone)]
pub struct RoomApiState {
    pub config: Arc<AppConfig>,
    pub supabase: Arc<SupabaseClient>,
}

pub fn room_routes(state: RoomApiState) -> Router {
    Router::new()
        .route("/{session_id}/room", get(get_room_config))
        .with_state(state)
}
