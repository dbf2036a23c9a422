use std::sync::Arc;
use axum::{routing::post, Router};

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::handlers::*;

#[derive(Clone)]
pub struct PatientState {
    pub config: Arc<AppConfig>,
    pub supabase: Arc<SupabaseClient>,
}

pub fn patient_routes(state: PatientState) -> Router {
    Router::new()
        .route("/anonymous", post(get_anonymous_patient))
        .route("/{anonymous_id}/consents", post(record_consent))
        .with_state(state)
}
