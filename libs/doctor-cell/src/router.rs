use std::sync::Arc;

use axum::{routing::get, Router};

use crate::handlers;
use crate::services::DoctorDirectory;

#[derive(Clone)]
pub struct DoctorState {
    pub directory: Arc<dyn DoctorDirectory>,
}

pub fn doctor_routes(state: DoctorState) -> Router {
    Router::new()
        .route("/available", get(handlers::get_available_doctors))
        .with_state(state)
}
