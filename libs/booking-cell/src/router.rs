use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use doctor_cell::services::DoctorDirectory;
use payment_cell::PaymobClient;
use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

#[derive(Clone)]
pub struct BookingState {
    pub config: Arc<AppConfig>,
    pub supabase: Arc<SupabaseClient>,
    pub directory: Arc<dyn DoctorDirectory>,
    pub paymob: Arc<PaymobClient>,
}

/// Anonymous booking endpoints and the Paymob callback.
pub fn booking_routes(state: BookingState) -> Router {
    Router::new()
        .route("/free", post(handlers::book_free_session))
        .route("/payment-session", post(handlers::create_payment_session))
        .route("/payments/webhook", post(handlers::payment_webhook))
        .with_state(state)
}

/// Session listing for an anonymous patient, mounted under `/patients`.
pub fn patient_session_routes(state: BookingState) -> Router {
    Router::new()
        .route("/{anonymous_id}/sessions", get(handlers::get_patient_sessions))
        .with_state(state)
}

/// Session lifecycle. Start/end are reported by the patient's room client;
/// the rest requires a doctor token.
pub fn session_routes(state: BookingState) -> Router {
    let doctor_routes = Router::new()
        .route("/doctor", get(handlers::get_doctor_sessions))
        .route("/{session_id}/notes", put(handlers::save_session_notes))
        .route("/{session_id}/cancel", post(handlers::cancel_session))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .route("/{session_id}/start", post(handlers::start_session))
        .route("/{session_id}/end", post(handlers::end_session))
        .merge(doctor_routes)
        .with_state(state)
}
