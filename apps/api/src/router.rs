use std::sync::Arc;

use axum::{routing::get, Router};

use booking_cell::router::{booking_routes, patient_session_routes, session_routes, BookingState};
use doctor_cell::router::{doctor_routes, DoctorState};
use doctor_cell::services::DoctorDirectory;
use patient_cell::router::{patient_routes, PatientState};
use payment_cell::PaymobClient;
use session_room_cell::router::{room_routes, RoomApiState};
use shared_config::AppConfig;
use shared_database::SupabaseClient;

/// Process-wide handles shared by every cell.
#[derive(Clone)]
pub struct AppServices {
    pub config: Arc<AppConfig>,
    pub supabase: Arc<SupabaseClient>,
    pub directory: Arc<dyn DoctorDirectory>,
    pub paymob: Arc<PaymobClient>,
}

pub fn create_router(services: AppServices) -> Router {
    let booking_state = BookingState {
        config: services.config.clone(),
        supabase: services.supabase.clone(),
        directory: services.directory.clone(),
        paymob: services.paymob.clone(),
    };

    let sessions = session_routes(booking_state.clone()).merge(room_routes(RoomApiState {
        config: services.config.clone(),
        supabase: services.supabase.clone(),
    }));

    let patients = patient_routes(PatientState {
        config: services.config.clone(),
        supabase: services.supabase.clone(),
    })
    .merge(patient_session_routes(booking_state.clone()));

    Router::new()
        .route("/", get(|| async { "Telehealth booking API is running!" }))
        .nest("/patients", patients)
        .nest("/doctors", doctor_routes(DoctorState {
            directory: services.directory.clone(),
        }))
        .nest("/bookings", booking_routes(booking_state))
        .nest("/sessions", sessions)
}
