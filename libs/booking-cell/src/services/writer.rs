use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use doctor_cell::models::DoctorError;
use doctor_cell::services::DoctorDirectory;
use patient_cell::models::{AnonymousPatient, PatientError};
use patient_cell::services::PatientIdentityService;
use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{BookingError, NewBooking, SessionStatus, SessionType, TherapySession};
use crate::services::eligibility::FreeSessionGate;
use crate::services::intake::{validate_answers, IntakeService};

pub(crate) const SESSIONS_TABLE: &str = "therapy_sessions";

/// Writes exactly one `scheduled` therapy session per booking.
pub struct BookingWriter {
    supabase: Arc<SupabaseClient>,
    patients: PatientIdentityService,
    directory: Arc<dyn DoctorDirectory>,
    gate: FreeSessionGate,
    intake: IntakeService,
}

impl BookingWriter {
    pub fn new(
        config: &AppConfig,
        supabase: Arc<SupabaseClient>,
        directory: Arc<dyn DoctorDirectory>,
    ) -> Self {
        Self {
            patients: PatientIdentityService::new(config, supabase.clone()),
            gate: FreeSessionGate::new(supabase.clone()),
            intake: IntakeService::new(supabase.clone()),
            directory,
            supabase,
        }
    }

    pub fn gate(&self) -> &FreeSessionGate {
        &self.gate
    }

    /// Checks everything that can be checked before any state changes.
    pub async fn validate(&self, booking: &NewBooking) -> Result<AnonymousPatient, BookingError> {
        if booking.scheduled_at <= Utc::now() {
            return Err(BookingError::ScheduledInPast);
        }
        validate_answers(&booking.intake_answers)?;

        let patient = self.patients
            .find_by_anonymous_id(&booking.patient_id)
            .await
            .map_err(|e| match e {
                PatientError::NotFound => BookingError::PatientNotFound,
                other => BookingError::DatabaseError(other.to_string()),
            })?;

        self.directory
            .find(booking.doctor_id)
            .await
            .map_err(|e| match e {
                DoctorError::NotFound => BookingError::DoctorNotFound,
                DoctorError::DatabaseError(msg) => BookingError::DatabaseError(msg),
            })?;

        Ok(patient)
    }

    /// Claims the patient's free session, then writes the booking. A failed
    /// write hands the claim back.
    pub async fn book_free(&self, booking: NewBooking) -> Result<TherapySession, BookingError> {
        let patient = self.validate(&booking).await?;
        if patient.has_used_free_session {
            return Err(BookingError::FreeSessionAlreadyUsed);
        }

        if !self.gate.try_consume(&booking.patient_id).await? {
            return Err(BookingError::FreeSessionAlreadyUsed);
        }

        let session = match self.insert_session(&booking, SessionType::Free).await {
            Ok(session) => session,
            Err(e) => {
                if let Err(release_err) = self.gate.release(&booking.patient_id).await {
                    error!(
                        "Free session for patient {} stays claimed without a booking: {}",
                        booking.patient_id, release_err
                    );
                }
                return Err(e);
            }
        };

        self.record_intake(&session, &booking).await;
        info!("Free session {} booked for patient {}", session.id, session.patient_id);
        Ok(session)
    }

    /// Paid booking row; payment is tracked separately by the ledger.
    pub async fn book_paid(&self, booking: NewBooking) -> Result<TherapySession, BookingError> {
        self.validate(&booking).await?;

        let session = self.insert_session(&booking, SessionType::Paid).await?;
        self.record_intake(&session, &booking).await;
        info!("Paid session {} booked for patient {}", session.id, session.patient_id);
        Ok(session)
    }

    async fn insert_session(
        &self,
        booking: &NewBooking,
        session_type: SessionType,
    ) -> Result<TherapySession, BookingError> {
        let now = Utc::now().to_rfc3339();
        let body = json!({
            "id": Uuid::new_v4(),
            "patient_id": booking.patient_id,
            "doctor_id": booking.doctor_id,
            "session_type": session_type,
            "status": SessionStatus::Scheduled,
            "scheduled_at": booking.scheduled_at.to_rfc3339(),
            "recording_consent": false,
            "created_at": now,
            "updated_at": now,
        });

        let mut rows: Vec<TherapySession> = self.supabase
            .insert(SESSIONS_TABLE, body)
            .await
            .map_err(|e| {
                error!("Failed to insert {} session: {}", session_type, e);
                BookingError::DatabaseError("Failed to create session".to_string())
            })?;

        rows.pop()
            .ok_or_else(|| BookingError::DatabaseError("Insert returned no row".to_string()))
    }

    // Intake answers are supplementary; the booking stands without them.
    async fn record_intake(&self, session: &TherapySession, booking: &NewBooking) {
        match self.intake.record(session.id, &booking.patient_id, &booking.intake_answers).await {
            Ok(rows) => debug!("Session {} has {} intake answers", session.id, rows.len()),
            Err(e) => warn!("Session {} booked without intake answers: {}", session.id, e),
        }
    }
}
