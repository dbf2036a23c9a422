use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use payment_cell::models::PaymentStatus;
use payment_cell::PaymentLedger;
use shared_database::supabase::{eq, SupabaseClient};

use crate::models::{BookingError, SessionNotesRequest, SessionStatus, SessionType, TherapySession};
use crate::services::writer::SESSIONS_TABLE;

/// Status changes of a booked session. Every transition is a conditional
/// update on the expected current status.
pub struct SessionLifecycleService {
    supabase: Arc<SupabaseClient>,
    ledger: PaymentLedger,
}

impl SessionLifecycleService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self {
            ledger: PaymentLedger::new(supabase.clone()),
            supabase,
        }
    }

    pub async fn get_session(&self, session_id: Uuid) -> Result<TherapySession, BookingError> {
        let query = format!("id={}", eq(session_id));
        self.supabase
            .select_one(SESSIONS_TABLE, &query)
            .await
            .map_err(|e| db_error("fetch session", e))?
            .ok_or(BookingError::SessionNotFound)
    }

    /// Session as seen by its patient; other patients get `SessionNotFound`.
    pub async fn get_patient_session(
        &self,
        session_id: Uuid,
        patient_id: &str,
    ) -> Result<TherapySession, BookingError> {
        let session = self.get_session(session_id).await?;
        if session.patient_id != patient_id {
            debug!("Patient {} asked for session {} of another patient", patient_id, session_id);
            return Err(BookingError::SessionNotFound);
        }
        Ok(session)
    }

    /// Session its patient may enter now: scheduled or running, and paid for
    /// when it is a paid session.
    pub async fn joinable_session(
        &self,
        session_id: Uuid,
        patient_id: &str,
    ) -> Result<TherapySession, BookingError> {
        let session = self.get_patient_session(session_id, patient_id).await?;
        if !session.status.is_joinable() {
            return Err(BookingError::SessionNotJoinable(session.status));
        }
        self.ensure_paid(&session).await?;
        Ok(session)
    }

    /// Paid sessions need a completed payment. Free sessions pass.
    pub async fn ensure_paid(&self, session: &TherapySession) -> Result<(), BookingError> {
        if session.session_type != SessionType::Paid {
            return Ok(());
        }

        let payment = self.ledger
            .find_by_session(session.id)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        match payment {
            Some(record) if record.status == PaymentStatus::Completed => Ok(()),
            Some(record) => {
                debug!("Session {} payment is {}", session.id, record.status);
                Err(BookingError::PaymentRequired)
            }
            None => {
                warn!("Paid session {} has no payment record", session.id);
                Err(BookingError::PaymentRequired)
            }
        }
    }

    /// Sessions of one patient, newest first.
    pub async fn list_patient_sessions(&self, patient_id: &str) -> Result<Vec<TherapySession>, BookingError> {
        let query = format!("patient_id={}&order=scheduled_at.desc", eq(patient_id));
        self.supabase
            .select(SESSIONS_TABLE, &query)
            .await
            .map_err(|e| db_error("list patient sessions", e))
    }

    /// Conditional move from `from` to `to`. `None` when the row was no
    /// longer in `from`.
    pub async fn transition(
        &self,
        session_id: Uuid,
        from: SessionStatus,
        to: SessionStatus,
        extra: Map<String, Value>,
    ) -> Result<Option<TherapySession>, BookingError> {
        if !from.can_transition_to(to) {
            return Err(BookingError::InvalidStatusTransition { from, to });
        }

        let query = format!("id={}&status=eq.{}", eq(session_id), from);
        let mut body = extra;
        body.insert("status".to_string(), json!(to));
        body.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let mut rows: Vec<TherapySession> = self.supabase
            .update(SESSIONS_TABLE, &query, Value::Object(body))
            .await
            .map_err(|e| db_error("update session status", e))?;

        let updated = rows.pop();
        if updated.is_some() {
            info!("Session {} moved {} -> {}", session_id, from, to);
        }
        Ok(updated)
    }

    /// scheduled -> in_progress. Starting an already running session is a
    /// no-op. Paid sessions start only once their payment completed.
    pub async fn start_session(
        &self,
        session_id: Uuid,
        patient_id: &str,
    ) -> Result<TherapySession, BookingError> {
        let session = self.get_patient_session(session_id, patient_id).await?;
        if session.status == SessionStatus::InProgress {
            return Ok(session);
        }
        if session.status == SessionStatus::Scheduled {
            self.ensure_paid(&session).await?;
        }

        let mut extra = Map::new();
        extra.insert("started_at".to_string(), json!(Utc::now().to_rfc3339()));

        match self.transition(session_id, session.status, SessionStatus::InProgress, extra).await? {
            Some(updated) => Ok(updated),
            None => self.expect_status(session_id, SessionStatus::InProgress).await,
        }
    }

    /// in_progress -> completed, recording the measured duration.
    pub async fn end_session(
        &self,
        session_id: Uuid,
        patient_id: &str,
    ) -> Result<TherapySession, BookingError> {
        let session = self.get_patient_session(session_id, patient_id).await?;
        if session.status == SessionStatus::Completed {
            return Ok(session);
        }

        let ended_at = Utc::now();
        let duration_seconds = session
            .started_at
            .map(|started| (ended_at - started).num_seconds().max(0))
            .unwrap_or(0);

        let mut extra = Map::new();
        extra.insert("ended_at".to_string(), json!(ended_at.to_rfc3339()));
        extra.insert("duration_seconds".to_string(), json!(duration_seconds));

        match self.transition(session_id, session.status, SessionStatus::Completed, extra).await? {
            Some(updated) => Ok(updated),
            None => self.expect_status(session_id, SessionStatus::Completed).await,
        }
    }

    /// Doctor-initiated cancellation of a scheduled session.
    pub async fn cancel_session(
        &self,
        session_id: Uuid,
        doctor_id: i64,
    ) -> Result<TherapySession, BookingError> {
        let session = self.get_doctor_session(session_id, doctor_id).await?;

        match self.transition(session_id, session.status, SessionStatus::Cancelled, Map::new()).await? {
            Some(updated) => Ok(updated),
            None => self.expect_status(session_id, SessionStatus::Cancelled).await,
        }
    }

    /// Cancels a session whose payment did not go through or was refunded.
    /// Sessions that already left `scheduled` are left alone.
    pub async fn cancel_unpaid(&self, session_id: Uuid) -> Result<(), BookingError> {
        let cancelled = self
            .transition(session_id, SessionStatus::Scheduled, SessionStatus::Cancelled, Map::new())
            .await?;
        if cancelled.is_none() {
            warn!("Session {} was not scheduled when cancelled for non-payment", session_id);
        }
        Ok(())
    }

    pub async fn save_notes(
        &self,
        session_id: Uuid,
        doctor_id: i64,
        request: SessionNotesRequest,
    ) -> Result<TherapySession, BookingError> {
        self.get_doctor_session(session_id, doctor_id).await?;

        let query = format!("id={}&doctor_id={}", eq(session_id), eq(doctor_id));
        let body = json!({
            "notes": request.notes,
            "diagnosis": request.diagnosis,
            "follow_up_points": request.follow_up_points,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let mut rows: Vec<TherapySession> = self.supabase
            .update(SESSIONS_TABLE, &query, body)
            .await
            .map_err(|e| db_error("save session notes", e))?;

        rows.pop().ok_or(BookingError::SessionNotFound)
    }

    pub async fn list_doctor_sessions(
        &self,
        doctor_id: i64,
        status: Option<SessionStatus>,
    ) -> Result<Vec<TherapySession>, BookingError> {
        let mut query = format!("doctor_id={}&order=scheduled_at.asc", eq(doctor_id));
        if let Some(status) = status {
            query.push_str(&format!("&status=eq.{}", status));
        }

        self.supabase
            .select(SESSIONS_TABLE, &query)
            .await
            .map_err(|e| db_error("list doctor sessions", e))
    }

    async fn get_doctor_session(
        &self,
        session_id: Uuid,
        doctor_id: i64,
    ) -> Result<TherapySession, BookingError> {
        let session = self.get_session(session_id).await?;
        if session.doctor_id != doctor_id {
            return Err(BookingError::NotSessionDoctor);
        }
        Ok(session)
    }

    // A concurrent request may have made the same transition first.
    async fn expect_status(
        &self,
        session_id: Uuid,
        wanted: SessionStatus,
    ) -> Result<TherapySession, BookingError> {
        let current = self.get_session(session_id).await?;
        if current.status == wanted {
            Ok(current)
        } else {
            Err(BookingError::InvalidStatusTransition { from: current.status, to: wanted })
        }
    }
}

fn db_error(action: &str, e: anyhow::Error) -> BookingError {
    error!("Failed to {}: {}", action, e);
    BookingError::DatabaseError(format!("Failed to {}", action))
}
