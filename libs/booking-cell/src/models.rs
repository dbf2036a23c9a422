use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// SESSION MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Free,
    Paid,
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionType::Free => write!(f, "free"),
            SessionType::Paid => write!(f, "paid"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Scheduled => write!(f, "scheduled"),
            SessionStatus::InProgress => write!(f, "in_progress"),
            SessionStatus::Completed => write!(f, "completed"),
            SessionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl SessionStatus {
    pub fn valid_transitions(&self) -> &'static [SessionStatus] {
        match self {
            SessionStatus::Scheduled => &[SessionStatus::InProgress, SessionStatus::Cancelled],
            SessionStatus::InProgress => &[SessionStatus::Completed],
            // Terminal states
            SessionStatus::Completed | SessionStatus::Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        self.valid_transitions().contains(&next)
    }

    pub fn is_joinable(&self) -> bool {
        matches!(self, SessionStatus::Scheduled | SessionStatus::InProgress)
    }
}

/// Row of `therapy_sessions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TherapySession {
    pub id: Uuid,
    pub patient_id: String,
    pub doctor_id: i64,
    pub session_type: SessionType,
    pub status: SessionStatus,
    pub scheduled_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    pub notes: Option<String>,
    pub diagnosis: Option<String>,
    pub follow_up_points: Option<String>,
    #[serde(default)]
    pub recording_consent: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Question key to selected option ids.
pub type IntakeAnswers = BTreeMap<String, Vec<String>>;

/// Row of `intake_responses`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeResponse {
    pub id: Uuid,
    pub session_id: Uuid,
    pub patient_id: String,
    pub question_key: String,
    pub selected_options: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Everything needed to write one session row.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub patient_id: String,
    pub doctor_id: i64,
    pub scheduled_at: DateTime<Utc>,
    pub intake_answers: IntakeAnswers,
}

// ==============================================================================
// REQUEST / RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookFreeSessionRequest {
    pub patient_id: String,
    pub doctor_id: i64,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub intake_responses: IntakeAnswers,
}

impl From<BookFreeSessionRequest> for NewBooking {
    fn from(request: BookFreeSessionRequest) -> Self {
        Self {
            patient_id: request.patient_id,
            doctor_id: request.doctor_id,
            scheduled_at: request.scheduled_at,
            intake_answers: request.intake_responses,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentSessionRequest {
    pub patient_id: String,
    pub doctor_id: i64,
    pub scheduled_at: DateTime<Utc>,
    pub session_type: SessionType,
    #[serde(default)]
    pub intake_responses: IntakeAnswers,
}

impl CreatePaymentSessionRequest {
    pub fn booking(&self) -> NewBooking {
        NewBooking {
            patient_id: self.patient_id.clone(),
            doctor_id: self.doctor_id,
            scheduled_at: self.scheduled_at,
            intake_answers: self.intake_responses.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FreeSessionBookedResponse {
    pub session_id: Uuid,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSessionResponse {
    pub session_id: Uuid,
    pub checkout_url: String,
    pub order_id: i64,
    pub message: String,
}

/// Result of a successful checkout saga.
#[derive(Debug, Clone)]
pub struct CheckoutResult {
    pub session: TherapySession,
    pub checkout_url: String,
    pub order_id: i64,
}

/// Body of the room client's start/end reports.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionParticipantRequest {
    pub patient_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub session_id: Uuid,
    pub status: SessionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
}

impl From<TherapySession> for SessionStatusResponse {
    fn from(session: TherapySession) -> Self {
        Self {
            session_id: session.id,
            status: session.status,
            started_at: session.started_at,
            ended_at: session.ended_at,
            duration_seconds: session.duration_seconds,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookQuery {
    pub hmac: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionNotesRequest {
    pub notes: Option<String>,
    pub diagnosis: Option<String>,
    pub follow_up_points: Option<String>,
}

/// Doctor-facing session summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorSessionView {
    pub id: Uuid,
    pub patient_id: String,
    pub session_type: SessionType,
    pub status: SessionStatus,
    pub scheduled_at: DateTime<Utc>,
    pub duration_seconds: Option<i64>,
    pub notes: Option<String>,
    pub diagnosis: Option<String>,
    pub follow_up_points: Option<String>,
}

impl From<TherapySession> for DoctorSessionView {
    fn from(session: TherapySession) -> Self {
        Self {
            id: session.id,
            patient_id: session.patient_id,
            session_type: session.session_type,
            status: session.status,
            scheduled_at: session.scheduled_at,
            duration_seconds: session.duration_seconds,
            notes: session.notes,
            diagnosis: session.diagnosis,
            follow_up_points: session.follow_up_points,
        }
    }
}

/// Patient-facing session summary. Clinical notes stay doctor-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatientSessionView {
    pub session_id: Uuid,
    pub doctor_id: i64,
    pub session_type: SessionType,
    pub status: SessionStatus,
    pub scheduled_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
}

impl From<TherapySession> for PatientSessionView {
    fn from(session: TherapySession) -> Self {
        Self {
            session_id: session.id,
            doctor_id: session.doctor_id,
            session_type: session.session_type,
            status: session.status,
            scheduled_at: session.scheduled_at,
            started_at: session.started_at,
            ended_at: session.ended_at,
            duration_seconds: session.duration_seconds,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorSessionsQuery {
    pub status: Option<SessionStatus>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum BookingError {
    #[error("Patient not found")]
    PatientNotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Free session already used")]
    FreeSessionAlreadyUsed,

    #[error("Scheduled time must be in the future")]
    ScheduledInPast,

    #[error("Invalid intake responses: {0}")]
    InvalidIntake(String),

    #[error("Invalid session type: {0}")]
    InvalidSessionType(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: SessionStatus, to: SessionStatus },

    #[error("Session cannot be joined while {0}")]
    SessionNotJoinable(SessionStatus),

    #[error("Session payment has not completed")]
    PaymentRequired,

    #[error("Session belongs to another doctor")]
    NotSessionDoctor,

    #[error("Invalid payment callback signature")]
    InvalidSignature,

    #[error("Payment provider error: {0}")]
    Payment(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lifecycle_transitions() {
        assert!(SessionStatus::Scheduled.can_transition_to(SessionStatus::InProgress));
        assert!(SessionStatus::Scheduled.can_transition_to(SessionStatus::Cancelled));
        assert!(SessionStatus::InProgress.can_transition_to(SessionStatus::Completed));
        assert!(!SessionStatus::InProgress.can_transition_to(SessionStatus::Scheduled));
        assert!(!SessionStatus::Completed.can_transition_to(SessionStatus::Cancelled));
        assert!(SessionStatus::Cancelled.valid_transitions().is_empty());
    }

    #[test]
    fn request_uses_rpc_field_names() {
        let request: CreatePaymentSessionRequest = serde_json::from_value(json!({
            "patientId": "703",
            "doctorId": 2,
            "scheduledAt": "2030-01-01T10:00:00Z",
            "sessionType": "paid",
            "intakeResponses": { "problem_type": ["anxiety", "sleep"] }
        }))
        .unwrap();

        assert_eq!(request.session_type, SessionType::Paid);
        assert_eq!(request.intake_responses["problem_type"].len(), 2);
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(serde_json::to_value(SessionStatus::InProgress).unwrap(), json!("in_progress"));
        assert_eq!(SessionStatus::InProgress.to_string(), "in_progress");
    }
}
