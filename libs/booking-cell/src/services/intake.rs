use std::collections::HashSet;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, error};
use uuid::Uuid;

use shared_database::SupabaseClient;

use crate::models::{BookingError, IntakeAnswers, IntakeResponse};

const TABLE: &str = "intake_responses";

pub const MAX_QUESTIONS: usize = 20;
pub const MAX_OPTIONS_PER_QUESTION: usize = 20;
const MAX_KEY_LEN: usize = 100;

/// Rejects empty keys, empty option lists and oversized questionnaires. Keys
/// are stored trimmed, so two keys that trim to the same text are rejected.
pub fn validate_answers(answers: &IntakeAnswers) -> Result<(), BookingError> {
    if answers.len() > MAX_QUESTIONS {
        return Err(BookingError::InvalidIntake(format!(
            "at most {} questions allowed",
            MAX_QUESTIONS
        )));
    }

    let mut seen = HashSet::with_capacity(answers.len());
    for (key, options) in answers {
        let key = key.trim();
        if key.is_empty() || key.len() > MAX_KEY_LEN {
            return Err(BookingError::InvalidIntake("invalid question key".to_string()));
        }
        if !seen.insert(key) {
            return Err(BookingError::InvalidIntake(format!("duplicate question {}", key)));
        }
        if options.is_empty() {
            return Err(BookingError::InvalidIntake(format!("no option selected for {}", key)));
        }
        if options.len() > MAX_OPTIONS_PER_QUESTION {
            return Err(BookingError::InvalidIntake(format!("too many options for {}", key)));
        }
        if options.iter().any(|option| option.trim().is_empty()) {
            return Err(BookingError::InvalidIntake(format!("empty option for {}", key)));
        }
    }

    Ok(())
}

pub struct IntakeService {
    supabase: Arc<SupabaseClient>,
}

impl IntakeService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// One row per answered question, tied to the booked session.
    pub async fn record(
        &self,
        session_id: Uuid,
        patient_id: &str,
        answers: &IntakeAnswers,
    ) -> Result<Vec<IntakeResponse>, BookingError> {
        if answers.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<Value> = answers
            .iter()
            .map(|(key, options)| json!({
                "id": Uuid::new_v4(),
                "session_id": session_id,
                "patient_id": patient_id,
                "question_key": key.trim(),
                "selected_options": options,
            }))
            .collect();

        let stored: Vec<IntakeResponse> = self.supabase
            .insert(TABLE, Value::Array(rows))
            .await
            .map_err(|e| {
                error!("Failed to store intake responses for session {}: {}", session_id, e);
                BookingError::DatabaseError("Failed to store intake responses".to_string())
            })?;

        debug!("Stored {} intake responses for session {}", stored.len(), session_id);
        Ok(stored)
    }
}
