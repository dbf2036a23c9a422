use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{error, info};
use uuid::Uuid;

use shared_database::SupabaseClient;

use crate::models::{ConsentOrigin, ConsentRecord, ConsentRequest, PatientError};
use crate::services::identity::PatientIdentityService;

const TABLE: &str = "consent_records";

/// Version of the consent texts shown by the booking form.
pub const CONSENT_VERSION: &str = "1.0";

/// Append-only log of patient consent decisions.
pub struct ConsentService {
    supabase: Arc<SupabaseClient>,
    identity: PatientIdentityService,
}

impl ConsentService {
    pub fn new(supabase: Arc<SupabaseClient>, identity: PatientIdentityService) -> Self {
        Self { supabase, identity }
    }

    /// Stores one row per consent type. Booking cannot proceed without the
    /// privacy policy and terms, so a request refusing either stores nothing.
    pub async fn record(
        &self,
        anonymous_id: &str,
        request: &ConsentRequest,
        origin: &ConsentOrigin,
    ) -> Result<Vec<ConsentRecord>, PatientError> {
        if !request.privacy_policy || !request.terms_of_service {
            return Err(PatientError::ConsentRequired);
        }

        let patient = self.identity.find_by_anonymous_id(anonymous_id).await?;

        let rows: Vec<Value> = request
            .decisions()
            .into_iter()
            .map(|(consent_type, given)| {
                json!({
                    "id": Uuid::new_v4(),
                    "patient_id": patient.anonymous_id,
                    "consent_type": consent_type,
                    "consent_given": given,
                    "consent_version": CONSENT_VERSION,
                    "ip_address": origin.ip_address,
                    "user_agent": origin.user_agent,
                })
            })
            .collect();

        let records: Vec<ConsentRecord> = self.supabase
            .insert(TABLE, Value::Array(rows))
            .await
            .map_err(|e| {
                error!("Failed to record consent: {}", e);
                PatientError::DatabaseError("Failed to record consent".to_string())
            })?;

        info!("Recorded {} consent decisions for patient {}", records.len(), patient.anonymous_id);
        Ok(records)
    }
}
