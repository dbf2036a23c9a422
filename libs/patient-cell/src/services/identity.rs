use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use serde_json::json;
use tracing::{debug, error, info, warn};

use shared_config::AppConfig;
use shared_database::supabase::{eq, is_conflict, SupabaseClient};

use crate::models::{AnonymousPatient, PatientError};
use crate::services::phone::{normalize_phone, phone_digest};

const TABLE: &str = "anonymous_patients";

/// Anonymous ids are three-digit strings.
pub const ANONYMOUS_ID_RANGE: std::ops::RangeInclusive<u32> = 100..=999;
/// Collision-check attempts before giving up on id generation.
pub const MAX_ID_ATTEMPTS: u32 = 50;
/// Insert attempts when a concurrent insert takes the chosen id.
const MAX_INSERT_ATTEMPTS: u32 = 3;

fn storage_error(context: &str, err: anyhow::Error) -> PatientError {
    error!("{}: {}", context, err);
    PatientError::DatabaseError(context.to_string())
}

pub struct PatientIdentityService {
    supabase: Arc<SupabaseClient>,
    phone_hash_key: String,
}

impl PatientIdentityService {
    pub fn new(config: &AppConfig, supabase: Arc<SupabaseClient>) -> Self {
        Self {
            supabase,
            phone_hash_key: config.phone_hash_key.clone(),
        }
    }

    /// Return the patient behind `phone_number`, creating one on first use.
    pub async fn resolve(&self, phone_number: &str) -> Result<AnonymousPatient, PatientError> {
        if self.phone_hash_key.is_empty() {
            error!("PHONE_HASH_KEY is not set; refusing to derive phone digests");
            return Err(PatientError::NotConfigured);
        }

        let phone = normalize_phone(phone_number)?;
        let digest = phone_digest(&self.phone_hash_key, &phone);

        if let Some(existing) = self.find_by_phone_digest(&digest).await? {
            debug!("Resolved existing anonymous patient {}", existing.anonymous_id);
            return Ok(existing);
        }

        for attempt in 1..=MAX_INSERT_ATTEMPTS {
            let anonymous_id = self.generate_anonymous_id().await?;

            match self.insert_patient(&anonymous_id, &digest).await {
                Ok(patient) => {
                    info!("Created anonymous patient {}", patient.anonymous_id);
                    return Ok(patient);
                }
                Err(e) if is_conflict(&e) => {
                    // Either the id was taken meanwhile or the same phone was
                    // registered concurrently.
                    if let Some(existing) = self.find_by_phone_digest(&digest).await? {
                        return Ok(existing);
                    }
                    warn!("Anonymous id collision on insert (attempt {})", attempt);
                }
                Err(e) => return Err(storage_error("Failed to create anonymous patient", e)),
            }
        }

        Err(PatientError::IdSpaceExhausted { attempts: MAX_INSERT_ATTEMPTS })
    }

    pub async fn find_by_anonymous_id(
        &self,
        anonymous_id: &str,
    ) -> Result<AnonymousPatient, PatientError> {
        let query = format!("anonymous_id={}", eq(anonymous_id));
        self.supabase
            .select_one::<AnonymousPatient>(TABLE, &query)
            .await
            .map_err(|e| storage_error("Failed to fetch anonymous patient", e))?
            .ok_or(PatientError::NotFound)
    }

    /// Draw ids from [`ANONYMOUS_ID_RANGE`] until one is not stored yet.
    pub async fn generate_anonymous_id(&self) -> Result<String, PatientError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = random_anonymous_id();
            let query = format!("anonymous_id={}&select=anonymous_id", eq(&candidate));

            let taken: Vec<serde_json::Value> = self.supabase
                .select(TABLE, &query)
                .await
                .map_err(|e| storage_error("Failed to check anonymous id", e))?;

            if taken.is_empty() {
                return Ok(candidate);
            }
        }

        warn!("Anonymous id space looks exhausted");
        Err(PatientError::IdSpaceExhausted { attempts: MAX_ID_ATTEMPTS })
    }

    async fn find_by_phone_digest(
        &self,
        digest: &str,
    ) -> Result<Option<AnonymousPatient>, PatientError> {
        let query = format!("phone_number_hash={}", eq(digest));
        self.supabase
            .select_one(TABLE, &query)
            .await
            .map_err(|e| storage_error("Failed to look up anonymous patient", e))
    }

    async fn insert_patient(
        &self,
        anonymous_id: &str,
        digest: &str,
    ) -> anyhow::Result<AnonymousPatient> {
        let now = Utc::now().to_rfc3339();
        let rows: Vec<AnonymousPatient> = self.supabase
            .insert(TABLE, json!({
                "anonymous_id": anonymous_id,
                "phone_number_hash": digest,
                "has_used_free_session": false,
                "created_at": now,
                "updated_at": now,
            }))
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Insert returned no row"))
    }
}

fn random_anonymous_id() -> String {
    rand::thread_rng().gen_range(ANONYMOUS_ID_RANGE).to_string()
}
