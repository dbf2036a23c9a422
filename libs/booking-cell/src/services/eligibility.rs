use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, error, info, warn};

use patient_cell::models::AnonymousPatient;
use shared_database::supabase::{eq, SupabaseClient};

use crate::models::BookingError;

const TABLE: &str = "anonymous_patients";

/// One free session per patient identity. The flag is flipped with a single
/// conditional update so two concurrent bookings cannot both claim it.
pub struct FreeSessionGate {
    supabase: Arc<SupabaseClient>,
}

impl FreeSessionGate {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Non-consuming read of the flag.
    pub async fn check(&self, anonymous_id: &str) -> Result<bool, BookingError> {
        let query = format!("anonymous_id={}&select=*", eq(anonymous_id));
        let patient: AnonymousPatient = self.supabase
            .select_one(TABLE, &query)
            .await
            .map_err(|e| {
                error!("Failed to read free-session flag: {}", e);
                BookingError::DatabaseError("Failed to read patient".to_string())
            })?
            .ok_or(BookingError::PatientNotFound)?;

        Ok(patient.has_used_free_session)
    }

    /// Sets the flag where it is still false. `true` means this caller owns
    /// the free session.
    pub async fn try_consume(&self, anonymous_id: &str) -> Result<bool, BookingError> {
        let claimed = self.flip(anonymous_id, false, true).await?;
        if claimed {
            info!("Free session claimed by patient {}", anonymous_id);
        } else {
            debug!("Free session already claimed for patient {}", anonymous_id);
        }
        Ok(claimed)
    }

    /// Compensates a successful [`try_consume`](Self::try_consume) whose
    /// booking could not be written.
    pub async fn release(&self, anonymous_id: &str) -> Result<(), BookingError> {
        if !self.flip(anonymous_id, true, false).await? {
            warn!("Free session for patient {} was not held at release", anonymous_id);
        }
        Ok(())
    }

    async fn flip(&self, anonymous_id: &str, from: bool, to: bool) -> Result<bool, BookingError> {
        let query = format!(
            "anonymous_id={}&has_used_free_session=eq.{}",
            eq(anonymous_id),
            from
        );
        let body = json!({
            "has_used_free_session": to,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let rows: Vec<AnonymousPatient> = self.supabase
            .update(TABLE, &query, body)
            .await
            .map_err(|e| {
                error!("Failed to update free-session flag: {}", e);
                BookingError::DatabaseError("Failed to update patient".to_string())
            })?;

        Ok(!rows.is_empty())
    }
}
