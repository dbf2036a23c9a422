use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, error};
use uuid::Uuid;

use shared_database::supabase::{eq, SupabaseClient};

use crate::models::DoctorError;

const TABLE: &str = "doctor_profiles";

#[derive(Debug, Deserialize)]
struct ProfileId {
    id: i64,
}

/// Links staff auth accounts to doctor profiles. The token subject is the
/// auth user id; sessions reference the profile id.
pub struct DoctorAccounts {
    supabase: Arc<SupabaseClient>,
}

impl DoctorAccounts {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Profile id owned by `user_id`, whether or not the profile is listed.
    pub async fn doctor_id_for_user(&self, user_id: Uuid) -> Result<i64, DoctorError> {
        let query = format!("user_id={}&select=id", eq(user_id));
        let profile = self.supabase
            .select_one::<ProfileId>(TABLE, &query)
            .await
            .map_err(|e| {
                error!("Failed to resolve doctor account {}: {}", user_id, e);
                DoctorError::DatabaseError("Failed to resolve doctor account".to_string())
            })?;

        match profile {
            Some(profile) => Ok(profile.id),
            None => {
                debug!("No doctor profile for user {}", user_id);
                Err(DoctorError::NotFound)
            }
        }
    }
}
