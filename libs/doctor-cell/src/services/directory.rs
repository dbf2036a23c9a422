use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use shared_config::{AppConfig, DoctorDirectoryMode};
use shared_database::supabase::{eq, SupabaseClient};

use crate::models::{Doctor, DoctorError};

/// Source of bookable doctors.
#[async_trait]
pub trait DoctorDirectory: Send + Sync {
    async fn list_available(&self) -> Result<Vec<Doctor>, DoctorError>;

    async fn find(&self, doctor_id: i64) -> Result<Doctor, DoctorError> {
        self.list_available()
            .await?
            .into_iter()
            .find(|doctor| doctor.id == doctor_id)
            .ok_or(DoctorError::NotFound)
    }
}

/// Fixed roster used until availability comes from real scheduling data.
pub struct StaticDoctorDirectory {
    doctors: Vec<Doctor>,
}

impl StaticDoctorDirectory {
    pub fn new(doctors: Vec<Doctor>) -> Self {
        Self { doctors }
    }
}

impl Default for StaticDoctorDirectory {
    fn default() -> Self {
        Self::new(vec![
            Doctor {
                id: 1,
                name: "د. أحمد محمد".to_string(),
                specialization: "متخصص في القلق والاكتئاب".to_string(),
                experience: 5,
                rating: 4.8,
            },
            Doctor {
                id: 2,
                name: "د. فاطمة علي".to_string(),
                specialization: "متخصصة في مشاكل العلاقات".to_string(),
                experience: 7,
                rating: 4.9,
            },
            Doctor {
                id: 3,
                name: "د. محمود حسن".to_string(),
                specialization: "متخصص في الضغط النفسي".to_string(),
                experience: 6,
                rating: 4.7,
            },
        ])
    }
}

#[async_trait]
impl DoctorDirectory for StaticDoctorDirectory {
    async fn list_available(&self) -> Result<Vec<Doctor>, DoctorError> {
        Ok(self.doctors.clone())
    }
}

/// Active rows of `doctor_profiles`.
pub struct DatabaseDoctorDirectory {
    supabase: Arc<SupabaseClient>,
}

const TABLE: &str = "doctor_profiles";
const COLUMNS: &str = "id,name,specialization,experience_years,rating";

impl DatabaseDoctorDirectory {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl DoctorDirectory for DatabaseDoctorDirectory {
    async fn list_available(&self) -> Result<Vec<Doctor>, DoctorError> {
        let query = format!("is_active=eq.true&select={}&order=rating.desc", COLUMNS);
        let doctors: Vec<Doctor> = self.supabase
            .select(TABLE, &query)
            .await
            .map_err(|e| {
                error!("Failed to list doctors: {}", e);
                DoctorError::DatabaseError("Failed to list doctors".to_string())
            })?;

        debug!("Directory returned {} active doctors", doctors.len());
        Ok(doctors)
    }

    async fn find(&self, doctor_id: i64) -> Result<Doctor, DoctorError> {
        let query = format!("id={}&is_active=eq.true&select={}", eq(doctor_id), COLUMNS);
        self.supabase
            .select_one::<Doctor>(TABLE, &query)
            .await
            .map_err(|e| {
                error!("Failed to fetch doctor {}: {}", doctor_id, e);
                DoctorError::DatabaseError("Failed to fetch doctor".to_string())
            })?
            .ok_or(DoctorError::NotFound)
    }
}

pub fn build_directory(config: &AppConfig, supabase: Arc<SupabaseClient>) -> Arc<dyn DoctorDirectory> {
    match config.doctor_directory {
        DoctorDirectoryMode::Static => Arc::new(StaticDoctorDirectory::default()),
        DoctorDirectoryMode::Database => Arc::new(DatabaseDoctorDirectory::new(supabase)),
    }
}
