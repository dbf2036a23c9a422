use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: i64,
    pub name: String,
    pub specialization: String,
    /// Years of practice.
    #[serde(alias = "experience_years")]
    pub experience: i32,
    pub rating: f32,
}

impl Doctor {
    pub fn has_valid_rating(&self) -> bool {
        (0.0..=5.0).contains(&self.rating)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Database error: {0}")]
    DatabaseError(String),
}
