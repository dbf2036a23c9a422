use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Row of `anonymous_patients`. The phone number is only ever held as a keyed
/// digest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnonymousPatient {
    pub anonymous_id: String,
    pub phone_number_hash: String,
    pub has_used_free_session: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnonymousPatientRequest {
    pub phone_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnonymousPatientResponse {
    pub anonymous_id: String,
    pub has_used_free_session: bool,
}

impl From<AnonymousPatient> for AnonymousPatientResponse {
    fn from(patient: AnonymousPatient) -> Self {
        Self {
            anonymous_id: patient.anonymous_id,
            has_used_free_session: patient.has_used_free_session,
        }
    }
}

// ==============================================================================
// CONSENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConsentType {
    Recording,
    PrivacyPolicy,
    TermsOfService,
}

impl fmt::Display for ConsentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsentType::Recording => write!(f, "recording"),
            ConsentType::PrivacyPolicy => write!(f, "privacy_policy"),
            ConsentType::TermsOfService => write!(f, "terms_of_service"),
        }
    }
}

/// Row of `consent_records`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentRecord {
    pub id: Uuid,
    pub patient_id: String,
    pub consent_type: ConsentType,
    pub consent_given: bool,
    pub consent_version: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Consent checkboxes of the booking form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentRequest {
    pub privacy_policy: bool,
    pub terms_of_service: bool,
    #[serde(default)]
    pub recording: bool,
}

impl ConsentRequest {
    pub fn decisions(&self) -> [(ConsentType, bool); 3] {
        [
            (ConsentType::PrivacyPolicy, self.privacy_policy),
            (ConsentType::TermsOfService, self.terms_of_service),
            (ConsentType::Recording, self.recording),
        ]
    }
}

/// Where a consent was given from.
#[derive(Debug, Clone, Default)]
pub struct ConsentOrigin {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConsentView {
    pub consent_type: ConsentType,
    pub consent_given: bool,
    pub consent_version: String,
}

impl From<ConsentRecord> for ConsentView {
    fn from(record: ConsentRecord) -> Self {
        Self {
            consent_type: record.consent_type,
            consent_given: record.consent_given,
            consent_version: record.consent_version,
        }
    }
}

// Display strings must never include the phone number.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PatientError {
    #[error("Invalid phone number")]
    InvalidPhone,

    #[error("Patient not found")]
    NotFound,

    #[error("Phone hashing key not configured")]
    NotConfigured,

    #[error("Consent to the privacy policy and terms is required")]
    ConsentRequired,

    #[error("No free anonymous id after {attempts} attempts")]
    IdSpaceExhausted { attempts: u32 },

    #[error("Database error: {0}")]
    DatabaseError(String),
}
