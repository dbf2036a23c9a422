use std::sync::Arc;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use uuid::Uuid;

use shared_config::{AppConfig, DoctorDirectoryMode, default_stun_servers};
use shared_models::auth::JwtClaims;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_service_role_key: String,
    pub paymob_api_url: String,
    pub phone_hash_key: String,
    pub paymob_hmac_secret: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_role_key: "test-service-role-key".to_string(),
            paymob_api_url: "http://localhost:54322/api".to_string(),
            phone_hash_key: "test-phone-hash-key".to_string(),
            paymob_hmac_secret: "test-paymob-hmac-secret".to_string(),
        }
    }
}

impl TestConfig {
    /// Storage and Paymob both pointed at the same mock server.
    pub fn with_mock_server(uri: &str) -> Self {
        Self {
            supabase_url: uri.to_string(),
            paymob_api_url: format!("{}/api", uri),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_service_role_key: self.supabase_service_role_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            paymob_api_url: self.paymob_api_url.clone(),
            paymob_api_key: "egy_sk_test_key".to_string(),
            paymob_integration_id: "4512345".to_string(),
            paymob_hmac_secret: self.paymob_hmac_secret.clone(),
            paymob_checkout_base_url: "https://accept.paymob.com/api/acceptance/iframes".to_string(),
            paymob_timeout_secs: 5,
            phone_hash_key: self.phone_hash_key.clone(),
            session_rate_egp: 499,
            session_duration_minutes: 45,
            doctor_directory: DoctorDirectoryMode::Static,
            stun_servers: default_stun_servers(),
            port: 3000,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl TestUser {
    pub fn new(id: &str, role: &str) -> Self {
        Self {
            id: id.to_string(),
            email: format!("{}-{}@clinic.test", role, id),
            role: role.to_string(),
        }
    }

    pub fn doctor(doctor_id: &str) -> Self {
        Self::new(doctor_id, "doctor")
    }

}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let claims = JwtClaims {
            sub: user.id.clone(),
            exp: exp.timestamp().max(0) as u64,
            email: Some(user.email.clone()),
            role: Some(user.role.clone()),
            aud: Some("authenticated".to_string()),
            iat: Some(now.timestamp() as u64),
        };

        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
            .expect("test token encodes")
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }
}

/// Canned PostgREST rows.
pub struct MockStorageRows;

impl MockStorageRows {
    pub fn patient_row(anonymous_id: &str, phone_hash: &str, used_free: bool) -> serde_json::Value {
        json!({
            "anonymous_id": anonymous_id,
            "phone_number_hash": phone_hash,
            "has_used_free_session": used_free,
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z"
        })
    }

    pub fn session_row(
        session_id: Uuid,
        patient_id: &str,
        doctor_id: i64,
        session_type: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": session_id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "session_type": session_type,
            "status": status,
            "scheduled_at": (Utc::now() + Duration::days(1)).to_rfc3339(),
            "started_at": null,
            "ended_at": null,
            "duration_seconds": null,
            "notes": null,
            "diagnosis": null,
            "follow_up_points": null,
            "recording_consent": false,
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z"
        })
    }

    pub fn payment_row(
        payment_id: Uuid,
        session_id: Uuid,
        patient_id: &str,
        status: &str,
        provider_order_id: Option<i64>,
    ) -> serde_json::Value {
        json!({
            "id": payment_id,
            "session_id": session_id,
            "patient_id": patient_id,
            "amount_cents": 49900,
            "currency": "EGP",
            "status": status,
            "merchant_order_id": format!("session_{}", session_id),
            "provider_order_id": provider_order_id,
            "provider_charge_id": null,
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z"
        })
    }

    pub fn doctor_row(id: i64, name: &str, specialization: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "specialization": specialization,
            "experience_years": 5,
            "rating": 4.8,
            "is_active": true
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
