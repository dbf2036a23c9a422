use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{any, body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use patient_cell::router::{patient_routes, PatientState};
use shared_database::SupabaseClient;
use shared_models::messages;
use shared_utils::test_utils::{MockStorageRows, TestConfig};

const PATIENT_ID: &str = "512";

fn app_for(server: &MockServer) -> Router {
    let config = TestConfig::with_mock_server(&server.uri()).to_arc();
    let supabase = Arc::new(SupabaseClient::new(&config));
    patient_routes(PatientState { config, supabase })
}

async fn post_consent(app: Router, anonymous_id: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/{}/consents", anonymous_id))
                .header("content-type", "application/json")
                .header("user-agent", "Mozilla/5.0 (Android 14)")
                .header("x-forwarded-for", "41.33.1.20")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn consent_row(consent_type: &str, given: bool) -> Value {
    json!({
        "id": uuid::Uuid::new_v4(),
        "patient_id": PATIENT_ID,
        "consent_type": consent_type,
        "consent_given": given,
        "consent_version": "1.0",
        "ip_address": "41.33.1.20",
        "user_agent": "Mozilla/5.0 (Android 14)",
        "created_at": "2026-01-01T00:00:00Z"
    })
}

#[tokio::test]
async fn booking_consents_are_recorded_per_type() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/anonymous_patients"))
        .and(query_param("anonymous_id", format!("eq.{}", PATIENT_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStorageRows::patient_row(PATIENT_ID, "digest", false)
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/consent_records"))
        .and(body_partial_json(json!([
            { "patient_id": PATIENT_ID, "consent_type": "privacy_policy", "consent_given": true,
              "consent_version": "1.0", "ip_address": "41.33.1.20", "user_agent": "Mozilla/5.0 (Android 14)" },
            { "consent_type": "terms_of_service", "consent_given": true },
            { "consent_type": "recording", "consent_given": false }
        ])))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            consent_row("privacy_policy", true),
            consent_row("terms_of_service", true),
            consent_row("recording", false),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = post_consent(
        app_for(&server),
        PATIENT_ID,
        json!({ "privacyPolicy": true, "termsOfService": true }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], messages::CONSENT_RECORDED);
    assert_eq!(body["consents"].as_array().unwrap().len(), 3);
    assert_eq!(body["consents"][2]["consentType"], "recording");
    assert_eq!(body["consents"][2]["consentGiven"], false);
}

#[tokio::test]
async fn refusing_the_terms_stores_nothing() {
    let server = MockServer::start().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let (status, body) = post_consent(
        app_for(&server),
        PATIENT_ID,
        json!({ "privacyPolicy": true, "termsOfService": false, "recording": true }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], messages::CONSENT_REQUIRED);
}

#[tokio::test]
async fn unknown_patient_cannot_consent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/anonymous_patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let (status, body) = post_consent(
        app_for(&server),
        "999",
        json!({ "privacyPolicy": true, "termsOfService": true }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], messages::PATIENT_NOT_FOUND);
}
