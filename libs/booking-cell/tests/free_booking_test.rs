use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use booking_cell::router::{booking_routes, BookingState};
use doctor_cell::services::StaticDoctorDirectory;
use patient_cell::router::{patient_routes, PatientState};
use patient_cell::services::phone::phone_digest;
use payment_cell::PaymobClient;
use shared_database::SupabaseClient;
use shared_models::messages;
use shared_utils::test_utils::{MockStorageRows, TestConfig};

const PHONE: &str = "201001234567";
const PATIENT_ID: &str = "703";

fn app_for(server: &MockServer) -> Router {
    let config = TestConfig::with_mock_server(&server.uri()).to_arc();
    let supabase = Arc::new(SupabaseClient::new(&config));

    let booking = BookingState {
        config: config.clone(),
        supabase: supabase.clone(),
        directory: Arc::new(StaticDoctorDirectory::default()),
        paymob: Arc::new(PaymobClient::new(&config)),
    };

    Router::new()
        .nest("/patients", patient_routes(PatientState { config, supabase }))
        .nest("/bookings", booking_routes(booking))
}

fn free_booking_body(doctor_id: i64) -> Value {
    json!({
        "patientId": PATIENT_ID,
        "doctorId": doctor_id,
        "scheduledAt": (Utc::now() + Duration::days(2)).to_rfc3339(),
        "intakeResponses": { "problem_type": ["anxiety"], "duration": ["months"] }
    })
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn mount_session_insert(server: &MockServer, expected: u64) {
    Mock::given(method("POST"))
        .and(path("/rest/v1/therapy_sessions"))
        .and(body_partial_json(json!({
            "patient_id": PATIENT_ID,
            "session_type": "free",
            "status": "scheduled",
            "recording_consent": false
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockStorageRows::session_row(Uuid::new_v4(), PATIENT_ID, 1, "free", "scheduled")
        ])))
        .expect(expected)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/intake_responses"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn phone_lookup_then_one_free_booking_only() {
    let server = MockServer::start().await;
    let app = app_for(&server);
    let config = TestConfig::with_mock_server(&server.uri()).to_app_config();
    let digest = phone_digest(&config.phone_hash_key, PHONE);

    // Patient already registered by phone.
    Mock::given(method("GET"))
        .and(path("/rest/v1/anonymous_patients"))
        .and(query_param("phone_number_hash", format!("eq.{}", digest)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStorageRows::patient_row(PATIENT_ID, &digest, false)
        ])))
        .mount(&server)
        .await;
    // The flag reads false until the first booking claims it.
    Mock::given(method("GET"))
        .and(path("/rest/v1/anonymous_patients"))
        .and(query_param("anonymous_id", format!("eq.{}", PATIENT_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStorageRows::patient_row(PATIENT_ID, &digest, false)
        ])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/anonymous_patients"))
        .and(query_param("anonymous_id", format!("eq.{}", PATIENT_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStorageRows::patient_row(PATIENT_ID, &digest, true)
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/anonymous_patients"))
        .and(query_param("has_used_free_session", "eq.false"))
        .and(body_partial_json(json!({ "has_used_free_session": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStorageRows::patient_row(PATIENT_ID, &digest, true)
        ])))
        .expect(1)
        .mount(&server)
        .await;
    mount_session_insert(&server, 1).await;

    let (status, first) = post_json(&app, "/patients/anonymous", json!({ "phoneNumber": PHONE })).await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = post_json(&app, "/patients/anonymous", json!({ "phoneNumber": PHONE })).await;
    assert_eq!(first["anonymousId"], second["anonymousId"]);
    assert_eq!(second["hasUsedFreeSession"], false);

    let (status, booked) = post_json(&app, "/bookings/free", free_booking_body(1)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(booked["message"], messages::FREE_SESSION_BOOKED);
    assert!(booked["sessionId"].is_string());

    let (status, rejected) = post_json(&app, "/bookings/free", free_booking_body(1)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(rejected["error"], messages::FREE_SESSION_ALREADY_USED);
}

#[tokio::test]
async fn losing_the_claim_writes_no_session() {
    let server = MockServer::start().await;
    let app = app_for(&server);

    Mock::given(method("GET"))
        .and(path("/rest/v1/anonymous_patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStorageRows::patient_row(PATIENT_ID, "digest", false)
        ])))
        .mount(&server)
        .await;
    // A concurrent booking flipped the flag between read and claim.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/anonymous_patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    mount_session_insert(&server, 0).await;

    let (status, body) = post_json(&app, "/bookings/free", free_booking_body(2)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], messages::FREE_SESSION_ALREADY_USED);
}

#[tokio::test]
async fn failed_insert_releases_the_claim() {
    let server = MockServer::start().await;
    let app = app_for(&server);

    Mock::given(method("GET"))
        .and(path("/rest/v1/anonymous_patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStorageRows::patient_row(PATIENT_ID, "digest", false)
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/anonymous_patients"))
        .and(query_param("has_used_free_session", "eq.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStorageRows::patient_row(PATIENT_ID, "digest", true)
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/anonymous_patients"))
        .and(query_param("has_used_free_session", "eq.true"))
        .and(body_partial_json(json!({ "has_used_free_session": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStorageRows::patient_row(PATIENT_ID, "digest", false)
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/therapy_sessions"))
        .respond_with(ResponseTemplate::new(500).set_body_json(
            MockStorageRows::error_response("connection reset", "08006"),
        ))
        .mount(&server)
        .await;

    let (status, body) = post_json(&app, "/bookings/free", free_booking_body(3)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], messages::BOOKING_FAILED);
}

#[tokio::test]
async fn past_schedule_is_rejected_before_storage() {
    let server = MockServer::start().await;
    let app = app_for(&server);

    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let mut body = free_booking_body(1);
    body["scheduledAt"] = json!((Utc::now() - Duration::hours(1)).to_rfc3339());

    let (status, response) = post_json(&app, "/bookings/free", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], messages::INVALID_BOOKING_REQUEST);
}

#[tokio::test]
async fn unknown_doctor_is_not_found() {
    let server = MockServer::start().await;
    let app = app_for(&server);

    Mock::given(method("GET"))
        .and(path("/rest/v1/anonymous_patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStorageRows::patient_row(PATIENT_ID, "digest", false)
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let (status, body) = post_json(&app, "/bookings/free", free_booking_body(99)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], messages::DOCTOR_NOT_FOUND);
}

#[tokio::test]
async fn unknown_patient_is_not_found() {
    let server = MockServer::start().await;
    let app = app_for(&server);

    Mock::given(method("GET"))
        .and(path("/rest/v1/anonymous_patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let (status, body) = post_json(&app, "/bookings/free", free_booking_body(1)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], messages::PATIENT_NOT_FOUND);
}
