use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use booking_cell::router::{patient_session_routes, BookingState};
use doctor_cell::services::StaticDoctorDirectory;
use payment_cell::PaymobClient;
use shared_database::SupabaseClient;
use shared_utils::test_utils::{MockStorageRows, TestConfig};

const PATIENT_ID: &str = "431";

fn app_for(server: &MockServer) -> Router {
    let config = TestConfig::with_mock_server(&server.uri()).to_arc();
    let supabase = Arc::new(SupabaseClient::new(&config));

    patient_session_routes(BookingState {
        config: config.clone(),
        supabase,
        directory: Arc::new(StaticDoctorDirectory::default()),
        paymob: Arc::new(PaymobClient::new(&config)),
    })
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn patient_lists_own_sessions_newest_first() {
    let server = MockServer::start().await;
    let paid = Uuid::new_v4();
    let free = Uuid::new_v4();

    let mut noted = MockStorageRows::session_row(free, PATIENT_ID, 1, "free", "completed");
    noted["notes"] = json!("Private clinical notes");
    Mock::given(method("GET"))
        .and(path("/rest/v1/therapy_sessions"))
        .and(query_param("patient_id", format!("eq.{}", PATIENT_ID)))
        .and(query_param("order", "scheduled_at.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStorageRows::session_row(paid, PATIENT_ID, 2, "paid", "scheduled"),
            noted,
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = get(app_for(&server), &format!("/{}/sessions", PATIENT_ID)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["sessions"][0]["sessionId"], paid.to_string());
    assert_eq!(body["sessions"][0]["sessionType"], "paid");
    assert_eq!(body["sessions"][1]["status"], "completed");
    assert!(body["sessions"][1].get("notes").is_none());
}

#[tokio::test]
async fn patient_without_bookings_gets_empty_list() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/therapy_sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let (status, body) = get(app_for(&server), "/999/sessions").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
    assert_eq!(body["sessions"], json!([]));
}
