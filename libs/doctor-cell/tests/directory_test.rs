use std::sync::Arc;

use assert_matches::assert_matches;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doctor_cell::models::DoctorError;
use doctor_cell::router::{doctor_routes, DoctorState};
use doctor_cell::services::{DatabaseDoctorDirectory, DoctorDirectory, StaticDoctorDirectory};
use shared_database::SupabaseClient;
use shared_models::messages;
use shared_utils::test_utils::{MockStorageRows, TestConfig};

#[tokio::test]
async fn static_roster_has_rated_doctors() {
    let directory = StaticDoctorDirectory::default();
    let doctors = directory.list_available().await.unwrap();

    assert!(!doctors.is_empty());
    for doctor in &doctors {
        assert!(doctor.has_valid_rating());
        assert!(!doctor.name.is_empty());
        assert!(!doctor.specialization.is_empty());
    }
}

#[tokio::test]
async fn static_find_uses_roster() {
    let directory = StaticDoctorDirectory::default();

    assert_eq!(directory.find(2).await.unwrap().id, 2);
    assert_matches!(directory.find(99).await, Err(DoctorError::NotFound));
}

#[tokio::test]
async fn database_directory_reads_active_profiles() {
    let server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&server.uri()).to_app_config();
    let directory = DatabaseDoctorDirectory::new(Arc::new(SupabaseClient::new(&config)));

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_profiles"))
        .and(query_param("is_active", "eq.true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStorageRows::doctor_row(11, "Dr. Salma", "CBT"),
            MockStorageRows::doctor_row(12, "Dr. Omar", "Family therapy"),
        ])))
        .mount(&server)
        .await;

    let doctors = directory.list_available().await.unwrap();
    assert_eq!(doctors.len(), 2);
    assert_eq!(doctors[0].experience, 5);
}

#[tokio::test]
async fn database_directory_reports_missing_doctor() {
    let server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&server.uri()).to_app_config();
    let directory = DatabaseDoctorDirectory::new(Arc::new(SupabaseClient::new(&config)));

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_profiles"))
        .and(query_param("id", "eq.42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    assert_matches!(directory.find(42).await, Err(DoctorError::NotFound));
}

#[tokio::test]
async fn available_route_serializes_public_shape() {
    let app = doctor_routes(DoctorState {
        directory: Arc::new(StaticDoctorDirectory::default()),
    });

    let response = app
        .oneshot(Request::builder().uri("/available").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();

    let first = &json[0];
    for key in ["id", "name", "specialization", "experience", "rating"] {
        assert!(first.get(key).is_some(), "missing {}", key);
    }
}

#[tokio::test]
async fn directory_outage_maps_to_localized_error() {
    let server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&server.uri()).to_app_config();
    let directory = DatabaseDoctorDirectory::new(Arc::new(SupabaseClient::new(&config)));

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let app = doctor_routes(DoctorState { directory: Arc::new(directory) });
    let response = app
        .oneshot(Request::builder().uri("/available").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], messages::DOCTORS_FETCH_FAILED);
}
