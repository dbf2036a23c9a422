use std::sync::Arc;

use assert_matches::assert_matches;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doctor_cell::models::DoctorError;
use doctor_cell::services::DoctorAccounts;
use shared_database::SupabaseClient;
use shared_utils::test_utils::TestConfig;

fn accounts_for(server: &MockServer) -> DoctorAccounts {
    let config = TestConfig::with_mock_server(&server.uri()).to_app_config();
    DoctorAccounts::new(Arc::new(SupabaseClient::new(&config)))
}

#[tokio::test]
async fn auth_user_resolves_to_profile_id() {
    let server = MockServer::start().await;
    let user_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_profiles"))
        .and(query_param("user_id", format!("eq.{}", user_id)))
        .and(query_param("select", "id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 7 }])))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(accounts_for(&server).doctor_id_for_user(user_id).await.unwrap(), 7);
}

#[tokio::test]
async fn account_without_profile_is_not_a_doctor() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    assert_matches!(
        accounts_for(&server).doctor_id_for_user(Uuid::new_v4()).await,
        Err(DoctorError::NotFound)
    );
}
