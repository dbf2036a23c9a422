use std::sync::Arc;

use assert_matches::assert_matches;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use payment_cell::models::{PaymentStatus, SettleOutcome, TransactionCallback};
use payment_cell::PaymentLedger;
use shared_database::SupabaseClient;
use shared_utils::test_utils::{MockStorageRows, TestConfig};

fn ledger_for(server: &MockServer) -> PaymentLedger {
    let config = TestConfig::with_mock_server(&server.uri()).to_app_config();
    PaymentLedger::new(Arc::new(SupabaseClient::new(&config)))
}

fn callback(order_id: i64, success: bool) -> TransactionCallback {
    TransactionCallback {
        transaction_id: 777,
        order_id,
        amount_cents: 49_900,
        success,
        pending: false,
        is_refunded: false,
        is_voided: false,
    }
}

#[tokio::test]
async fn pending_record_carries_session_reference() {
    let server = MockServer::start().await;
    let ledger = ledger_for(&server);
    let session_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/rest/v1/payments"))
        .and(body_partial_json(json!({
            "session_id": session_id,
            "patient_id": "703",
            "amount_cents": 49900,
            "currency": "EGP",
            "status": "pending",
            "merchant_order_id": format!("session_{}", session_id)
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockStorageRows::payment_row(Uuid::new_v4(), session_id, "703", "pending", None)
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let record = ledger.create_pending(session_id, "703", 49_900).await.unwrap();
    assert_eq!(record.status, PaymentStatus::Pending);
    assert_eq!(record.session_id, session_id);
}

#[tokio::test]
async fn successful_callback_completes_pending_payment() {
    let server = MockServer::start().await;
    let ledger = ledger_for(&server);
    let payment_id = Uuid::new_v4();
    let session_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/payments"))
        .and(query_param("provider_order_id", "eq.42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStorageRows::payment_row(payment_id, session_id, "703", "pending", Some(42))
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/payments"))
        .and(query_param("status", "in.(pending,failed)"))
        .and(body_partial_json(json!({ "status": "completed", "provider_charge_id": "777" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStorageRows::payment_row(payment_id, session_id, "703", "completed", Some(42))
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = ledger.settle(&callback(42, true)).await.unwrap();
    assert_matches!(outcome, SettleOutcome::Settled(record) if record.status == PaymentStatus::Completed);
}

#[tokio::test]
async fn success_after_decline_completes_failed_payment() {
    let server = MockServer::start().await;
    let ledger = ledger_for(&server);
    let payment_id = Uuid::new_v4();
    let session_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/payments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStorageRows::payment_row(payment_id, session_id, "703", "failed", Some(42))
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/payments"))
        .and(query_param("id", format!("eq.{}", payment_id)))
        .and(query_param("status", "in.(pending,failed)"))
        .and(body_partial_json(json!({ "status": "completed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStorageRows::payment_row(payment_id, session_id, "703", "completed", Some(42))
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = ledger.settle(&callback(42, true)).await.unwrap();
    assert_matches!(outcome, SettleOutcome::Settled(record) if record.status == PaymentStatus::Completed);
}

#[tokio::test]
async fn late_decline_does_not_undo_completion() {
    let server = MockServer::start().await;
    let ledger = ledger_for(&server);

    Mock::given(method("GET"))
        .and(path("/rest/v1/payments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStorageRows::payment_row(Uuid::new_v4(), Uuid::new_v4(), "703", "completed", Some(42))
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = ledger.settle(&callback(42, false)).await.unwrap();
    assert_matches!(outcome, SettleOutcome::AlreadySettled(record) if record.status == PaymentStatus::Completed);
}

#[tokio::test]
async fn mismatched_amount_is_not_completed() {
    let server = MockServer::start().await;
    let ledger = ledger_for(&server);

    Mock::given(method("GET"))
        .and(path("/rest/v1/payments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStorageRows::payment_row(Uuid::new_v4(), Uuid::new_v4(), "703", "pending", Some(42))
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let mut underpaid = callback(42, true);
    underpaid.amount_cents = 1_000;

    let outcome = ledger.settle(&underpaid).await.unwrap();
    assert_matches!(outcome, SettleOutcome::AmountMismatch(record) if record.status == PaymentStatus::Pending);
}

#[tokio::test]
async fn replayed_callback_does_not_transition_again() {
    let server = MockServer::start().await;
    let ledger = ledger_for(&server);

    Mock::given(method("GET"))
        .and(path("/rest/v1/payments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStorageRows::payment_row(Uuid::new_v4(), Uuid::new_v4(), "703", "completed", Some(42))
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = ledger.settle(&callback(42, true)).await.unwrap();
    assert_matches!(outcome, SettleOutcome::AlreadySettled(_));
}

#[tokio::test]
async fn unknown_order_is_reported() {
    let server = MockServer::start().await;
    let ledger = ledger_for(&server);

    Mock::given(method("GET"))
        .and(path("/rest/v1/payments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    assert_matches!(ledger.settle(&callback(1, false)).await.unwrap(), SettleOutcome::UnknownOrder);
}

#[tokio::test]
async fn mark_failed_only_touches_pending_rows() {
    let server = MockServer::start().await;
    let ledger = ledger_for(&server);
    let payment_id = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/payments"))
        .and(query_param("id", format!("eq.{}", payment_id)))
        .and(query_param("status", "eq.pending"))
        .and(body_partial_json(json!({ "status": "failed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    ledger.mark_failed(payment_id).await.unwrap();
}
