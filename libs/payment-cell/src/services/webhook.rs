use serde_json::Value;
use tracing::warn;

use shared_utils::crypto::verify_hmac_sha512_hex;

use crate::models::{PaymentError, TransactionCallback};

/// Fields Paymob concatenates, in this order, before signing a transaction
/// callback.
const SIGNED_FIELDS: [&str; 20] = [
    "/amount_cents",
    "/created_at",
    "/currency",
    "/error_occured",
    "/has_parent_transaction",
    "/id",
    "/integration_id",
    "/is_3d_secure",
    "/is_auth",
    "/is_capture",
    "/is_refunded",
    "/is_standalone_payment",
    "/is_voided",
    "/order/id",
    "/owner",
    "/pending",
    "/source_data/pan",
    "/source_data/sub_type",
    "/source_data/type",
    "/success",
];

fn render(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    }
}

/// String Paymob signs for a transaction object.
pub fn signing_payload(obj: &Value) -> String {
    SIGNED_FIELDS
        .iter()
        .map(|pointer| render(obj.pointer(pointer)))
        .collect()
}

fn int_field(obj: &Value, pointer: &str) -> Result<i64, PaymentError> {
    match obj.pointer(pointer) {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| PaymentError::MalformedCallback(format!("missing {}", pointer)))
}

fn bool_field(obj: &Value, pointer: &str) -> bool {
    obj.pointer(pointer).and_then(Value::as_bool).unwrap_or(false)
}

/// Check the callback signature and extract the fields the ledger needs.
/// Nothing is trusted before the signature matches.
pub fn verify_callback(
    hmac_secret: &str,
    body: &Value,
    signature: &str,
) -> Result<TransactionCallback, PaymentError> {
    if hmac_secret.is_empty() {
        return Err(PaymentError::NotConfigured);
    }

    let obj = body
        .get("obj")
        .ok_or_else(|| PaymentError::MalformedCallback("missing obj".to_string()))?;

    if !verify_hmac_sha512_hex(hmac_secret.as_bytes(), signing_payload(obj).as_bytes(), signature) {
        warn!("Rejected Paymob callback with a bad signature");
        return Err(PaymentError::InvalidSignature);
    }

    Ok(TransactionCallback {
        transaction_id: int_field(obj, "/id")?,
        order_id: int_field(obj, "/order/id")?,
        amount_cents: int_field(obj, "/amount_cents")?,
        success: bool_field(obj, "/success"),
        pending: bool_field(obj, "/pending"),
        is_refunded: bool_field(obj, "/is_refunded"),
        is_voided: bool_field(obj, "/is_voided"),
    })
}
