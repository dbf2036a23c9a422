use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// PAYMOB WIRE MODELS
// ==============================================================================

#[derive(Debug, Serialize)]
pub struct PaymobAuthRequest<'a> {
    pub api_key: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct PaymobAuthResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct PaymobOrderRequest<'a> {
    pub auth_token: &'a str,
    pub delivery_needed: bool,
    pub amount_cents: i64,
    pub currency: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_order_id: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymobOrderResponse {
    pub id: i64,
    pub amount_cents: Option<i64>,
    pub currency: Option<String>,
    pub order_status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BillingData {
    pub apartment: String,
    pub email: String,
    pub floor: String,
    pub first_name: String,
    pub street: String,
    pub mobile_number: String,
    pub last_name: String,
    pub city: String,
    pub country: String,
    pub postal_code: String,
    pub state: String,
}

#[derive(Debug, Serialize)]
pub struct PaymobPaymentKeyRequest<'a> {
    pub auth_token: &'a str,
    pub amount_cents: i64,
    pub expiration: u32,
    pub order_id: i64,
    pub billing_data: BillingData,
    pub currency: &'a str,
    pub integration_id: i64,
    pub lock_order_when_paid: bool,
}

#[derive(Debug, Deserialize)]
pub struct PaymobPaymentKeyResponse {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct PaymobTransactionResponse {
    pub id: i64,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub pending: bool,
}

// ==============================================================================
// DOMAIN MODELS
// ==============================================================================

/// Minimal customer metadata forwarded to the provider. Patients are
/// anonymous, so every field has a placeholder default.
#[derive(Debug, Clone)]
pub struct CustomerInfo {
    pub email: String,
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl CustomerInfo {
    pub fn anonymous() -> Self {
        Self {
            email: "patient@anonymous.local".to_string(),
            phone: None,
            first_name: None,
            last_name: None,
        }
    }

    pub fn billing_data(&self) -> BillingData {
        let na = || "NA".to_string();
        BillingData {
            apartment: na(),
            email: self.email.clone(),
            floor: na(),
            first_name: self.first_name.clone().unwrap_or_else(|| "Patient".to_string()),
            street: na(),
            mobile_number: self.phone.clone().unwrap_or_else(na),
            last_name: self.last_name.clone().unwrap_or_else(|| "Anonymous".to_string()),
            city: na(),
            country: "EG".to_string(),
            postal_code: na(),
            state: na(),
        }
    }
}

/// Result of the three-step Paymob handshake.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentSession {
    pub checkout_url: String,
    pub order_id: i64,
    pub payment_key: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// Statuses a callback may move a record from to reach `self`. A decline
    /// followed by a successful retry on the same order still completes.
    pub fn settles_from(self) -> &'static [PaymentStatus] {
        match self {
            PaymentStatus::Completed => &[PaymentStatus::Pending, PaymentStatus::Failed],
            PaymentStatus::Failed => &[PaymentStatus::Pending],
            PaymentStatus::Refunded => &[PaymentStatus::Completed],
            PaymentStatus::Pending => &[],
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Completed => write!(f, "completed"),
            PaymentStatus::Failed => write!(f, "failed"),
            PaymentStatus::Refunded => write!(f, "refunded"),
        }
    }
}

/// Row of `payments`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub session_id: Uuid,
    pub patient_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub merchant_order_id: String,
    pub provider_order_id: Option<i64>,
    pub provider_charge_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Verified content of a Paymob transaction callback.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionCallback {
    pub transaction_id: i64,
    pub order_id: i64,
    pub amount_cents: i64,
    pub success: bool,
    pub pending: bool,
    pub is_refunded: bool,
    pub is_voided: bool,
}

impl TransactionCallback {
    /// Payment status this callback moves the record to, if any.
    pub fn target_status(&self) -> Option<PaymentStatus> {
        if self.is_refunded || self.is_voided {
            Some(PaymentStatus::Refunded)
        } else if self.pending {
            None
        } else if self.success {
            Some(PaymentStatus::Completed)
        } else {
            Some(PaymentStatus::Failed)
        }
    }
}

/// Outcome of applying a callback to the ledger.
#[derive(Debug, Clone)]
pub enum SettleOutcome {
    Settled(PaymentRecord),
    AlreadySettled(PaymentRecord),
    /// Successful callback whose amount differs from the record.
    AmountMismatch(PaymentRecord),
    UnknownOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStep {
    Auth,
    Order,
    PaymentKey,
    Verification,
}

impl fmt::Display for HandshakeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakeStep::Auth => write!(f, "auth token"),
            HandshakeStep::Order => write!(f, "order creation"),
            HandshakeStep::PaymentKey => write!(f, "payment key"),
            HandshakeStep::Verification => write!(f, "transaction verification"),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment provider not configured")]
    NotConfigured,

    #[error("Paymob {step} failed: {message}")]
    Provider { step: HandshakeStep, message: String },

    #[error("Invalid callback signature")]
    InvalidSignature,

    #[error("Malformed callback: {0}")]
    MalformedCallback(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
