use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use payment_cell::models::{PaymentError, PaymentStatus, SettleOutcome};
use payment_cell::services::verify_callback;
use payment_cell::{PaymentLedger, PaymobClient};
use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::BookingError;
use crate::services::lifecycle::SessionLifecycleService;

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// The payment moved to this status.
    Applied(PaymentStatus),
    /// Replay or late callback; nothing changed.
    Duplicate,
    /// Paid amount differs from the record; left pending for review.
    AmountMismatch,
    UnknownOrder,
    /// Not a transaction callback, or still pending.
    Ignored,
}

/// Applies Paymob transaction callbacks to the ledger and the booked session.
pub struct PaymentReconciler {
    ledger: PaymentLedger,
    lifecycle: SessionLifecycleService,
    paymob: Arc<PaymobClient>,
    hmac_secret: String,
}

impl PaymentReconciler {
    pub fn new(config: &AppConfig, supabase: Arc<SupabaseClient>, paymob: Arc<PaymobClient>) -> Self {
        Self {
            ledger: PaymentLedger::new(supabase.clone()),
            lifecycle: SessionLifecycleService::new(supabase),
            paymob,
            hmac_secret: config.paymob_hmac_secret.clone(),
        }
    }

    pub async fn handle_callback(
        &self,
        body: &Value,
        signature: &str,
    ) -> Result<ReconcileOutcome, BookingError> {
        let callback = verify_callback(&self.hmac_secret, body, signature).map_err(|e| match e {
            PaymentError::InvalidSignature | PaymentError::NotConfigured => BookingError::InvalidSignature,
            other => BookingError::Payment(other.to_string()),
        })?;

        if body.get("type").and_then(Value::as_str).is_some_and(|t| t != "TRANSACTION") {
            debug!("Ignoring non-transaction callback");
            return Ok(ReconcileOutcome::Ignored);
        }
        if callback.target_status().is_none() {
            return Ok(ReconcileOutcome::Ignored);
        }

        if callback.target_status() == Some(PaymentStatus::Completed) {
            let confirmed = self.paymob
                .verify_transaction(callback.transaction_id)
                .await
                .map_err(|e| BookingError::Payment(e.to_string()))?;
            if !confirmed {
                warn!("Paymob did not confirm transaction {}", callback.transaction_id);
                return Ok(ReconcileOutcome::Ignored);
            }
        }

        let outcome = self.ledger
            .settle(&callback)
            .await
            .map_err(|e| BookingError::Payment(e.to_string()))?;

        match outcome {
            SettleOutcome::UnknownOrder => Ok(ReconcileOutcome::UnknownOrder),
            SettleOutcome::AlreadySettled(record) => {
                debug!("Payment {} already {}", record.id, record.status);
                Ok(ReconcileOutcome::Duplicate)
            }
            SettleOutcome::AmountMismatch(record) => {
                warn!("Payment {} for session {} needs review", record.id, record.session_id);
                Ok(ReconcileOutcome::AmountMismatch)
            }
            SettleOutcome::Settled(record) => {
                match record.status {
                    PaymentStatus::Completed => {
                        info!("Session {} paid", record.session_id);
                    }
                    // The payment key stays valid, so the patient may retry.
                    // The session cannot be joined until a payment completes.
                    PaymentStatus::Failed => {
                        info!("Payment for session {} declined", record.session_id);
                    }
                    PaymentStatus::Refunded => {
                        self.lifecycle.cancel_unpaid(record.session_id).await?;
                    }
                    PaymentStatus::Pending => {}
                }
                Ok(ReconcileOutcome::Applied(record.status))
            }
        }
    }
}
