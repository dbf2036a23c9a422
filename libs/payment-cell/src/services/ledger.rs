use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shared_config::CURRENCY;
use shared_database::supabase::{eq, SupabaseClient};

use crate::models::{PaymentError, PaymentRecord, PaymentStatus, SettleOutcome, TransactionCallback};

const TABLE: &str = "payments";

/// Payment rows, one per paid session. Every transition is a PATCH filtered
/// on the statuses it may start from.
pub struct PaymentLedger {
    supabase: Arc<SupabaseClient>,
}

impl PaymentLedger {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Merchant reference sent to Paymob for a session.
    pub fn merchant_order_id(session_id: Uuid) -> String {
        format!("session_{}", session_id)
    }

    pub async fn create_pending(
        &self,
        session_id: Uuid,
        patient_id: &str,
        amount_cents: i64,
    ) -> Result<PaymentRecord, PaymentError> {
        let body = json!({
            "id": Uuid::new_v4(),
            "session_id": session_id,
            "patient_id": patient_id,
            "amount_cents": amount_cents,
            "currency": CURRENCY,
            "status": PaymentStatus::Pending,
            "merchant_order_id": Self::merchant_order_id(session_id),
        });

        let mut rows: Vec<PaymentRecord> = self.supabase
            .insert(TABLE, body)
            .await
            .map_err(|e| db_error("create payment record", e))?;

        let record = rows.pop()
            .ok_or_else(|| PaymentError::DatabaseError("Insert returned no row".to_string()))?;

        debug!("Pending payment {} recorded for session {}", record.id, session_id);
        Ok(record)
    }

    pub async fn attach_provider_order(
        &self,
        payment_id: Uuid,
        provider_order_id: i64,
    ) -> Result<PaymentRecord, PaymentError> {
        let query = format!("id={}", eq(payment_id));
        let body = json!({
            "provider_order_id": provider_order_id,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let mut rows: Vec<PaymentRecord> = self.supabase
            .update(TABLE, &query, body)
            .await
            .map_err(|e| db_error("attach provider order", e))?;

        rows.pop()
            .ok_or_else(|| PaymentError::DatabaseError(format!("Payment {} not found", payment_id)))
    }

    /// Moves a still-pending record to `failed`. A record that already left
    /// `pending` is left alone.
    pub async fn mark_failed(&self, payment_id: Uuid) -> Result<(), PaymentError> {
        let query = format!("id={}&status=eq.pending", eq(payment_id));
        let body = json!({
            "status": PaymentStatus::Failed,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let rows: Vec<PaymentRecord> = self.supabase
            .update(TABLE, &query, body)
            .await
            .map_err(|e| db_error("mark payment failed", e))?;

        if rows.is_empty() {
            warn!("Payment {} was no longer pending when marked failed", payment_id);
        }
        Ok(())
    }

    pub async fn find_by_order(&self, provider_order_id: i64) -> Result<Option<PaymentRecord>, PaymentError> {
        let query = format!("provider_order_id={}", eq(provider_order_id));
        self.supabase
            .select_one(TABLE, &query)
            .await
            .map_err(|e| db_error("find payment by order", e))
    }

    pub async fn find_by_session(&self, session_id: Uuid) -> Result<Option<PaymentRecord>, PaymentError> {
        let query = format!("session_id={}&order=created_at.desc", eq(session_id));
        self.supabase
            .select_one(TABLE, &query)
            .await
            .map_err(|e| db_error("find payment by session", e))
    }

    /// Applies a verified callback. A record transitions only from the
    /// statuses its target allows; replays and late callbacks come back as
    /// `AlreadySettled`.
    pub async fn settle(&self, callback: &TransactionCallback) -> Result<SettleOutcome, PaymentError> {
        let Some(existing) = self.find_by_order(callback.order_id).await? else {
            warn!("Callback for unknown Paymob order {}", callback.order_id);
            return Ok(SettleOutcome::UnknownOrder);
        };

        let Some(target) = callback.target_status() else {
            debug!("Transaction {} still pending", callback.transaction_id);
            return Ok(SettleOutcome::AlreadySettled(existing));
        };

        let sources = target.settles_from();
        if !sources.contains(&existing.status) {
            return Ok(SettleOutcome::AlreadySettled(existing));
        }

        // Paid but for a different amount: left pending for manual review.
        if target == PaymentStatus::Completed && callback.amount_cents != existing.amount_cents {
            warn!(
                "Callback amount {} differs from recorded {} for payment {}",
                callback.amount_cents, existing.amount_cents, existing.id
            );
            return Ok(SettleOutcome::AmountMismatch(existing));
        }

        let query = format!("id={}&status={}", eq(existing.id), status_in(sources));
        let body = json!({
            "status": target,
            "provider_charge_id": callback.transaction_id.to_string(),
            "updated_at": Utc::now().to_rfc3339(),
        });

        let mut rows: Vec<PaymentRecord> = self.supabase
            .update(TABLE, &query, body)
            .await
            .map_err(|e| db_error("settle payment", e))?;

        match rows.pop() {
            Some(record) => {
                info!("Payment {} moved from {} to {}", record.id, existing.status, record.status);
                Ok(SettleOutcome::Settled(record))
            }
            None => Ok(SettleOutcome::AlreadySettled(existing)),
        }
    }
}

fn status_in(statuses: &[PaymentStatus]) -> String {
    let list: Vec<String> = statuses.iter().map(ToString::to_string).collect();
    format!("in.({})", list.join(","))
}

fn db_error(action: &str, e: anyhow::Error) -> PaymentError {
    error!("Failed to {}: {}", action, e);
    PaymentError::DatabaseError(format!("Failed to {}", action))
}
