use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use payment_cell::models::{CustomerInfo, PaymentError};
use payment_cell::{PaymentLedger, PaymobClient};
use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{BookingError, CheckoutResult, CreatePaymentSessionRequest, SessionType};
use crate::services::lifecycle::SessionLifecycleService;
use crate::services::writer::BookingWriter;

/// Paid booking flow. The session and a pending payment are stored before
/// Paymob is contacted; a provider failure cancels both, and the webhook
/// settles the rest.
pub struct CheckoutService {
    writer: BookingWriter,
    ledger: PaymentLedger,
    lifecycle: SessionLifecycleService,
    paymob: Arc<PaymobClient>,
    amount_cents: i64,
}

impl CheckoutService {
    pub fn new(
        config: &AppConfig,
        supabase: Arc<SupabaseClient>,
        writer: BookingWriter,
        paymob: Arc<PaymobClient>,
    ) -> Self {
        Self {
            writer,
            ledger: PaymentLedger::new(supabase.clone()),
            lifecycle: SessionLifecycleService::new(supabase),
            paymob,
            amount_cents: config.session_amount_cents(),
        }
    }

    pub async fn create_payment_session(
        &self,
        request: CreatePaymentSessionRequest,
    ) -> Result<CheckoutResult, BookingError> {
        if request.session_type == SessionType::Free {
            // Free sessions never carry a payment record.
            return if self.writer.gate().check(&request.patient_id).await? {
                Err(BookingError::FreeSessionAlreadyUsed)
            } else {
                Err(BookingError::InvalidSessionType(
                    "free sessions are booked without payment".to_string(),
                ))
            };
        }

        let session = self.writer.book_paid(request.booking()).await?;

        let payment = match self
            .ledger
            .create_pending(session.id, &session.patient_id, self.amount_cents)
            .await
        {
            Ok(payment) => payment,
            Err(e) => {
                self.cancel_session(session.id).await;
                return Err(payment_error(e));
            }
        };

        let customer = CustomerInfo::anonymous();
        let checkout = match self
            .paymob
            .create_payment_session(self.amount_cents, &customer, Some(&payment.merchant_order_id))
            .await
        {
            Ok(checkout) => checkout,
            Err(e) => {
                warn!("Checkout for session {} failed at the provider", session.id);
                self.compensate(payment.id, session.id).await;
                return Err(payment_error(e));
            }
        };

        if let Err(e) = self.ledger.attach_provider_order(payment.id, checkout.order_id).await {
            // Without the order id the webhook cannot find this payment.
            self.compensate(payment.id, session.id).await;
            return Err(payment_error(e));
        }

        info!(
            "Payment session ready for session {} (order {})",
            session.id, checkout.order_id
        );

        Ok(CheckoutResult {
            session,
            checkout_url: checkout.checkout_url,
            order_id: checkout.order_id,
        })
    }

    async fn compensate(&self, payment_id: Uuid, session_id: Uuid) {
        if let Err(e) = self.ledger.mark_failed(payment_id).await {
            error!("Payment {} left pending after checkout failure: {}", payment_id, e);
        }
        self.cancel_session(session_id).await;
    }

    async fn cancel_session(&self, session_id: Uuid) {
        if let Err(e) = self.lifecycle.cancel_unpaid(session_id).await {
            error!("Session {} left scheduled after checkout failure: {}", session_id, e);
        }
    }
}

fn payment_error(e: PaymentError) -> BookingError {
    BookingError::Payment(e.to_string())
}
