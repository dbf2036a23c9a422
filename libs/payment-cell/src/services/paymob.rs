use std::time::Duration;

use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, info};

use shared_config::{AppConfig, CURRENCY};

use crate::models::{
    CustomerInfo, HandshakeStep, PaymentError, PaymentSession, PaymobAuthRequest,
    PaymobAuthResponse, PaymobOrderRequest, PaymobOrderResponse, PaymobPaymentKeyRequest,
    PaymobPaymentKeyResponse, PaymobTransactionResponse,
};

/// Payment keys expire after one hour.
const PAYMENT_KEY_EXPIRATION_SECS: u32 = 3600;

/// Paymob Accept API client.
/// Based on: https://developers.paymob.com/egypt/api-reference-guide
pub struct PaymobClient {
    client: Client,
    api_url: String,
    api_key: String,
    integration_id: String,
    checkout_base_url: String,
}

impl PaymobClient {
    pub fn new(config: &AppConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.paymob_timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                error!("Failed to build Paymob HTTP client, falling back to defaults: {}", e);
                Client::new()
            });

        Self {
            client,
            api_url: config.paymob_api_url.trim_end_matches('/').to_string(),
            api_key: config.paymob_api_key.clone(),
            integration_id: config.paymob_integration_id.clone(),
            checkout_base_url: config.paymob_checkout_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn integration_id(&self) -> Result<i64, PaymentError> {
        self.integration_id.parse().map_err(|_| PaymentError::NotConfigured)
    }

    async fn post_json<B, R>(&self, path: &str, body: &B, step: HandshakeStep) -> Result<R, PaymentError>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.api_url, path);
        debug!("Paymob {} request to {}", step, url);

        let response = self.client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| provider_error(step, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            debug!("Paymob {} response body: {}", step, text);
            return Err(provider_error(step, format!("HTTP {}", status)));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| provider_error(step, format!("unreadable response: {}", e)))
    }

    /// POST auth/tokens
    pub async fn auth_token(&self) -> Result<String, PaymentError> {
        if self.api_key.is_empty() {
            return Err(PaymentError::NotConfigured);
        }

        let response: PaymobAuthResponse = self
            .post_json("auth/tokens", &PaymobAuthRequest { api_key: &self.api_key }, HandshakeStep::Auth)
            .await?;
        Ok(response.token)
    }

    /// POST ecommerce/orders
    pub async fn create_order(
        &self,
        auth_token: &str,
        amount_cents: i64,
        currency: &str,
        merchant_order_id: Option<&str>,
    ) -> Result<PaymobOrderResponse, PaymentError> {
        let request = PaymobOrderRequest {
            auth_token,
            delivery_needed: false,
            amount_cents,
            currency,
            merchant_order_id,
        };

        self.post_json("ecommerce/orders", &request, HandshakeStep::Order).await
    }

    /// POST acceptance/payment_keys
    pub async fn payment_key(
        &self,
        auth_token: &str,
        order_id: i64,
        amount_cents: i64,
        currency: &str,
        customer: &CustomerInfo,
    ) -> Result<String, PaymentError> {
        let request = PaymobPaymentKeyRequest {
            auth_token,
            amount_cents,
            expiration: PAYMENT_KEY_EXPIRATION_SECS,
            order_id,
            billing_data: customer.billing_data(),
            currency,
            integration_id: self.integration_id()?,
            lock_order_when_paid: true,
        };

        let response: PaymobPaymentKeyResponse = self
            .post_json("acceptance/payment_keys", &request, HandshakeStep::PaymentKey)
            .await?;
        Ok(response.token)
    }

    /// Hosted payment page for a payment key.
    pub fn checkout_url(&self, payment_key: &str) -> String {
        format!(
            "{}/{}?payment_token={}",
            self.checkout_base_url, self.integration_id, payment_key
        )
    }

    /// Full handshake: auth token, order, payment key, checkout URL. Any step
    /// failing aborts the whole session; nothing is undone at the provider.
    pub async fn create_payment_session(
        &self,
        amount_cents: i64,
        customer: &CustomerInfo,
        merchant_order_id: Option<&str>,
    ) -> Result<PaymentSession, PaymentError> {
        self.integration_id()?;

        let auth_token = self.auth_token().await?;
        let order = self
            .create_order(&auth_token, amount_cents, CURRENCY, merchant_order_id)
            .await?;
        let payment_key = self
            .payment_key(&auth_token, order.id, amount_cents, CURRENCY, customer)
            .await?;

        info!("Created Paymob order {} for {} minor units", order.id, amount_cents);

        Ok(PaymentSession {
            checkout_url: self.checkout_url(&payment_key),
            order_id: order.id,
            payment_key,
        })
    }

    /// GET acceptance/transactions/{id}; `true` only for a settled success.
    pub async fn verify_transaction(&self, transaction_id: i64) -> Result<bool, PaymentError> {
        let auth_token = self.auth_token().await?;
        let url = format!("{}/acceptance/transactions/{}", self.api_url, transaction_id);
        let step = HandshakeStep::Verification;

        let response = self.client
            .get(&url)
            .bearer_auth(&auth_token)
            .query(&[("auth_token", auth_token.as_str())])
            .send()
            .await
            .map_err(|e| provider_error(step, e.to_string()))?;

        if !response.status().is_success() {
            return Err(provider_error(step, format!("HTTP {}", response.status())));
        }

        let transaction: PaymobTransactionResponse = response
            .json()
            .await
            .map_err(|e| provider_error(step, format!("unreadable response: {}", e)))?;

        debug!("Transaction {} success={} pending={}", transaction.id, transaction.success, transaction.pending);
        Ok(transaction.success && !transaction.pending)
    }
}

fn provider_error(step: HandshakeStep, message: String) -> PaymentError {
    error!("Paymob {} failed: {}", step, message);
    PaymentError::Provider { step, message }
}
