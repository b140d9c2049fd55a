use crate::config::GatewayConfig;
use crate::domain::money::Amount;
use crate::domain::ports::{CaptureMode, PaymentGateway, RemoteCapture, RemoteOrder};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use zeroize::Zeroizing;

/// Client for the hosted-checkout gateway.
///
/// The gateway opens its own checkout widget keyed by the remote order id and
/// delivers `{order_id, payment_id, signature}` back through the client; the
/// signature is verified by the settlement engine, so this adapter only
/// implements order creation.
pub struct HostedCheckoutGateway {
    http: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: Zeroizing<String>,
    currency: String,
}

#[derive(Serialize)]
struct CreateOrderBody<'a> {
    /// Minor units, per the gateway's convention.
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

#[derive(Deserialize)]
struct CreateOrderResponse {
    id: String,
}

impl HostedCheckoutGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let base_url = config.require_remote()?.trim_end_matches('/').to_string();
        Ok(Self {
            http: super::http_client()?,
            base_url,
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
            currency: config.currency.clone(),
        })
    }
}

#[async_trait]
impl PaymentGateway for HostedCheckoutGateway {
    fn name(&self) -> &'static str {
        "hosted-checkout"
    }

    fn capture_mode(&self) -> CaptureMode {
        CaptureMode::SignedCallback
    }

    async fn create_remote_order(&self, amount: Amount, user_id: &str) -> Result<RemoteOrder> {
        // Reconciliation reference only; the remote order id is the
        // idempotence key.
        let receipt = format!("receipt_user_{}_{}", user_id, epoch_millis());
        let body = CreateOrderBody {
            amount: amount.minor_units(),
            currency: &self.currency,
            receipt: &receipt,
        };

        let response = self
            .http
            .post(format!("{}/v1/orders", self.base_url))
            .basic_auth(&self.key_id, Some(self.key_secret.as_str()))
            .json(&body)
            .send()
            .await
            .map_err(|e| PaymentError::GatewayUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PaymentError::GatewayUnavailable(format!(
                "order creation returned {}",
                response.status()
            )));
        }

        let created: CreateOrderResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::GatewayUnavailable(e.to_string()))?;
        Ok(RemoteOrder {
            order_id: created.id,
            receipt: Some(receipt),
        })
    }

    async fn capture_remote_order(&self, _order_id: &str) -> Result<RemoteCapture> {
        Err(PaymentError::InternalError(Box::new(std::io::Error::other(
            "the hosted-checkout gateway settles via signed callbacks",
        ))))
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
