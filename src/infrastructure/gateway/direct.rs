use crate::config::GatewayConfig;
use crate::domain::money::Amount;
use crate::domain::ports::{
    CaptureMode, PaymentGateway, RemoteCapture, RemoteCaptureStatus, RemoteOrder,
};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;
use zeroize::Zeroizing;

/// Client for the direct-capture gateway.
///
/// The checkout widget settles against the gateway's own order id; afterwards
/// this adapter performs a server-to-server capture call whose response is
/// trusted (there is no callback signature in this variant).
pub struct DirectCaptureGateway {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: Zeroizing<String>,
    currency: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct CreateOrderResponse {
    id: String,
}

impl DirectCaptureGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let base_url = config.require_remote()?.trim_end_matches('/').to_string();
        Ok(Self {
            http: super::http_client()?,
            base_url,
            client_id: config.key_id.clone(),
            client_secret: config.key_secret.clone(),
            currency: config.currency.clone(),
        })
    }

    async fn access_token(&self) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/v1/oauth2/token", self.base_url))
            .basic_auth(&self.client_id, Some(self.client_secret.as_str()))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| PaymentError::GatewayUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PaymentError::GatewayUnavailable(format!(
                "token request returned {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::GatewayUnavailable(e.to_string()))?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl PaymentGateway for DirectCaptureGateway {
    fn name(&self) -> &'static str {
        "direct-capture"
    }

    fn capture_mode(&self) -> CaptureMode {
        CaptureMode::ServerCapture
    }

    async fn create_remote_order(&self, amount: Amount, _user_id: &str) -> Result<RemoteOrder> {
        let token = self.access_token().await?;
        let body = json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "amount": {
                    "currency_code": self.currency,
                    "value": amount.to_decimal().to_string(),
                },
            }],
        });

        let response = self
            .http
            .post(format!("{}/v2/checkout/orders", self.base_url))
            .bearer_auth(&token)
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
            receipt: None,
        })
    }

    async fn capture_remote_order(&self, order_id: &str) -> Result<RemoteCapture> {
        let token = self.access_token().await?;
        let response = self
            .http
            .post(format!(
                "{}/v2/checkout/orders/{}/capture",
                self.base_url, order_id
            ))
            .bearer_auth(&token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| PaymentError::GatewayUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PaymentError::GatewayUnavailable(format!(
                "capture returned {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PaymentError::GatewayUnavailable(e.to_string()))?;

        let status = match body.get("status").and_then(|v| v.as_str()) {
            Some("COMPLETED") => RemoteCaptureStatus::Completed,
            Some(other) => RemoteCaptureStatus::Other(other.to_string()),
            None => RemoteCaptureStatus::Other("UNKNOWN".to_string()),
        };
        Ok(RemoteCapture {
            status,
            amount: captured_amount(&body),
        })
    }
}

/// Pulls the captured amount out of the gateway's nested response, if
/// present. Reported for auditing only; never credited.
fn captured_amount(body: &serde_json::Value) -> Option<Amount> {
    let value = body
        .pointer("/purchase_units/0/payments/captures/0/amount/value")?
        .as_str()?;
    let decimal = Decimal::from_str(value).ok()?;
    Amount::from_decimal(decimal).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_credentials() {
        let config = GatewayConfig::new("client", "", None, "USD");
        assert!(matches!(
            DirectCaptureGateway::new(&config),
            Err(PaymentError::MisconfiguredCredentials(_))
        ));
    }

    #[test]
    fn test_captured_amount_extraction() {
        let body = json!({
            "status": "COMPLETED",
            "purchase_units": [{
                "payments": { "captures": [{ "amount": { "value": "10.50", "currency_code": "USD" } }] },
            }],
        });
        assert_eq!(
            captured_amount(&body),
            Some(Amount::from_minor_units(1050).unwrap())
        );
        assert_eq!(captured_amount(&json!({ "status": "COMPLETED" })), None);
        // Malformed amounts are dropped, not propagated.
        let malformed = json!({
            "purchase_units": [{
                "payments": { "captures": [{ "amount": { "value": "ten" } }] },
            }],
        });
        assert_eq!(captured_amount(&malformed), None);
    }
}
