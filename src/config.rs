use crate::error::{PaymentError, Result};
use zeroize::Zeroizing;

/// Environment variable names the credentials are read from. The secret is
/// only ever consumed server-side and is wiped from memory on drop.
pub const KEY_ID_VAR: &str = "PAYLEDGER_KEY_ID";
pub const KEY_SECRET_VAR: &str = "PAYLEDGER_KEY_SECRET";
pub const GATEWAY_URL_VAR: &str = "PAYLEDGER_GATEWAY_URL";
pub const CURRENCY_VAR: &str = "PAYLEDGER_CURRENCY";

/// Credentials and endpoint for one payment gateway.
#[derive(Clone)]
pub struct GatewayConfig {
    pub key_id: String,
    pub key_secret: Zeroizing<String>,
    pub base_url: Option<String>,
    pub currency: String,
}

impl GatewayConfig {
    pub fn new(
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        base_url: Option<String>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            key_id: key_id.into(),
            key_secret: Zeroizing::new(key_secret.into()),
            base_url,
            currency: currency.into(),
        }
    }

    /// Checks that everything a remote gateway client needs is present,
    /// naming each missing piece.
    pub fn require_remote(&self) -> Result<&str> {
        let mut missing = Vec::new();
        if self.key_id.is_empty() {
            missing.push(KEY_ID_VAR);
        }
        if self.key_secret.is_empty() {
            missing.push(KEY_SECRET_VAR);
        }
        if self.base_url.as_deref().unwrap_or("").is_empty() {
            missing.push(GATEWAY_URL_VAR);
        }
        if !missing.is_empty() {
            return Err(PaymentError::MisconfiguredCredentials(format!(
                "missing {}",
                missing.join(", ")
            )));
        }
        Ok(self.base_url.as_deref().unwrap_or_default())
    }
}
