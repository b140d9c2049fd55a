//! Payment-gateway clients.
//!
//! Two remote variants are supported: the hosted-checkout gateway whose
//! callbacks carry an HMAC signature, and the direct-capture gateway whose
//! server-to-server capture response is trusted. The mock gateway stands in
//! for either in tests and offline runs.

pub mod direct;
pub mod hosted;
pub mod mock;

use std::time::Duration;

/// Upper bound for any single gateway HTTP call. Failures surface as
/// `GatewayUnavailable` rather than hanging a settlement.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn http_client() -> crate::error::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| crate::error::PaymentError::InternalError(Box::new(e)))
}
