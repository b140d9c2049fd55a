use crate::domain::money::Amount;
use crate::error::PaymentError;
use serde::{Deserialize, Serialize};

/// Lifecycle of a payment order. Transitions are forward-only: an order
/// leaves `Created` at most once and every other state is terminal.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    Captured,
    VerificationFailed,
    CreditFailed,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        *self != OrderStatus::Created
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::Captured => "captured",
            OrderStatus::VerificationFailed => "verification_failed",
            OrderStatus::CreditFailed => "credit_failed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome of a capture attempt, applied via
/// `OrderRegistry::finalize_capture`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CaptureOutcome {
    Captured,
    VerificationFailed,
    CreditFailed,
}

impl From<CaptureOutcome> for OrderStatus {
    fn from(outcome: CaptureOutcome) -> Self {
        match outcome {
            CaptureOutcome::Captured => OrderStatus::Captured,
            CaptureOutcome::VerificationFailed => OrderStatus::VerificationFailed,
            CaptureOutcome::CreditFailed => OrderStatus::CreditFailed,
        }
    }
}

/// A server-side record of an intended payment, created before the user is
/// handed to the external checkout. Retained indefinitely for audit and
/// replay protection; never deleted by this core.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentOrder {
    /// Opaque identifier assigned by the external gateway.
    pub order_id: String,
    /// Owning user; immutable once set.
    pub user_id: String,
    /// The amount recorded at creation time. Credits always use this value,
    /// never anything supplied with the capture callback.
    pub amount: Amount,
    pub status: OrderStatus,
    /// Creation time in epoch milliseconds, used for receipt derivation and
    /// auditing.
    pub created_at: u64,
}

impl PaymentOrder {
    pub fn new(order_id: String, user_id: String, amount: Amount, created_at: u64) -> Self {
        Self {
            order_id,
            user_id,
            amount,
            status: OrderStatus::Created,
            created_at,
        }
    }
}

/// Exclusive permission to settle one order, handed out by
/// `OrderRegistry::try_begin_capture` to exactly one caller per order.
///
/// Carries the server-recorded user and amount so the orchestrator cannot
/// accidentally credit from callback data.
#[derive(Debug)]
pub struct CaptureToken {
    pub order_id: String,
    pub user_id: String,
    pub amount: Amount,
}

/// Result of asking the registry to begin a capture.
#[derive(Debug)]
pub enum CaptureGate {
    /// This caller won the race and must finalize or release the token.
    Begun(CaptureToken),
    /// The order already reached a terminal state; the original outcome is
    /// reported instead of settling again.
    Finalized(OrderStatus),
    /// Another capture holds the token right now.
    InFlight,
}

/// The capture callback as delivered by the browser-facing surface.
///
/// The hosted-checkout variant supplies `payment_id` and `signature`; the
/// trusted-capture variant supplies the order id alone (a `user_id` echoed by
/// the client is accepted but never trusted).
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CaptureRequest {
    pub order_id: String,
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl CaptureRequest {
    /// Structural validation common to both gateway variants. Runs before any
    /// state change.
    pub fn validate(&self) -> Result<(), PaymentError> {
        if self.order_id.trim().is_empty() {
            return Err(PaymentError::InvalidCallback(
                "missing order_id".to_string(),
            ));
        }
        Ok(())
    }

    /// The fields the signature-verification variant requires.
    pub fn signed_fields(&self) -> Result<(&str, &str), PaymentError> {
        let payment_id = self
            .payment_id
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| PaymentError::InvalidCallback("missing payment_id".to_string()))?;
        let signature = self
            .signature
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| PaymentError::InvalidCallback("missing signature".to_string()))?;
        Ok((payment_id, signature))
    }
}

/// Outcome of a successful (or idempotently replayed) settlement.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct Settlement {
    pub order_id: String,
    pub user_id: String,
    pub amount: Amount,
    /// True when this call observed a previously completed capture instead of
    /// performing the credit itself.
    pub replayed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminality() {
        assert!(!OrderStatus::Created.is_terminal());
        assert!(OrderStatus::Captured.is_terminal());
        assert!(OrderStatus::VerificationFailed.is_terminal());
        assert!(OrderStatus::CreditFailed.is_terminal());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::VerificationFailed).unwrap(),
            "\"verification_failed\""
        );
    }

    #[test]
    fn test_capture_request_validation() {
        let request = CaptureRequest {
            order_id: "  ".to_string(),
            payment_id: None,
            signature: None,
            user_id: None,
        };
        assert!(matches!(
            request.validate(),
            Err(PaymentError::InvalidCallback(_))
        ));
    }

    #[test]
    fn test_signed_fields_required() {
        let request = CaptureRequest {
            order_id: "order_abc".to_string(),
            payment_id: Some("pay_xyz".to_string()),
            signature: None,
            user_id: None,
        };
        assert!(request.validate().is_ok());
        assert!(matches!(
            request.signed_fields(),
            Err(PaymentError::InvalidCallback(_))
        ));

        let request = CaptureRequest {
            signature: Some("aa".repeat(32)),
            ..request
        };
        let (payment_id, signature) = request.signed_fields().unwrap();
        assert_eq!(payment_id, "pay_xyz");
        assert_eq!(signature.len(), 64);
    }
}
