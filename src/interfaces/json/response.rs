use crate::domain::money::Balance;
use crate::domain::order::{PaymentOrder, Settlement};
use crate::error::PaymentError;
use rust_decimal::Decimal;
use serde::Serialize;

/// One JSON-line response to an action request.
///
/// The shapes mirror what the browser-facing surface expects: order creation
/// returns the handle for driving the checkout widget, capture returns a
/// success flag, and every error carries a human-readable message. A response
/// never claims success unless the settlement actually happened.
#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ActionResponse {
    Order {
        order_id: String,
        amount: Decimal,
    },
    Capture {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Balance {
        user_id: String,
        balance: Decimal,
    },
    Error {
        error: String,
    },
}

impl ActionResponse {
    pub fn order_created(order: &PaymentOrder) -> Self {
        ActionResponse::Order {
            order_id: order.order_id.clone(),
            amount: order.amount.to_decimal(),
        }
    }

    pub fn captured(_settlement: &Settlement) -> Self {
        ActionResponse::Capture {
            success: true,
            error: None,
        }
    }

    pub fn capture_failed(error: &PaymentError) -> Self {
        ActionResponse::Capture {
            success: false,
            error: Some(error.to_string()),
        }
    }

    pub fn balance(user_id: &str, balance: Balance) -> Self {
        ActionResponse::Balance {
            user_id: user_id.to_string(),
            balance: balance.to_decimal(),
        }
    }

    pub fn error(error: &PaymentError) -> Self {
        ActionResponse::Error {
            error: error.to_string(),
        }
    }
}
