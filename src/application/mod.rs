//! Application layer containing the settlement state machine.
//!
//! This module defines the `SettlementEngine`, the primary entry point for
//! creating payment orders and capturing their checkout callbacks. It owns
//! the gateway client and the storage ports and guarantees at-most-once
//! crediting per order.

pub mod settlement;
