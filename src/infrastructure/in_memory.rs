use crate::domain::ledger::LedgerAccount;
use crate::domain::money::{Amount, Balance};
use crate::domain::order::{CaptureGate, CaptureOutcome, CaptureToken, PaymentOrder};
use crate::domain::ports::{LedgerStore, OrderRegistry};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory ledger.
///
/// Uses `Arc<RwLock<HashMap<String, Balance>>>` for shared concurrent access.
/// The credit is performed under a single write guard, which makes it the
/// atomic increment the port demands.
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    balances: Arc<RwLock<HashMap<String, Balance>>>,
}

impl InMemoryLedgerStore {
    /// Creates a new, empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn credit(&self, user_id: &str, amount: Amount) -> Result<Balance> {
        let mut balances = self.balances.write().await;
        let balance = balances.entry(user_id.to_string()).or_insert(Balance::ZERO);
        *balance += amount.into();
        Ok(*balance)
    }

    async fn balance(&self, user_id: &str) -> Result<Balance> {
        let balances = self.balances.read().await;
        Ok(balances.get(user_id).copied().unwrap_or(Balance::ZERO))
    }

    async fn all_accounts(&self) -> Result<Vec<LedgerAccount>> {
        let balances = self.balances.read().await;
        let mut accounts: Vec<LedgerAccount> = balances
            .iter()
            .map(|(user_id, balance)| LedgerAccount {
                user_id: user_id.clone(),
                balance: *balance,
            })
            .collect();
        accounts.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(accounts)
    }
}

#[derive(Default)]
struct RegistryInner {
    orders: HashMap<String, PaymentOrder>,
    in_flight: HashSet<String>,
}

/// A thread-safe in-memory order registry.
///
/// The capture gate's test-and-set runs under one write guard, so exactly one
/// concurrent caller per order obtains the token.
#[derive(Default, Clone)]
pub struct InMemoryOrderRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl InMemoryOrderRegistry {
    /// Creates a new, empty in-memory registry.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderRegistry for InMemoryOrderRegistry {
    async fn record_created(&self, order: PaymentOrder) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.orders.contains_key(&order.order_id) {
            return Err(PaymentError::DuplicateOrder(order.order_id));
        }
        inner.orders.insert(order.order_id.clone(), order);
        Ok(())
    }

    async fn try_begin_capture(&self, order_id: &str) -> Result<CaptureGate> {
        let mut inner = self.inner.write().await;
        let Some(order) = inner.orders.get(order_id) else {
            return Err(PaymentError::UnknownOrder(order_id.to_string()));
        };
        if order.status.is_terminal() {
            return Ok(CaptureGate::Finalized(order.status));
        }
        let token = CaptureToken {
            order_id: order.order_id.clone(),
            user_id: order.user_id.clone(),
            amount: order.amount,
        };
        if !inner.in_flight.insert(order_id.to_string()) {
            return Ok(CaptureGate::InFlight);
        }
        Ok(CaptureGate::Begun(token))
    }

    async fn finalize_capture(&self, token: CaptureToken, outcome: CaptureOutcome) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.in_flight.remove(&token.order_id);
        let Some(order) = inner.orders.get_mut(&token.order_id) else {
            return Err(PaymentError::UnknownOrder(token.order_id));
        };
        order.status = outcome.into();
        Ok(())
    }

    async fn release_capture(&self, token: CaptureToken) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.in_flight.remove(&token.order_id);
        Ok(())
    }

    async fn get(&self, order_id: &str) -> Result<Option<PaymentOrder>> {
        let inner = self.inner.read().await;
        Ok(inner.orders.get(order_id).cloned())
    }

    async fn all_orders(&self) -> Result<Vec<PaymentOrder>> {
        let inner = self.inner.read().await;
        let mut orders: Vec<PaymentOrder> = inner.orders.values().cloned().collect();
        orders.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.order_id.cmp(&b.order_id))
        });
        Ok(orders)
    }
}
