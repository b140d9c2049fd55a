use crate::domain::ledger::LedgerAccount;
use crate::domain::money::{Amount, Balance};
use crate::domain::order::{CaptureGate, CaptureOutcome, CaptureToken, PaymentOrder};
use crate::domain::ports::{LedgerStore, OrderRegistry};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, MergeOperands, Options};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Column Family for payment orders.
pub const CF_ORDERS: &str = "orders";
/// Column Family for per-user ledger balances.
pub const CF_LEDGER: &str = "ledger";

/// A persistent store implementation using RocksDB.
///
/// Serves both ports from one database: orders as JSON values keyed by order
/// id, balances as big-endian `i64` minor units keyed by user id. Ledger
/// credits go through an associative merge operator, so the increment is a
/// single atomic store operation rather than a read-then-write.
///
/// Capture attempts in flight are tracked in process and cleared on restart,
/// so a crash mid-capture leaves the order capturable again.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

fn ledger_merge(_key: &[u8], existing: Option<&[u8]>, operands: &MergeOperands) -> Option<Vec<u8>> {
    let mut total = existing.map(decode_balance).unwrap_or(0);
    for operand in operands.iter() {
        total += decode_balance(operand);
    }
    Some(total.to_be_bytes().to_vec())
}

fn decode_balance(bytes: &[u8]) -> i64 {
    bytes.try_into().map(i64::from_be_bytes).unwrap_or(0)
}

impl RocksDbStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families ("orders" and "ledger")
    /// exist and installs the ledger merge operator.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_orders = ColumnFamilyDescriptor::new(CF_ORDERS, Options::default());
        let mut ledger_opts = Options::default();
        ledger_opts.set_merge_operator_associative("ledger_add", ledger_merge);
        let cf_ledger = ColumnFamilyDescriptor::new(CF_LEDGER, ledger_opts);

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_orders, cf_ledger])?;

        Ok(Self {
            db: Arc::new(db),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            PaymentError::InternalError(Box::new(std::io::Error::other(format!(
                "{name} column family not found"
            ))))
        })
    }

    fn read_order(&self, order_id: &str) -> Result<Option<PaymentOrder>> {
        let cf = self.cf(CF_ORDERS)?;
        let Some(bytes) = self.db.get_cf(cf, order_id.as_bytes())? else {
            return Ok(None);
        };
        let order = serde_json::from_slice(&bytes)?;
        Ok(Some(order))
    }

    fn write_order(&self, order: &PaymentOrder) -> Result<()> {
        let cf = self.cf(CF_ORDERS)?;
        let value = serde_json::to_vec(order)?;
        self.db.put_cf(cf, order.order_id.as_bytes(), value)?;
        Ok(())
    }
}

#[async_trait]
impl OrderRegistry for RocksDbStore {
    async fn record_created(&self, order: PaymentOrder) -> Result<()> {
        let _guard = self.in_flight.lock().unwrap();
        if self.read_order(&order.order_id)?.is_some() {
            return Err(PaymentError::DuplicateOrder(order.order_id));
        }
        self.write_order(&order)
    }

    async fn try_begin_capture(&self, order_id: &str) -> Result<CaptureGate> {
        let mut in_flight = self.in_flight.lock().unwrap();
        let Some(order) = self.read_order(order_id)? else {
            return Err(PaymentError::UnknownOrder(order_id.to_string()));
        };
        if order.status.is_terminal() {
            return Ok(CaptureGate::Finalized(order.status));
        }
        if !in_flight.insert(order_id.to_string()) {
            return Ok(CaptureGate::InFlight);
        }
        Ok(CaptureGate::Begun(CaptureToken {
            order_id: order.order_id,
            user_id: order.user_id,
            amount: order.amount,
        }))
    }

    async fn finalize_capture(&self, token: CaptureToken, outcome: CaptureOutcome) -> Result<()> {
        let mut in_flight = self.in_flight.lock().unwrap();
        in_flight.remove(&token.order_id);
        let Some(mut order) = self.read_order(&token.order_id)? else {
            return Err(PaymentError::UnknownOrder(token.order_id));
        };
        order.status = outcome.into();
        self.write_order(&order)
    }

    async fn release_capture(&self, token: CaptureToken) -> Result<()> {
        let mut in_flight = self.in_flight.lock().unwrap();
        in_flight.remove(&token.order_id);
        Ok(())
    }

    async fn get(&self, order_id: &str) -> Result<Option<PaymentOrder>> {
        self.read_order(order_id)
    }

    async fn all_orders(&self) -> Result<Vec<PaymentOrder>> {
        let cf = self.cf(CF_ORDERS)?;
        let mut orders = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            let order: PaymentOrder = serde_json::from_slice(&value)?;
            orders.push(order);
        }
        orders.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.order_id.cmp(&b.order_id))
        });
        Ok(orders)
    }
}

#[async_trait]
impl LedgerStore for RocksDbStore {
    async fn credit(&self, user_id: &str, amount: Amount) -> Result<Balance> {
        let cf = self.cf(CF_LEDGER)?;
        self.db
            .merge_cf(cf, user_id.as_bytes(), amount.minor_units().to_be_bytes())?;
        // The merge above is the atomic increment; this read only serves the
        // returned value.
        let bytes = self.db.get_cf(cf, user_id.as_bytes())?;
        Ok(Balance::new(
            bytes.as_deref().map(decode_balance).unwrap_or(0),
        ))
    }

    async fn balance(&self, user_id: &str) -> Result<Balance> {
        let cf = self.cf(CF_LEDGER)?;
        let bytes = self.db.get_cf(cf, user_id.as_bytes())?;
        Ok(Balance::new(
            bytes.as_deref().map(decode_balance).unwrap_or(0),
        ))
    }

    async fn all_accounts(&self) -> Result<Vec<LedgerAccount>> {
        let cf = self.cf(CF_LEDGER)?;
        let mut accounts = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (key, value) = item?;
            let user_id = String::from_utf8_lossy(&key).into_owned();
            accounts.push(LedgerAccount {
                user_id,
                balance: Balance::new(decode_balance(&value)),
            });
        }
        accounts.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(accounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderStatus;
    use tempfile::tempdir;

    fn order(order_id: &str, user_id: &str, minor_units: i64) -> PaymentOrder {
        PaymentOrder::new(
            order_id.to_string(),
            user_id.to_string(),
            Amount::from_minor_units(minor_units).unwrap(),
            1,
        )
    }

    #[tokio::test]
    async fn test_open_creates_column_families() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).expect("failed to open RocksDB");
        assert!(store.db.cf_handle(CF_ORDERS).is_some());
        assert!(store.db.cf_handle(CF_LEDGER).is_some());
    }

    #[tokio::test]
    async fn test_ledger_merge_accumulates() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();

        let first = store
            .credit("u1", Amount::from_minor_units(1000).unwrap())
            .await
            .unwrap();
        assert_eq!(first, Balance::new(1000));
        let second = store
            .credit("u1", Amount::from_minor_units(250).unwrap())
            .await
            .unwrap();
        assert_eq!(second, Balance::new(1250));
        assert_eq!(store.balance("u2").await.unwrap(), Balance::ZERO);
    }

    #[tokio::test]
    async fn test_ledger_concurrent_credits_all_counted() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..25 {
                    store
                        .credit("u1", Amount::from_minor_units(1).unwrap())
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(store.balance("u1").await.unwrap(), Balance::new(200));
    }

    #[tokio::test]
    async fn test_balances_survive_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = RocksDbStore::open(dir.path()).unwrap();
            store
                .credit("u1", Amount::from_minor_units(1000).unwrap())
                .await
                .unwrap();
        }
        let store = RocksDbStore::open(dir.path()).unwrap();
        assert_eq!(store.balance("u1").await.unwrap(), Balance::new(1000));
    }

    #[tokio::test]
    async fn test_registry_round_trip_and_gate() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();

        store
            .record_created(order("order_1", "u1", 1000))
            .await
            .unwrap();
        assert!(matches!(
            store.record_created(order("order_1", "u1", 1000)).await,
            Err(PaymentError::DuplicateOrder(_))
        ));

        let CaptureGate::Begun(token) = store.try_begin_capture("order_1").await.unwrap() else {
            panic!("expected token");
        };
        assert!(matches!(
            store.try_begin_capture("order_1").await.unwrap(),
            CaptureGate::InFlight
        ));

        store
            .finalize_capture(token, CaptureOutcome::Captured)
            .await
            .unwrap();
        assert!(matches!(
            store.try_begin_capture("order_1").await.unwrap(),
            CaptureGate::Finalized(OrderStatus::Captured)
        ));

        let recorded = store.get("order_1").await.unwrap().unwrap();
        assert_eq!(recorded.status, OrderStatus::Captured);
    }

    #[tokio::test]
    async fn test_terminal_status_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = RocksDbStore::open(dir.path()).unwrap();
            store
                .record_created(order("order_1", "u1", 1000))
                .await
                .unwrap();
            let CaptureGate::Begun(token) = store.try_begin_capture("order_1").await.unwrap()
            else {
                panic!("expected token");
            };
            store
                .finalize_capture(token, CaptureOutcome::CreditFailed)
                .await
                .unwrap();
        }

        // Replay protection holds across restarts.
        let store = RocksDbStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.try_begin_capture("order_1").await.unwrap(),
            CaptureGate::Finalized(OrderStatus::CreditFailed)
        ));
    }

    #[tokio::test]
    async fn test_in_flight_is_cleared_on_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = RocksDbStore::open(dir.path()).unwrap();
            store
                .record_created(order("order_1", "u1", 1000))
                .await
                .unwrap();
            let CaptureGate::Begun(_token) = store.try_begin_capture("order_1").await.unwrap()
            else {
                panic!("expected token");
            };
            // Simulated crash: the token is dropped without finalize.
        }

        let store = RocksDbStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.try_begin_capture("order_1").await.unwrap(),
            CaptureGate::Begun(_)
        ));
    }
}
