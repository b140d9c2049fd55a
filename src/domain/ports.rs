use crate::domain::ledger::LedgerAccount;
use crate::domain::money::{Amount, Balance};
use crate::domain::order::{CaptureGate, CaptureOutcome, CaptureToken, PaymentOrder};
use crate::error::Result;
use async_trait::async_trait;

pub type LedgerStoreBox = Box<dyn LedgerStore>;
pub type OrderRegistryBox = Box<dyn OrderRegistry>;
pub type PaymentGatewayBox = Box<dyn PaymentGateway>;

/// How a gateway confirms that a claimed payment really completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// The checkout callback carries a payment id and an HMAC signature that
    /// must be verified server-side.
    SignedCallback,
    /// The adapter performs its own server-to-server capture call; the
    /// response is trusted and no callback signature exists.
    ServerCapture,
}

/// A remote order as returned by the gateway at creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteOrder {
    /// The gateway-assigned identifier. This is the idempotence key for the
    /// whole settlement flow.
    pub order_id: String,
    /// Reconciliation reference sent with the create call; never used as an
    /// idempotence key.
    pub receipt: Option<String>,
}

/// Result of a server-to-server capture call.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCapture {
    pub status: RemoteCaptureStatus,
    /// The amount the gateway says it captured, in minor units. Reported for
    /// auditing only; the ledger is always credited with the amount recorded
    /// at order creation.
    pub amount: Option<Amount>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCaptureStatus {
    Completed,
    Other(String),
}

/// Client for one external payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &'static str;

    fn capture_mode(&self) -> CaptureMode;

    /// Creates a remote order the checkout widget can be pointed at.
    async fn create_remote_order(&self, amount: Amount, user_id: &str) -> Result<RemoteOrder>;

    /// Captures a remote order server-to-server. Only `ServerCapture`
    /// gateways support this.
    async fn capture_remote_order(&self, order_id: &str) -> Result<RemoteCapture>;
}

/// Tracks payment orders from creation to settlement and guards against
/// duplicate capture.
#[async_trait]
pub trait OrderRegistry: Send + Sync {
    /// Records a freshly created order. Fails with `DuplicateOrder` if the id
    /// is already known; a correct gateway never reuses ids, but the registry
    /// checks anyway.
    async fn record_created(&self, order: PaymentOrder) -> Result<()>;

    /// Atomic test-and-set over the order's capture state: exactly one caller
    /// obtains the `CaptureToken` for a given order, everyone else observes
    /// `InFlight` or the terminal status. Fails with `UnknownOrder`.
    async fn try_begin_capture(&self, order_id: &str) -> Result<CaptureGate>;

    /// Moves the order into a terminal state. Once terminal, no further
    /// capture attempt can produce a credit.
    async fn finalize_capture(&self, token: CaptureToken, outcome: CaptureOutcome) -> Result<()>;

    /// Abandons a capture attempt without reaching a terminal state, so a
    /// later retry can settle the order.
    async fn release_capture(&self, token: CaptureToken) -> Result<()>;

    async fn get(&self, order_id: &str) -> Result<Option<PaymentOrder>>;

    /// Every recorded order, for the reconciliation report.
    async fn all_orders(&self) -> Result<Vec<PaymentOrder>>;
}

/// Per-user balance store.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Atomically increments the user's balance and returns the new value.
    /// This must be a single store-side operation, not a read-then-write, so
    /// concurrent settlements for the same user are both reflected.
    async fn credit(&self, user_id: &str, amount: Amount) -> Result<Balance>;

    async fn balance(&self, user_id: &str) -> Result<Balance>;

    async fn all_accounts(&self) -> Result<Vec<LedgerAccount>>;
}
