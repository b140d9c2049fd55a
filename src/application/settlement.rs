use crate::domain::ledger::LedgerAccount;
use crate::domain::money::{Amount, Balance};
use crate::domain::order::{
    CaptureGate, CaptureOutcome, CaptureRequest, OrderStatus, PaymentOrder, Settlement,
};
use crate::domain::ports::{
    CaptureMode, LedgerStoreBox, OrderRegistryBox, PaymentGatewayBox, RemoteCaptureStatus,
};
use crate::domain::signature::SignatureVerifier;
use crate::error::{PaymentError, Result};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// How long a capture call waits for a racing capture of the same order to
/// finalize before giving up.
const CAPTURE_RACE_RETRIES: u32 = 50;
const CAPTURE_RACE_DELAY: Duration = Duration::from_millis(20);

/// The settlement state machine.
///
/// Coordinates order creation, callback verification, and ledger crediting:
/// `Created -> {Captured, VerificationFailed, CreditFailed}`, all terminal.
/// The order registry's capture gate serializes concurrent captures of the
/// same order, so each order credits the ledger at most once.
pub struct SettlementEngine {
    gateway: PaymentGatewayBox,
    orders: OrderRegistryBox,
    ledger: LedgerStoreBox,
    verifier: SignatureVerifier,
}

impl SettlementEngine {
    pub fn new(
        gateway: PaymentGatewayBox,
        orders: OrderRegistryBox,
        ledger: LedgerStoreBox,
        verifier: SignatureVerifier,
    ) -> Self {
        Self {
            gateway,
            orders,
            ledger,
            verifier,
        }
    }

    /// Creates a payment order against the gateway and records it locally.
    ///
    /// The returned order carries the gateway-assigned id the checkout widget
    /// is driven with, plus the server-side amount every later credit uses.
    pub async fn create_order(&self, amount: Amount, user_id: &str) -> Result<PaymentOrder> {
        if user_id.trim().is_empty() {
            return Err(PaymentError::InvalidInput(
                "user id must not be empty".to_string(),
            ));
        }

        let remote = self.gateway.create_remote_order(amount, user_id).await?;
        let order = PaymentOrder::new(
            remote.order_id,
            user_id.to_string(),
            amount,
            epoch_millis(),
        );

        if let Some(receipt) = remote.receipt.as_deref() {
            debug!(order_id = %order.order_id, receipt = %receipt, "gateway receipt issued");
        }

        if let Err(e) = self.orders.record_created(order.clone()).await {
            // The remote order exists but we could not track it; it will
            // never be settled by this instance.
            warn!(
                order_id = %order.order_id,
                gateway = self.gateway.name(),
                "failed to record created order: {e}"
            );
            return Err(e);
        }

        info!(
            order_id = %order.order_id,
            user_id = %order.user_id,
            amount = %order.amount,
            gateway = self.gateway.name(),
            "payment order created"
        );
        Ok(order)
    }

    /// Settles a checkout callback.
    ///
    /// Verification depends on the gateway variant: signed callbacks are
    /// checked against the shared-secret HMAC, trusted gateways are asked to
    /// capture server-to-server. On success the user's ledger balance is
    /// credited with the amount recorded at creation time, exactly once per
    /// order; replayed callbacks observe the original outcome.
    pub async fn capture_order(&self, request: CaptureRequest) -> Result<Settlement> {
        // Structural validation happens before any state change.
        request.validate()?;
        if self.gateway.capture_mode() == CaptureMode::SignedCallback {
            request.signed_fields()?;
        }

        let order_id = request.order_id.clone();
        let token = {
            let mut attempt = 0;
            loop {
                match self.orders.try_begin_capture(&order_id).await? {
                    CaptureGate::Begun(token) => break token,
                    CaptureGate::Finalized(status) => {
                        return self.replay_outcome(&order_id, status).await;
                    }
                    CaptureGate::InFlight => {
                        // A concurrent capture of the same order is in
                        // progress; wait briefly for its outcome instead of
                        // failing the retry.
                        attempt += 1;
                        if attempt > CAPTURE_RACE_RETRIES {
                            return Err(PaymentError::AlreadyCaptured(order_id));
                        }
                        tokio::time::sleep(CAPTURE_RACE_DELAY).await;
                    }
                }
            }
        };

        match self.gateway.capture_mode() {
            CaptureMode::SignedCallback => {
                let (payment_id, signature) = request.signed_fields()?;
                if !self.verifier.verify(&order_id, payment_id, signature) {
                    self.orders
                        .finalize_capture(token, CaptureOutcome::VerificationFailed)
                        .await?;
                    info!(order_id = %order_id, "capture rejected: signature mismatch");
                    return Err(PaymentError::SignatureInvalid);
                }
            }
            CaptureMode::ServerCapture => {
                let capture = match self.gateway.capture_remote_order(&order_id).await {
                    Ok(capture) => capture,
                    Err(e) => {
                        // The gateway itself was unreachable; the payment may
                        // still be capturable, so leave the order open for a
                        // retry instead of finalizing.
                        self.orders.release_capture(token).await?;
                        return Err(e);
                    }
                };
                match capture.status {
                    RemoteCaptureStatus::Completed => {
                        if let Some(amount) = capture.amount
                            && amount != token.amount
                        {
                            warn!(
                                order_id = %order_id,
                                recorded = %token.amount,
                                reported = %amount,
                                "gateway reported a different captured amount; crediting the recorded amount"
                            );
                        }
                    }
                    RemoteCaptureStatus::Other(status) => {
                        self.orders
                            .finalize_capture(token, CaptureOutcome::VerificationFailed)
                            .await?;
                        info!(order_id = %order_id, status = %status, "capture rejected by gateway");
                        return Err(PaymentError::PaymentNotCompleted(status));
                    }
                }
            }
        }

        if let Some(claimed) = request.user_id.as_deref()
            && claimed != token.user_id
        {
            warn!(
                order_id = %order_id,
                recorded = %token.user_id,
                claimed = %claimed,
                "callback claimed a different user; crediting the recorded owner"
            );
        }

        // Payment is confirmed. Credit the server-recorded amount to the
        // server-recorded owner.
        let settlement = Settlement {
            order_id: token.order_id.clone(),
            user_id: token.user_id.clone(),
            amount: token.amount,
            replayed: false,
        };
        match self.ledger.credit(&token.user_id, token.amount).await {
            Ok(balance) => {
                self.orders
                    .finalize_capture(token, CaptureOutcome::Captured)
                    .await?;
                info!(
                    order_id = %settlement.order_id,
                    user_id = %settlement.user_id,
                    amount = %settlement.amount,
                    balance = %balance,
                    "payment captured and credited"
                );
                Ok(settlement)
            }
            Err(e) => {
                // Money was received but not credited. Record the state so
                // reconciliation can find it; never swallow this.
                warn!(order_id = %order_id, "ledger credit failed after confirmed payment: {e}");
                self.orders
                    .finalize_capture(token, CaptureOutcome::CreditFailed)
                    .await?;
                Err(PaymentError::CreditFailed(order_id))
            }
        }
    }

    /// Reports the outcome a finalized order originally reached. Successful
    /// captures replay as success without a second credit; failures replay as
    /// the original error.
    async fn replay_outcome(&self, order_id: &str, status: OrderStatus) -> Result<Settlement> {
        match status {
            OrderStatus::Captured => {
                let order = self
                    .orders
                    .get(order_id)
                    .await?
                    .ok_or_else(|| PaymentError::UnknownOrder(order_id.to_string()))?;
                debug!(order_id = %order_id, "replayed capture of settled order");
                Ok(Settlement {
                    order_id: order.order_id,
                    user_id: order.user_id,
                    amount: order.amount,
                    replayed: true,
                })
            }
            OrderStatus::VerificationFailed => match self.gateway.capture_mode() {
                CaptureMode::SignedCallback => Err(PaymentError::SignatureInvalid),
                CaptureMode::ServerCapture => Err(PaymentError::PaymentNotCompleted(
                    "rejected on a previous capture attempt".to_string(),
                )),
            },
            OrderStatus::CreditFailed => Err(PaymentError::CreditFailed(order_id.to_string())),
            // The registry only finalizes into terminal states.
            OrderStatus::Created => Err(PaymentError::AlreadyCaptured(order_id.to_string())),
        }
    }

    pub async fn balance(&self, user_id: &str) -> Result<Balance> {
        if user_id.trim().is_empty() {
            return Err(PaymentError::InvalidInput(
                "user id must not be empty".to_string(),
            ));
        }
        self.ledger.balance(user_id).await
    }

    /// Every recorded order, for the reconciliation report. Orders stuck in
    /// `credit_failed` here hold money that was received but not credited.
    pub async fn all_orders(&self) -> Result<Vec<PaymentOrder>> {
        self.orders.all_orders().await
    }

    pub async fn all_accounts(&self) -> Result<Vec<LedgerAccount>> {
        self.ledger.all_accounts().await
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
