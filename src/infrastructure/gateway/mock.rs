use crate::domain::money::Amount;
use crate::domain::ports::{
    CaptureMode, PaymentGateway, RemoteCapture, RemoteCaptureStatus, RemoteOrder,
};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

struct MockState {
    next_id: AtomicU64,
    capture_status: Mutex<RemoteCaptureStatus>,
    captured_amount: Mutex<Option<Amount>>,
    fail_create: AtomicBool,
    fail_capture: AtomicBool,
}

/// Deterministic in-process gateway for tests and offline runs.
///
/// Issues sequential `order_N` ids so a scripted action stream can predict
/// them. `Clone` shares the underlying state, letting a test keep a handle
/// for scripting while the engine owns the boxed client.
#[derive(Clone)]
pub struct MockGateway {
    mode: CaptureMode,
    state: Arc<MockState>,
}

impl MockGateway {
    fn new(mode: CaptureMode) -> Self {
        Self {
            mode,
            state: Arc::new(MockState {
                next_id: AtomicU64::new(1),
                capture_status: Mutex::new(RemoteCaptureStatus::Completed),
                captured_amount: Mutex::new(None),
                fail_create: AtomicBool::new(false),
                fail_capture: AtomicBool::new(false),
            }),
        }
    }

    /// A mock behaving like the hosted-checkout gateway (signed callbacks).
    pub fn hosted() -> Self {
        Self::new(CaptureMode::SignedCallback)
    }

    /// A mock behaving like the direct-capture gateway (trusted capture).
    pub fn direct() -> Self {
        Self::new(CaptureMode::ServerCapture)
    }

    /// Scripts the status the next server-to-server captures report.
    pub fn set_capture_status(&self, status: RemoteCaptureStatus) {
        *self.state.capture_status.lock().unwrap() = status;
    }

    /// Scripts the captured amount the gateway claims, independent of what
    /// was ordered.
    pub fn set_captured_amount(&self, amount: Amount) {
        *self.state.captured_amount.lock().unwrap() = Some(amount);
    }

    /// Makes the next order creation fail as if the gateway were down.
    pub fn fail_next_create(&self) {
        self.state.fail_create.store(true, Ordering::SeqCst);
    }

    /// Makes the next capture call fail as if the gateway were down.
    pub fn fail_next_capture(&self) {
        self.state.fail_capture.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn capture_mode(&self) -> CaptureMode {
        self.mode
    }

    async fn create_remote_order(&self, _amount: Amount, user_id: &str) -> Result<RemoteOrder> {
        if self.state.fail_create.swap(false, Ordering::SeqCst) {
            return Err(PaymentError::GatewayUnavailable(
                "mock gateway offline".to_string(),
            ));
        }
        let id = self.state.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(RemoteOrder {
            order_id: format!("order_{id}"),
            receipt: Some(format!("receipt_user_{user_id}_{id}")),
        })
    }

    async fn capture_remote_order(&self, _order_id: &str) -> Result<RemoteCapture> {
        if self.state.fail_capture.swap(false, Ordering::SeqCst) {
            return Err(PaymentError::GatewayUnavailable(
                "mock gateway offline".to_string(),
            ));
        }
        Ok(RemoteCapture {
            status: self.state.capture_status.lock().unwrap().clone(),
            amount: *self.state.captured_amount.lock().unwrap(),
        })
    }
}
