use thiserror::Error;

pub type Result<T> = std::result::Result<T, PaymentError>;

/// Error taxonomy for the settlement core.
///
/// Validation and configuration errors are returned before any side effect.
/// Once a remote order exists, failures are also recorded in the order
/// registry so reconciliation can find them later.
#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("payment gateway is not configured: {0}")]
    MisconfiguredCredentials(String),
    #[error("payment gateway unavailable: {0}")]
    GatewayUnavailable(String),
    #[error("malformed capture callback: {0}")]
    InvalidCallback(String),
    #[error("signature verification failed")]
    SignatureInvalid,
    #[error("payment not completed at the gateway: {0}")]
    PaymentNotCompleted(String),
    #[error("order {0} is already recorded")]
    DuplicateOrder(String),
    #[error("order {0} is already being captured")]
    AlreadyCaptured(String),
    #[error("unknown order {0}")]
    UnknownOrder(String),
    #[error("ledger credit failed for order {0}; payment was received and must be reconciled")]
    CreditFailed(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for PaymentError {
    fn from(e: rocksdb::Error) -> Self {
        PaymentError::InternalError(Box::new(e))
    }
}
