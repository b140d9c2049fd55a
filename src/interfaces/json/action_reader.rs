use crate::error::Result;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::BufRead;

/// One request from the browser-facing surface, as a JSON line.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionRequest {
    CreateOrder {
        amount: Decimal,
        user_id: String,
    },
    CaptureOrder {
        order_id: String,
        #[serde(default)]
        payment_id: Option<String>,
        #[serde(default)]
        signature: Option<String>,
        #[serde(default)]
        user_id: Option<String>,
    },
    Balance {
        user_id: String,
    },
}

/// Reads action requests from a JSON-lines source.
///
/// Wraps any `BufRead` and yields `Result<ActionRequest>` per non-empty line,
/// so large action streams are processed without loading everything into
/// memory.
pub struct ActionReader<R: BufRead> {
    reader: R,
}

impl<R: BufRead> ActionReader<R> {
    pub fn new(source: R) -> Self {
        Self { reader: source }
    }

    /// Returns an iterator that lazily reads and deserializes requests.
    pub fn actions(self) -> impl Iterator<Item = Result<ActionRequest>> {
        self.reader
            .lines()
            .filter(|line| line.as_ref().map(|l| !l.trim().is_empty()).unwrap_or(true))
            .map(|line| {
                let line = line?;
                Ok(serde_json::from_str(&line)?)
            })
    }
}
