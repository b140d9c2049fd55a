use crate::domain::order::PaymentOrder;
use crate::error::Result;
use std::io::Write;

/// Writes the reconciliation report as CSV.
///
/// One row per recorded order. Orders in `credit_failed` are the ones to act
/// on: the payment was received but the ledger was never credited.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(destination: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new().from_writer(destination),
        }
    }

    pub fn write_orders(&mut self, orders: Vec<PaymentOrder>) -> Result<()> {
        self.writer
            .write_record(["order_id", "user_id", "amount", "status", "created_at"])?;
        for order in orders {
            let amount = order.amount.to_string();
            let created_at = order.created_at.to_string();
            self.writer.write_record([
                order.order_id.as_str(),
                order.user_id.as_str(),
                amount.as_str(),
                order.status.as_str(),
                created_at.as_str(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
