use payledger::domain::signature::sign;
use std::io::Write;
use tempfile::NamedTempFile;

pub const SECRET: &str = "cli_test_secret";

pub fn actions_file(lines: &[String]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    file
}

pub fn create_order_line(amount: &str, user_id: &str) -> String {
    format!("{{\"action\":\"create_order\",\"amount\":\"{amount}\",\"user_id\":\"{user_id}\"}}")
}

/// A capture line with a correctly forged signature for the given pair.
pub fn capture_line(order_id: &str, payment_id: &str) -> String {
    let signature = sign(SECRET, order_id, payment_id);
    format!(
        "{{\"action\":\"capture_order\",\"order_id\":\"{order_id}\",\"payment_id\":\"{payment_id}\",\"signature\":\"{signature}\"}}"
    )
}

pub fn capture_line_with_signature(order_id: &str, payment_id: &str, signature: &str) -> String {
    format!(
        "{{\"action\":\"capture_order\",\"order_id\":\"{order_id}\",\"payment_id\":\"{payment_id}\",\"signature\":\"{signature}\"}}"
    )
}

pub fn balance_line(user_id: &str) -> String {
    format!("{{\"action\":\"balance\",\"user_id\":\"{user_id}\"}}")
}
