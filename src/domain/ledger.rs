use crate::domain::money::Balance;
use serde::{Deserialize, Serialize};

/// Per-user balance record.
///
/// The balance is mutated only through `LedgerStore::credit`, an atomic
/// increment; application code never reads, modifies, and writes it back.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct LedgerAccount {
    pub user_id: String,
    pub balance: Balance,
}

impl LedgerAccount {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            balance: Balance::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_starts_empty() {
        let account = LedgerAccount::new("u1");
        assert_eq!(account.balance, Balance::ZERO);
    }
}
