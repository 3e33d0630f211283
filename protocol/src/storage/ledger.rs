//! # PointLedger — Whiskey-Point Balances
//!
//! One tree, one invariant: balances are non-negative u64s, stored as
//! 8-byte big-endian values keyed by address. Debits that would go
//! below zero never happen — the transfer path in the engine checks
//! inside the same transaction that moves the points.
//!
//! This view exposes reads, the one-time welcome credit, and a
//! whole-ledger sum used to audit the zero-sum property. The zero-sum
//! transfer itself lives in the engine because it must commit atomically
//! with the sender's quota and the story tally.

use sled::Tree;

use super::db::{DbResult, TavernDb};

/// Decode an 8-byte big-endian balance; absent or malformed reads as 0.
pub(crate) fn decode_balance(bytes: Option<&[u8]>) -> u64 {
    bytes
        .and_then(|b| <[u8; 8]>::try_from(b).ok())
        .map(u64::from_be_bytes)
        .unwrap_or(0)
}

/// Encode a balance for storage.
pub(crate) fn encode_balance(balance: u64) -> [u8; 8] {
    balance.to_be_bytes()
}

/// Store view over the `balances` tree.
#[derive(Debug, Clone)]
pub struct PointLedger {
    tree: Tree,
}

impl PointLedger {
    pub fn new(db: &TavernDb) -> Self {
        Self {
            tree: db.balances.clone(),
        }
    }

    /// Current balance for an address. Unknown accounts hold zero.
    pub fn balance(&self, address: &str) -> DbResult<u64> {
        let value = self.tree.get(address.to_lowercase().as_bytes())?;
        Ok(decode_balance(value.as_deref()))
    }

    /// Credit points to an address, saturating rather than wrapping.
    /// Used only for the welcome grant at account creation — every other
    /// movement of points is the engine's zero-sum transfer.
    pub fn credit(&self, address: &str, amount: u64) -> DbResult<u64> {
        let key = address.to_lowercase();
        let current = self.balance(&key)?;
        let updated = current.saturating_add(amount);
        self.tree
            .insert(key.as_bytes(), encode_balance(updated).to_vec())?;
        Ok(updated)
    }

    /// Sum of every balance in the ledger. The zero-sum audit: this
    /// number only moves when an account is created (welcome grant),
    /// never when whiskey changes hands.
    pub fn total_points(&self) -> DbResult<u64> {
        let mut total: u64 = 0;
        for entry in self.tree.iter() {
            let (_, value) = entry?;
            total = total.saturating_add(decode_balance(Some(&value)));
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> PointLedger {
        PointLedger::new(&TavernDb::open_temporary().unwrap())
    }

    #[test]
    fn unknown_address_holds_zero() {
        assert_eq!(ledger().balance("0xnobody").unwrap(), 0);
    }

    #[test]
    fn credit_accumulates() {
        let ledger = ledger();
        assert_eq!(ledger.credit("0xabc", 10).unwrap(), 10);
        assert_eq!(ledger.credit("0xabc", 5).unwrap(), 15);
        assert_eq!(ledger.balance("0xABC").unwrap(), 15); // case-normalized
    }

    #[test]
    fn total_points_sums_all_accounts() {
        let ledger = ledger();
        ledger.credit("0xa", 10).unwrap();
        ledger.credit("0xb", 7).unwrap();
        assert_eq!(ledger.total_points().unwrap(), 17);
    }
}
