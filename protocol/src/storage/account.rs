//! # Account Records
//!
//! An account is created lazily on first successful authentication and
//! never deleted. Besides existing, it carries one auxiliary scalar:
//! "intimacy", a score the barman nudges up and down over time. Balances
//! and liked-sets live in their own trees ([`super::ledger`],
//! [`super::content`]); this store only owns the record itself.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sled::Tree;

use super::db::{decode, encode, DbResult, TavernDb};

/// The durable record for one address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountRecord {
    /// Case-normalized (lowercase) address.
    pub address: String,
    /// Auxiliary relationship score. Adjusted in deltas, never reset.
    pub intimacy: i64,
    /// Creation time, Unix milliseconds.
    pub created_at_ms: i64,
}

/// Store view over the `accounts` tree.
#[derive(Debug, Clone)]
pub struct AccountStore {
    tree: Tree,
}

impl AccountStore {
    pub fn new(db: &TavernDb) -> Self {
        Self {
            tree: db.accounts.clone(),
        }
    }

    /// Fetch an account record, if it exists.
    pub fn get(&self, address: &str) -> DbResult<Option<AccountRecord>> {
        let key = address.to_lowercase();
        match self.tree.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Fetch an account record, creating it if absent.
    ///
    /// Returns `(record, created)` — `created` tells the engine whether
    /// the one-time welcome grant is owed.
    pub fn get_or_create(&self, address: &str) -> DbResult<(AccountRecord, bool)> {
        let key = address.to_lowercase();
        if let Some(existing) = self.get(&key)? {
            return Ok((existing, false));
        }
        let record = AccountRecord {
            address: key.clone(),
            intimacy: 0,
            created_at_ms: Utc::now().timestamp_millis(),
        };
        self.tree.insert(key.as_bytes(), encode(&record)?)?;
        Ok((record, true))
    }

    /// Current intimacy for an address. Unknown accounts read as zero.
    pub fn intimacy(&self, address: &str) -> DbResult<i64> {
        Ok(self.get(address)?.map(|r| r.intimacy).unwrap_or(0))
    }

    /// Adjust intimacy by a signed delta, saturating at the i64 bounds.
    /// Creates the account if it does not exist yet. Returns the new
    /// value.
    pub fn adjust_intimacy(&self, address: &str, delta: i64) -> DbResult<i64> {
        let (mut record, _) = self.get_or_create(address)?;
        record.intimacy = record.intimacy.saturating_add(delta);
        self.tree
            .insert(record.address.as_bytes(), encode(&record)?)?;
        Ok(record.intimacy)
    }
}
