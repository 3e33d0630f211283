//! # TavernDb — Persistent Storage Engine
//!
//! The persistence layer for the tavern, built on sled's embedded
//! key-value store. All on-disk data flows through this module.
//!
//! ## Tree Layout
//!
//! sled organizes data into named "trees", each an independent B+ tree
//! with its own keyspace:
//!
//! | Tree            | Key                          | Value                     |
//! |-----------------|------------------------------|---------------------------|
//! | `accounts`      | address (UTF-8)              | `bincode(AccountRecord)`  |
//! | `balances`      | address (UTF-8)              | balance (8B BE u64)       |
//! | `quotas`        | `address|YYYY-MM-DD` (UTF-8) | `bincode(DailyQuota)`     |
//! | `stories`       | story id (8B BE)             | `bincode(StoryRecord)`    |
//! | `story_authors` | address ++ story id (8B BE)  | empty (index entry)       |
//! | `replies`       | reply id (8B BE)             | `bincode(ReplyRecord)`    |
//! | `reply_targets` | address ++ reply id (8B BE)  | empty (index entry)       |
//! | `seen`          | address (UTF-8)              | `bincode(BTreeSet<u64>)`  |
//!
//! Ids are big-endian u64 so sled's lexicographic ordering matches
//! numeric ordering — prefix scans over an author's stories come back
//! in publication order for free.
//!
//! ## Atomicity
//!
//! Single-tree writes are atomic by sled's nature. The economy's
//! check-then-act workflows (publish, fetch bookkeeping, whiskey
//! transfer) run as serializable multi-tree transactions in the engine;
//! this module only hands out the trees and the codecs.

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::{Db, Tree};
use std::path::Path;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type DbResult<T> = Result<T, DbError>;

// ---------------------------------------------------------------------------
// TavernDb
// ---------------------------------------------------------------------------

/// Persistent storage engine for the tavern.
///
/// Wraps a sled `Db` and exposes the named trees the leaf stores are
/// built over. All serialization uses bincode.
///
/// # Thread Safety
///
/// sled trees are lock-free for concurrent reads with serialized
/// writes; `TavernDb` clones share the same underlying database and can
/// be passed around freely.
#[derive(Debug, Clone)]
pub struct TavernDb {
    /// The underlying sled database handle.
    db: Db,
    /// Lazily created account records.
    pub(crate) accounts: Tree,
    /// Whiskey-point balances, 8-byte big-endian u64 values.
    pub(crate) balances: Tree,
    /// Per-(account, day) action counters.
    pub(crate) quotas: Tree,
    /// Story records by id.
    pub(crate) stories: Tree,
    /// Index: author address ++ story id.
    pub(crate) story_authors: Tree,
    /// Reply records by id.
    pub(crate) replies: Tree,
    /// Index: target address ++ reply id.
    pub(crate) reply_targets: Tree,
    /// Per-account liked/received story-id sets.
    pub(crate) seen: Tree,
}

impl TavernDb {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary database cleaned up on drop. Ideal for tests —
    /// no filesystem side effects, no cleanup.
    pub fn open_temporary() -> DbResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> DbResult<Self> {
        let accounts = db.open_tree("accounts")?;
        let balances = db.open_tree("balances")?;
        let quotas = db.open_tree("quotas")?;
        let stories = db.open_tree("stories")?;
        let story_authors = db.open_tree("story_authors")?;
        let replies = db.open_tree("replies")?;
        let reply_targets = db.open_tree("reply_targets")?;
        let seen = db.open_tree("seen")?;

        Ok(Self {
            db,
            accounts,
            balances,
            quotas,
            stories,
            story_authors,
            replies,
            reply_targets,
            seen,
        })
    }

    /// Generate a monotonic u64 id for a new story or reply.
    pub fn generate_id(&self) -> DbResult<u64> {
        Ok(self.db.generate_id()?)
    }

    /// Flush all dirty buffers to disk.
    pub fn flush(&self) -> DbResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Codecs
// ---------------------------------------------------------------------------

/// Encode a record for storage.
pub(crate) fn encode<T: Serialize>(value: &T) -> DbResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| DbError::Serialization(e.to_string()))
}

/// Decode a record from storage.
pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> DbResult<T> {
    bincode::deserialize(bytes).map_err(|e| DbError::Serialization(e.to_string()))
}

/// Big-endian key encoding for a u64 id.
pub(crate) fn id_key(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

/// Composite index key: address bytes followed by the BE id.
pub(crate) fn index_key(address: &str, id: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(address.len() + 8);
    key.extend_from_slice(address.as_bytes());
    key.extend_from_slice(&id.to_be_bytes());
    key
}

/// Recover the id from the tail of a composite index key.
pub(crate) fn id_from_index_key(key: &[u8]) -> Option<u64> {
    let tail: [u8; 8] = key.get(key.len().checked_sub(8)?..)?.try_into().ok()?;
    Some(u64::from_be_bytes(tail))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporary_db_opens_all_trees() {
        let db = TavernDb::open_temporary().unwrap();
        assert!(db.accounts.is_empty());
        assert!(db.stories.is_empty());
        assert!(db.seen.is_empty());
    }

    #[test]
    fn generated_ids_are_distinct() {
        let db = TavernDb::open_temporary().unwrap();
        let a = db.generate_id().unwrap();
        let b = db.generate_id().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn index_key_roundtrips_the_id() {
        let key = index_key("0xabc", 42);
        assert_eq!(id_from_index_key(&key), Some(42));
        assert!(key.starts_with(b"0xabc"));
    }

    #[test]
    fn be_ids_sort_numerically() {
        // The property the prefix scans rely on.
        assert!(id_key(2) < id_key(10));
        assert!(index_key("0xabc", 2) < index_key("0xabc", 10));
    }

    #[test]
    fn short_index_key_decodes_as_none() {
        assert_eq!(id_from_index_key(&[1, 2, 3]), None);
    }
}
