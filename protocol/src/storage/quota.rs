//! # QuotaStore — Per-Account Daily Counters
//!
//! Counts what an account did today: stories published, stories
//! received, whiskey sent, replies posted. Keyed by
//! `address|YYYY-MM-DD`, where the date is the calendar day in a fixed
//! reference timezone — one midnight for everyone, no per-user zones.
//!
//! Counters are monotonically non-decreasing within a day and "reset"
//! only by the key changing at rollover. Yesterday's rows are never
//! touched again; they just stop being today. The ceiling checks and
//! increments happen inside the engine's transactions so the
//! check-then-act sequence is safe across rooms; this view owns the
//! key scheme, the codec, and plain reads.

use chrono::{FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sled::Tree;

use super::db::{decode, DbResult, TavernDb};
use crate::config;

/// One day's action counters for one account. Absent record = all zero.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyQuota {
    /// Stories published today.
    pub published: u32,
    /// Random stories received today.
    pub received: u32,
    /// Whiskey points sent today.
    pub whiskey_sent: u32,
    /// Replies posted today. Only enforced when a reply cap is
    /// configured; counted regardless.
    pub replies: u32,
}

/// Store view over the `quotas` tree.
#[derive(Debug, Clone)]
pub struct QuotaStore {
    tree: Tree,
    /// Reference timezone for the quota calendar.
    offset: FixedOffset,
}

impl QuotaStore {
    /// View with the default reference timezone from [`config`].
    pub fn new(db: &TavernDb) -> Self {
        Self::with_offset(db, default_offset())
    }

    /// View with an explicit reference timezone.
    pub fn with_offset(db: &TavernDb, offset: FixedOffset) -> Self {
        Self {
            tree: db.quotas.clone(),
            offset,
        }
    }

    /// Today's calendar date in the reference timezone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset).date_naive()
    }

    /// Storage key for `(address, day)`.
    pub(crate) fn key_for(address: &str, day: NaiveDate) -> Vec<u8> {
        format!("{}|{}", address.to_lowercase(), day.format("%Y-%m-%d"))
            .into_bytes()
    }

    /// Storage key for `(address, today)`.
    pub(crate) fn key_today(&self, address: &str) -> Vec<u8> {
        Self::key_for(address, self.today())
    }

    /// Today's counters for an address. No record yet means all-zero —
    /// the row is created by the first successful action of the day.
    pub fn get(&self, address: &str) -> DbResult<DailyQuota> {
        match self.tree.get(self.key_today(address))? {
            Some(bytes) => decode(&bytes),
            None => Ok(DailyQuota::default()),
        }
    }

    /// Decode a stored quota value; absent reads as all-zero. Used by
    /// the engine inside transactions.
    pub(crate) fn decode_value(bytes: Option<&[u8]>) -> DailyQuota {
        bytes
            .and_then(|b| decode(b).ok())
            .unwrap_or_default()
    }
}

/// The default reference timezone as a `FixedOffset`.
pub fn default_offset() -> FixedOffset {
    offset_from_hours(config::QUOTA_UTC_OFFSET_HOURS)
}

/// Build a `FixedOffset` from whole hours east of UTC. Out-of-range
/// values clamp to UTC rather than panic — a misconfigured node should
/// come up on UTC, not die.
pub fn offset_from_hours(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours.clamp(-23, 23) * 3600)
        .unwrap_or_else(|| FixedOffset::east_opt(0).expect("UTC offset is valid"))
}
