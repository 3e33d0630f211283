//! Durable storage for the tavern: one sled database, four leaf views.
//!
//! [`db::TavernDb`] owns the trees; [`account::AccountStore`],
//! [`ledger::PointLedger`], [`quota::QuotaStore`], and
//! [`content::ContentGraph`] are cheap per-concern views over them.
//! The economy engine is the only writer of any of these; readers
//! elsewhere get eventually-consistent snapshots and must live with it.

pub mod account;
pub mod content;
pub mod db;
pub mod ledger;
pub mod quota;

pub use account::{AccountRecord, AccountStore};
pub use content::{ContentGraph, MarkOutcome, ReplyRecord, StoryRecord};
pub use db::{DbError, DbResult, TavernDb};
pub use ledger::PointLedger;
pub use quota::{DailyQuota, QuotaStore};
