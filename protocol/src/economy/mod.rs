//! The story economy: quotas, the zero-sum whiskey ledger, and the
//! content workflows that tie them together.
//!
//! [`EconomyEngine`] is the sole writer of durable state. Every workflow
//! is a short sequence of reads, one invariant check, and a write set
//! that commits atomically or not at all — a quota is never incremented
//! without its content mutation and vice versa.

pub mod engine;
pub mod error;

pub use engine::{EconomyEngine, WhiskeyTransfer};
pub use error::{EconomyError, QuotaAction};
