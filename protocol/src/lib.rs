// Copyright (c) 2026 Tavern Protocol Contributors. MIT License.
// See LICENSE for details.

//! # Tavern Protocol — Core Library
//!
//! The stateful heart of the multiplayer tavern: a session server that
//! authenticates wallet-holding patrons, hands out bearer credentials,
//! enforces daily quotas, and runs a strictly zero-sum whiskey-point
//! economy over a graph of stories and replies.
//!
//! Everything else about the tavern — rendering, chat, pathfinding,
//! on-chain contracts — lives elsewhere and talks to this crate through
//! a narrow message interface. What lives *here* is the part that has to
//! be right: nobody mints whiskey, nobody reads someone else's mail, and
//! nobody publishes a fourth story on a three-story day.
//!
//! ## Architecture
//!
//! - **crypto** — Ed25519 keys, address derivation, and the pluggable
//!   signature-recovery seam used by the login handshake.
//! - **auth** — challenge/signature authentication and signed, time-bounded
//!   credentials. No server-side session table; validity is pure math.
//! - **storage** — sled-backed durable leaves: accounts, balances, daily
//!   quotas, and the story/reply content graph.
//! - **economy** — the engine that orchestrates quota checks, zero-sum
//!   point transfers, and content mutations. Sole writer of storage.
//! - **session** — the room actor: one task, one inbox, per-connection
//!   state machines, replies only to the connection that asked.
//! - **config** — protocol constants and tunable limits.
//!
//! ## Design Philosophy
//!
//! 1. Validation failures commit nothing. Ever.
//! 2. The acting address comes from connection state, never from payload.
//! 3. If two writes must be observed together, they go in one transaction.
//! 4. Auth errors are vague on purpose; economy errors are verbatim.

pub mod auth;
pub mod config;
pub mod crypto;
pub mod economy;
pub mod session;
pub mod storage;
