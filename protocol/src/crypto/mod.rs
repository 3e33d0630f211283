//! Cryptographic primitives for tavern identities.
//!
//! Two concerns live here, kept deliberately small:
//!
//! - [`keys`] — Ed25519 keypairs and the address form derived from them.
//! - [`scheme`] — the pluggable signature-recovery seam the login
//!   handshake calls through. The rest of the crate treats signature
//!   verification as a black box that either names an address or says
//!   nothing.

pub mod keys;
pub mod scheme;

pub use keys::{TavernKeypair, TavernPublicKey, TavernSignature};
pub use scheme::{Ed25519Recovery, SignatureScheme};
