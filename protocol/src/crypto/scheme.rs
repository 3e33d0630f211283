//! # Signature Recovery Scheme
//!
//! The login handshake needs exactly one thing from cryptography: given
//! a message and a signature blob, name the address that produced it, or
//! say nothing. [`SignatureScheme`] is that seam. The authenticator
//! never learns *why* recovery failed — there is no error oracle to
//! probe, just an `Option`.
//!
//! The shipped implementation, [`Ed25519Recovery`], expects a
//! self-describing envelope because Ed25519 (unlike secp256k1) has no
//! public-key recovery: the signer prepends their verifying key.
//!
//! ```text
//! envelope := pubkey(32 bytes) || signature(64 bytes)
//! ```
//!
//! Verification is strict; the recovered address is derived from the
//! embedded key, so a valid signature under key K can only ever name
//! K's address. A different chain's wallet format plugs in by
//! implementing the trait.

use ed25519_dalek::{Signature as DalekSignature, VerifyingKey};

use super::keys::{TavernKeypair, TavernPublicKey};

/// Envelope length: 32-byte verifying key + 64-byte signature.
pub const ENVELOPE_LENGTH: usize = 96;

/// The black-box signature primitive of the handshake.
pub trait SignatureScheme: Send + Sync {
    /// Recover the signing address from `(message, signature)`.
    /// `None` means "no valid signer" — malformed blob, bad point,
    /// failed verification, all the same answer.
    fn recover(&self, message: &[u8], signature: &[u8]) -> Option<String>;
}

/// Ed25519 with a pubkey-carrying envelope.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519Recovery;

impl SignatureScheme for Ed25519Recovery {
    fn recover(&self, message: &[u8], signature: &[u8]) -> Option<String> {
        if signature.len() != ENVELOPE_LENGTH {
            return None;
        }
        let key_bytes: [u8; 32] = signature[..32].try_into().ok()?;
        let sig_bytes: [u8; 64] = signature[32..].try_into().ok()?;

        let verifying_key = VerifyingKey::from_bytes(&key_bytes).ok()?;
        let sig = DalekSignature::from_bytes(&sig_bytes);
        verifying_key.verify_strict(message, &sig).ok()?;

        let public = TavernPublicKey::from_bytes(&key_bytes).ok()?;
        Some(public.address())
    }
}

/// Build the envelope a client submits during login: sign `message` and
/// prepend the verifying key. Lives here so tests and client tooling
/// agree with [`Ed25519Recovery`] on the format byte for byte.
pub fn sign_envelope(keypair: &TavernKeypair, message: &[u8]) -> Vec<u8> {
    let mut envelope = Vec::with_capacity(ENVELOPE_LENGTH);
    envelope.extend_from_slice(keypair.public_key().as_bytes());
    envelope.extend_from_slice(keypair.sign(message).as_bytes());
    envelope
}
