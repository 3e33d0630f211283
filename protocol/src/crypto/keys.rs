//! # Key Management
//!
//! Ed25519 keypair generation and the tavern address form.
//!
//! Every patron of the tavern is an address, and every address is the
//! fingerprint of an Ed25519 public key: `"0x"` followed by the last
//! twenty bytes of the key's BLAKE3 hash, lowercase hex. Addresses are
//! case-normalized at the edges and compared case-insensitively, because
//! wallets cannot be trusted to agree on capitalization.
//!
//! ## Security considerations
//!
//! - Private keys come from `OsRng` and are zeroized on drop
//!   (ed25519-dalek handles both).
//! - The keypair deliberately does not implement `Serialize`. Exporting
//!   key material is an explicit act via `to_seed_bytes`, not a side
//!   effect of shoving a struct into JSON.
//! - Key bytes are never logged.

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors during key operations. Vague on purpose — error messages are
/// not the place to describe key material.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes")]
    InvalidSecretKey,

    #[error("invalid public key bytes: not a valid Ed25519 point")]
    InvalidPublicKey,
}

/// An Ed25519 keypair: a patron's identity, or the server's credential
/// signing key. The private half never leaves this struct except through
/// [`TavernKeypair::to_seed_bytes`].
#[derive(Clone)]
pub struct TavernKeypair {
    signing_key: SigningKey,
}

impl TavernKeypair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Reconstruct a keypair from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Reconstruct a keypair from a hex-encoded 32-byte seed.
    pub fn from_seed_hex(hex_seed: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_seed.trim()).map_err(|_| KeyError::InvalidSecretKey)?;
        let seed: [u8; 32] = bytes.try_into().map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self::from_seed(&seed))
    }

    /// Export the 32-byte seed. Deliberate, explicit, and hopefully rare.
    pub fn to_seed_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// The public half of this identity.
    pub fn public_key(&self) -> TavernPublicKey {
        TavernPublicKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }

    /// The tavern address of this identity.
    pub fn address(&self) -> String {
        self.public_key().address()
    }

    /// Sign a message. Deterministic per RFC 8032 — same key, same
    /// message, same signature.
    pub fn sign(&self, message: &[u8]) -> TavernSignature {
        TavernSignature {
            bytes: self.signing_key.sign(message).to_bytes().to_vec(),
        }
    }
}

impl fmt::Debug for TavernKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The address is public; the seed stays out of Debug output.
        f.debug_struct("TavernKeypair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// The public half of a tavern identity, safe to share.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TavernPublicKey {
    bytes: [u8; 32],
}

impl TavernPublicKey {
    /// Parse from raw bytes, rejecting anything that is not a valid
    /// Ed25519 point.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, KeyError> {
        VerifyingKey::from_bytes(bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self { bytes: *bytes })
    }

    /// The raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Derive the address: `0x` + lowercase hex of the last 20 bytes of
    /// `BLAKE3(pubkey)`. Stable for the life of the key.
    pub fn address(&self) -> String {
        let digest = blake3::hash(&self.bytes);
        format!("0x{}", hex::encode(&digest.as_bytes()[12..]))
    }

    /// Verify a signature over a message with strict Ed25519 rules.
    /// `false` for anything that is not exactly right — malformed
    /// signatures don't get their own error, they get a `false`.
    pub fn verify(&self, message: &[u8], signature: &TavernSignature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let Ok(sig_bytes) = <[u8; 64]>::try_from(signature.bytes.as_slice()) else {
            return false;
        };
        let sig = DalekSignature::from_bytes(&sig_bytes);
        verifying_key.verify_strict(message, &sig).is_ok()
    }
}

impl fmt::Debug for TavernPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TavernPublicKey({})", self.address())
    }
}

/// An Ed25519 signature. Always 64 bytes; anything else simply fails
/// verification.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TavernSignature {
    bytes: Vec<u8>,
}

impl TavernSignature {
    /// Wrap raw signature bytes received off the wire.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// The raw signature bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for TavernSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TavernSignature({}..)", hex::encode(&self.bytes[..self.bytes.len().min(8)]))
    }
}
