//! # Bearer Credentials
//!
//! After the challenge handshake proves an address once, a credential
//! stands in for the proof for the next hour. No server-side session
//! table: validity is a signature check plus a clock comparison, which
//! means any replica holding the signing key can verify without
//! coordination.
//!
//! ## Token Format
//!
//! ```text
//! token := hex(bincode(CredentialClaims)) "." hex(ed25519_sig(payload))
//! ```
//!
//! The signature covers the raw payload bytes. Flip one bit anywhere and
//! verification answers `None` — the same `None` an expired token gets,
//! because the caller's move is identical either way: re-authenticate.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config;
use crate::crypto::TavernKeypair;

/// The signed payload of a credential.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialClaims {
    /// The verified address this credential stands for. Lowercase.
    pub address: String,
    /// Issuance time, Unix milliseconds.
    pub issued_at_ms: i64,
    /// Expiry time, Unix milliseconds. Compared against the verifier's
    /// clock; there is no revocation path.
    pub expires_at_ms: i64,
}

impl CredentialClaims {
    /// Whether the credential is still live at time `now_ms`.
    pub fn is_live_at(&self, now_ms: i64) -> bool {
        now_ms < self.expires_at_ms
    }
}

/// Issues and verifies signed, time-bounded bearer tokens.
pub struct CredentialIssuer {
    keypair: TavernKeypair,
    ttl: Duration,
}

impl CredentialIssuer {
    /// Create an issuer with the default credential TTL.
    pub fn new(keypair: TavernKeypair) -> Self {
        Self::with_ttl(keypair, config::CREDENTIAL_TTL)
    }

    /// Create an issuer with an explicit TTL.
    pub fn with_ttl(keypair: TavernKeypair, ttl: Duration) -> Self {
        Self { keypair, ttl }
    }

    /// Issue a credential for a verified address.
    ///
    /// The address is normalized to lowercase before embedding so that
    /// every downstream comparison is byte equality.
    pub fn issue(&self, address: &str) -> String {
        let now = Utc::now().timestamp_millis();
        let claims = CredentialClaims {
            address: address.to_lowercase(),
            issued_at_ms: now,
            expires_at_ms: now + self.ttl.as_millis() as i64,
        };
        // Claims serialize infallibly: three plain fields, no maps.
        let payload = bincode::serialize(&claims).unwrap_or_default();
        let signature = self.keypair.sign(&payload);
        format!("{}.{}", hex::encode(&payload), hex::encode(signature.as_bytes()))
    }

    /// Verify a token and return the embedded address, or `None`.
    ///
    /// `None` covers every failure — malformed, tampered, expired. The
    /// caller treats it as "re-authenticate", never as transient.
    pub fn verify(&self, token: &str) -> Option<String> {
        self.claims(token).map(|c| c.address)
    }

    /// Verify a token and return the full claims. The session actor uses
    /// this to remember the expiry and cut authenticated connections off
    /// mid-session when it passes.
    pub fn claims(&self, token: &str) -> Option<CredentialClaims> {
        let (payload_hex, sig_hex) = token.split_once('.')?;
        let payload = hex::decode(payload_hex).ok()?;
        let sig_bytes = hex::decode(sig_hex).ok()?;

        let signature = crate::crypto::TavernSignature::from_bytes(sig_bytes);
        if !self.keypair.public_key().verify(&payload, &signature) {
            return None;
        }

        let claims: CredentialClaims = bincode::deserialize(&payload).ok()?;
        if !claims.is_live_at(Utc::now().timestamp_millis()) {
            return None;
        }
        Some(claims)
    }
}
