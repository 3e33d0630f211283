//! # Challenge Authentication
//!
//! Proves live possession of a private key: the server hands a
//! connection a random nonce, the wallet signs it, the server recovers
//! the signer and compares it to the claimed address.
//!
//! ## Replay Protection
//!
//! The nonce is bound to one connection and consumed by the first
//! verification attempt, success or failure. A captured signature is
//! useless afterwards — there is nothing left for it to prove. Unclaimed
//! nonces expire after [`config::CHALLENGE_TTL`] and count as absent,
//! a hard deadline rather than best effort.
//!
//! The table is a `DashMap` keyed by connection id, so a room actor and
//! any future siblings can share one authenticator without locking
//! ceremony.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use rand::rngs::OsRng;
use rand::RngCore;
use uuid::Uuid;

use crate::config;
use crate::crypto::SignatureScheme;

use super::error::AuthError;

/// A pending proof: the nonce, who claims to own it, and when it was cut.
struct PendingChallenge {
    /// Hex-encoded nonce, exactly as sent to the client.
    nonce: String,
    /// The address the connection claimed at login. Case-normalized.
    claimed_address: String,
    /// Issuance instant, for TTL enforcement.
    issued_at: Instant,
}

/// Issues and verifies per-connection login challenges.
pub struct ChallengeAuthenticator {
    challenges: DashMap<Uuid, PendingChallenge>,
    scheme: Arc<dyn SignatureScheme>,
    ttl: Duration,
}

impl ChallengeAuthenticator {
    /// Create an authenticator with the default challenge TTL.
    pub fn new(scheme: Arc<dyn SignatureScheme>) -> Self {
        Self::with_ttl(scheme, config::CHALLENGE_TTL)
    }

    /// Create an authenticator with an explicit TTL. Tests use this to
    /// force expiry without waiting five minutes.
    pub fn with_ttl(scheme: Arc<dyn SignatureScheme>, ttl: Duration) -> Self {
        Self {
            challenges: DashMap::new(),
            scheme,
            ttl,
        }
    }

    /// Begin a challenge for a connection claiming `address`.
    ///
    /// Returns the hex-encoded nonce to relay to the client. Fails with
    /// [`AuthError::DuplicateChallenge`] while a live challenge is
    /// outstanding for the same connection; an expired leftover is
    /// silently replaced.
    pub fn begin_challenge(
        &self,
        connection: Uuid,
        address: &str,
    ) -> Result<String, AuthError> {
        if let Some(existing) = self.challenges.get(&connection) {
            if existing.issued_at.elapsed() < self.ttl {
                return Err(AuthError::DuplicateChallenge);
            }
        }

        let mut nonce_bytes = [0u8; config::NONCE_LENGTH];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = hex::encode(nonce_bytes);

        self.challenges.insert(
            connection,
            PendingChallenge {
                nonce: nonce.clone(),
                claimed_address: address.to_lowercase(),
                issued_at: Instant::now(),
            },
        );

        tracing::debug!(%connection, "login challenge issued");
        Ok(nonce)
    }

    /// Verify a signature over the outstanding nonce for `connection`.
    ///
    /// Consumes the challenge regardless of outcome — single use both
    /// ways, so a failed attempt leaves the connection free to start a
    /// fresh `begin_challenge`. On success, returns the verified address
    /// in its normalized lowercase form.
    ///
    /// The signed message is the UTF-8 bytes of the hex nonce string,
    /// exactly as the client received it.
    pub fn verify(&self, connection: Uuid, signature_hex: &str) -> Result<String, AuthError> {
        let (_, challenge) = self
            .challenges
            .remove(&connection)
            .ok_or(AuthError::NoChallenge)?;

        if challenge.issued_at.elapsed() >= self.ttl {
            return Err(AuthError::NoChallenge);
        }

        let signature =
            hex::decode(signature_hex.trim()).map_err(|_| AuthError::SignatureMismatch)?;

        let recovered = self
            .scheme
            .recover(challenge.nonce.as_bytes(), &signature)
            .ok_or(AuthError::SignatureMismatch)?;

        if !recovered.eq_ignore_ascii_case(&challenge.claimed_address) {
            return Err(AuthError::SignatureMismatch);
        }

        tracing::debug!(%connection, address = %challenge.claimed_address, "challenge verified");
        Ok(challenge.claimed_address)
    }

    /// Drop any outstanding challenge for a connection. Called on
    /// connection close; a no-op if nothing is pending.
    pub fn discard(&self, connection: Uuid) {
        self.challenges.remove(&connection);
    }

    /// Number of challenges currently outstanding (including expired
    /// entries not yet swept). Observability only.
    pub fn outstanding(&self) -> usize {
        self.challenges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::scheme::{sign_envelope, Ed25519Recovery};
    use crate::crypto::TavernKeypair;

    fn authenticator() -> ChallengeAuthenticator {
        ChallengeAuthenticator::new(Arc::new(Ed25519Recovery))
    }

    /// Runs the full begin/sign/verify dance for a fresh keypair.
    fn login(auth: &ChallengeAuthenticator, conn: Uuid, kp: &TavernKeypair) -> Result<String, AuthError> {
        let nonce = auth.begin_challenge(conn, &kp.address())?;
        let envelope = sign_envelope(kp, nonce.as_bytes());
        auth.verify(conn, &hex::encode(envelope))
    }

    // -- Happy path ---------------------------------------------------------

    #[test]
    fn full_handshake_succeeds() {
        let auth = authenticator();
        let kp = TavernKeypair::generate();
        let address = login(&auth, Uuid::new_v4(), &kp).unwrap();
        assert_eq!(address, kp.address());
    }

    #[test]
    fn verify_never_returns_a_foreign_address() {
        // Even a valid signature by another key must not flip the bound
        // address — it fails instead.
        let auth = authenticator();
        let claimed = TavernKeypair::generate();
        let signer = TavernKeypair::generate();
        let conn = Uuid::new_v4();

        let nonce = auth.begin_challenge(conn, &claimed.address()).unwrap();
        let envelope = sign_envelope(&signer, nonce.as_bytes());
        let err = auth.verify(conn, &hex::encode(envelope)).unwrap_err();
        assert_eq!(err, AuthError::SignatureMismatch);
    }

    #[test]
    fn claimed_address_comparison_is_case_insensitive() {
        let auth = authenticator();
        let kp = TavernKeypair::generate();
        let conn = Uuid::new_v4();

        let shouty = kp.address().to_uppercase().replace("0X", "0x");
        let nonce = auth.begin_challenge(conn, &shouty).unwrap();
        let envelope = sign_envelope(&kp, nonce.as_bytes());
        let address = auth.verify(conn, &hex::encode(envelope)).unwrap();
        // Output is normalized regardless of how the claim was spelled.
        assert_eq!(address, kp.address());
    }

    // -- Single use ---------------------------------------------------------

    #[test]
    fn nonce_is_single_use() {
        let auth = authenticator();
        let kp = TavernKeypair::generate();
        let conn = Uuid::new_v4();

        let nonce = auth.begin_challenge(conn, &kp.address()).unwrap();
        let sig = hex::encode(sign_envelope(&kp, nonce.as_bytes()));

        assert!(auth.verify(conn, &sig).is_ok());
        // Replay of the very same valid signature: nothing left to prove.
        assert_eq!(auth.verify(conn, &sig).unwrap_err(), AuthError::NoChallenge);
    }

    #[test]
    fn failed_verify_also_consumes_the_challenge() {
        let auth = authenticator();
        let kp = TavernKeypair::generate();
        let conn = Uuid::new_v4();

        auth.begin_challenge(conn, &kp.address()).unwrap();
        assert_eq!(
            auth.verify(conn, "deadbeef").unwrap_err(),
            AuthError::SignatureMismatch
        );
        // The slate is clean: a fresh login can start immediately...
        let nonce = auth.begin_challenge(conn, &kp.address()).unwrap();
        // ...and succeed.
        let envelope = sign_envelope(&kp, nonce.as_bytes());
        assert!(auth.verify(conn, &hex::encode(envelope)).is_ok());
    }

    // -- Duplicate / missing ------------------------------------------------

    #[test]
    fn duplicate_challenge_is_rejected() {
        let auth = authenticator();
        let kp = TavernKeypair::generate();
        let conn = Uuid::new_v4();

        auth.begin_challenge(conn, &kp.address()).unwrap();
        assert_eq!(
            auth.begin_challenge(conn, &kp.address()).unwrap_err(),
            AuthError::DuplicateChallenge
        );
    }

    #[test]
    fn verify_without_challenge_fails() {
        let auth = authenticator();
        assert_eq!(
            auth.verify(Uuid::new_v4(), "deadbeef").unwrap_err(),
            AuthError::NoChallenge
        );
    }

    #[test]
    fn discard_clears_pending_state() {
        let auth = authenticator();
        let kp = TavernKeypair::generate();
        let conn = Uuid::new_v4();

        auth.begin_challenge(conn, &kp.address()).unwrap();
        assert_eq!(auth.outstanding(), 1);
        auth.discard(conn);
        assert_eq!(auth.outstanding(), 0);
        assert_eq!(auth.verify(conn, "00").unwrap_err(), AuthError::NoChallenge);
    }

    // -- TTL ----------------------------------------------------------------

    #[test]
    fn expired_challenge_reads_as_absent() {
        let auth =
            ChallengeAuthenticator::with_ttl(Arc::new(Ed25519Recovery), Duration::ZERO);
        let kp = TavernKeypair::generate();
        let conn = Uuid::new_v4();

        let nonce = auth.begin_challenge(conn, &kp.address()).unwrap();
        let envelope = sign_envelope(&kp, nonce.as_bytes());
        // Valid signature, dead nonce: NoChallenge, not SignatureMismatch.
        assert_eq!(
            auth.verify(conn, &hex::encode(envelope)).unwrap_err(),
            AuthError::NoChallenge
        );
    }

    #[test]
    fn expired_leftover_does_not_block_a_fresh_login() {
        let auth =
            ChallengeAuthenticator::with_ttl(Arc::new(Ed25519Recovery), Duration::ZERO);
        let kp = TavernKeypair::generate();
        let conn = Uuid::new_v4();

        auth.begin_challenge(conn, &kp.address()).unwrap();
        // TTL zero: the leftover is already stale, so no DuplicateChallenge.
        assert!(auth.begin_challenge(conn, &kp.address()).is_ok());
    }

    #[test]
    fn nonces_are_distinct_across_connections() {
        let auth = authenticator();
        let kp = TavernKeypair::generate();
        let a = auth.begin_challenge(Uuid::new_v4(), &kp.address()).unwrap();
        let b = auth.begin_challenge(Uuid::new_v4(), &kp.address()).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), config::NONCE_LENGTH * 2);
    }
}
