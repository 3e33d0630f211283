//! Error types for session authentication.
//!
//! Deliberately terse. These messages can end up in front of an
//! unauthenticated stranger, so none of them says whether the address or
//! the signature was at fault — that distinction is an enumeration
//! oracle and we don't run one.

use thiserror::Error;

/// Errors from the challenge handshake. Credential checks answer
/// `Option` instead — one `None` for every failure. All variants are
/// terminal; nothing here is retried by the core.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// A challenge is already outstanding for this connection. The
    /// caller must consume or cancel it before starting another.
    #[error("a login challenge is already outstanding")]
    DuplicateChallenge,

    /// No live challenge for this connection — never issued, already
    /// consumed, or past its TTL. All three look identical on purpose.
    #[error("no login challenge found")]
    NoChallenge,

    /// The signature did not prove the claimed address.
    #[error("signature verification failed")]
    SignatureMismatch,
}
