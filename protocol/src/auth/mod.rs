//! Session authentication: the challenge handshake and bearer credentials.
//!
//! The flow, in order:
//!
//! 1. [`ChallengeAuthenticator::begin_challenge`] — a fresh nonce is bound
//!    to the connection and the claimed address.
//! 2. The wallet signs the nonce; [`ChallengeAuthenticator::verify`]
//!    consumes the challenge and names the proven address, or fails.
//! 3. [`CredentialIssuer::issue`] hands back a signed, time-bounded token
//!    that stands in for repeated signature checks.
//!
//! Nothing here touches durable storage. Challenges are in-memory and die
//! with the connection; credentials are stateless by construction.

pub mod challenge;
pub mod credential;
pub mod error;

pub use challenge::ChallengeAuthenticator;
pub use credential::{CredentialClaims, CredentialIssuer};
pub use error::AuthError;
