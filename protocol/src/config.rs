//! # Protocol Configuration & Constants
//!
//! Every magic number in the tavern lives here. Daily quotas, TTLs, the
//! welcome grant — if a limit matters to the economy, it has a name in
//! this file and a knob on [`EconomyLimits`].
//!
//! The constants are the defaults the original tavern shipped with; the
//! struct exists because a room operator will inevitably want a bigger
//! bar tab without recompiling.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// Length of a login challenge nonce in bytes. 256 bits of OS entropy —
/// twice the 128-bit floor the handshake requires.
pub const NONCE_LENGTH: usize = 32;

/// How long a login challenge stays valid. A wallet prompt that sits
/// unanswered for five minutes is abandoned; the nonce dies with it.
pub const CHALLENGE_TTL: Duration = Duration::from_secs(5 * 60);

/// Credential lifetime. One hour, enforced purely at verification time.
/// There is no revocation list; expiry is the only exit.
pub const CREDENTIAL_TTL: Duration = Duration::from_secs(60 * 60);

// ---------------------------------------------------------------------------
// Economy
// ---------------------------------------------------------------------------

/// Minimum story body length in characters. Shorter than this isn't a
/// story, it's a grunt.
pub const MIN_STORY_CHARS: usize = 20;

/// Maximum stories an account may publish per day.
pub const MAX_PUBLISH: u32 = 3;

/// Maximum random stories an account may fetch per day.
pub const MAX_FETCH: u32 = 3;

/// Maximum whiskey sends per account per day.
pub const MAX_WHISKEY: u32 = 3;

/// One-time whiskey-point grant when an account is first created.
/// This is the only mint in the system; every later movement of points
/// is a zero-sum transfer.
pub const WELCOME_POINTS: u64 = 10;

/// UTC offset (hours) of the reference timezone for the quota calendar.
/// Day rollover happens at midnight in this zone, everywhere at once.
pub const QUOTA_UTC_OFFSET_HOURS: i32 = 0;

// ---------------------------------------------------------------------------
// Networking
// ---------------------------------------------------------------------------

/// Default listen port for the tavern node.
pub const DEFAULT_PORT: u16 = 2567;

/// Crate version, reported by the node binary.
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// Tunable Limits
// ---------------------------------------------------------------------------

/// The tunable subset of the economy rules.
///
/// `Default` reproduces the constants above. Constructed once at startup
/// and injected into the engine — no globals, no statics.
#[derive(Debug, Clone)]
pub struct EconomyLimits {
    /// Minimum story body length in characters.
    pub min_story_chars: usize,
    /// Daily cap on published stories.
    pub max_publish_per_day: u32,
    /// Daily cap on fetched random stories.
    pub max_fetch_per_day: u32,
    /// Daily cap on whiskey sends.
    pub max_whiskey_per_day: u32,
    /// Daily cap on replies. `None` preserves the original unbounded
    /// behavior; set `Some(n)` to close that asymmetry.
    pub max_replies_per_day: Option<u32>,
    /// One-time point grant at account creation.
    pub welcome_points: u64,
}

impl Default for EconomyLimits {
    fn default() -> Self {
        Self {
            min_story_chars: MIN_STORY_CHARS,
            max_publish_per_day: MAX_PUBLISH,
            max_fetch_per_day: MAX_FETCH,
            max_whiskey_per_day: MAX_WHISKEY,
            max_replies_per_day: None,
            welcome_points: WELCOME_POINTS,
        }
    }
}
