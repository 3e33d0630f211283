//! Error types for the story economy.
//!
//! Validation errors are terminal, cause no partial write, and are safe
//! to show verbatim to the acting user — these are "you hit your limit"
//! messages, not internals. The one storage variant wraps everything
//! that went wrong below the economy's waterline.

use thiserror::Error;

use crate::storage::DbError;

/// Which daily ceiling a request ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaAction {
    /// Publishing a story.
    Publish,
    /// Fetching a random story.
    Fetch,
    /// Sending whiskey.
    Whiskey,
    /// Posting a reply (only when a reply cap is configured).
    Reply,
}

impl std::fmt::Display for QuotaAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            QuotaAction::Publish => "publish",
            QuotaAction::Fetch => "fetch",
            QuotaAction::Whiskey => "whiskey",
            QuotaAction::Reply => "reply",
        };
        f.write_str(name)
    }
}

/// Errors from the economy workflows. All terminal; nothing is retried
/// by the engine — retry policy, if any, belongs to callers.
#[derive(Debug, Error)]
pub enum EconomyError {
    /// Story body shorter than the configured minimum.
    #[error("story too short: {actual} chars, minimum {minimum}")]
    ContentTooShort {
        /// Configured minimum length.
        minimum: usize,
        /// What was actually submitted.
        actual: usize,
    },

    /// Reply body was empty.
    #[error("reply content cannot be empty")]
    EmptyContent,

    /// The account's daily ceiling for this action is already spent.
    #[error("daily {action} limit reached ({limit} per day)")]
    DailyLimitReached {
        /// Which action hit its ceiling.
        action: QuotaAction,
        /// The configured ceiling.
        limit: u32,
    },

    /// The sender has no whiskey points left.
    #[error("not enough whiskey points")]
    InsufficientBalance,

    /// Caller tried to delete a story they did not write.
    #[error("this is not your story")]
    NotOwner,

    /// The story was already in the account's liked set. Distinct from
    /// a fresh like so clients can say so.
    #[error("story already liked")]
    AlreadyLiked,

    /// The random-draw pool is exhausted for this account — every
    /// non-deleted story has already been delivered to it. Distinct
    /// from a quota error so clients can present different UX.
    #[error("no stories available")]
    NoStoriesAvailable,

    /// A referenced entity does not exist (or, for stories being
    /// replied to, has been deleted).
    #[error("{kind} {id} not found")]
    NotFound {
        /// Entity kind, e.g. "story".
        kind: &'static str,
        /// The id that failed to resolve.
        id: u64,
    },

    /// A storage operation failed underneath the workflow.
    #[error("storage error: {0}")]
    Storage(#[from] DbError),
}

impl EconomyError {
    /// Story-not-found, the common case.
    pub(crate) fn story_not_found(id: u64) -> Self {
        Self::NotFound { kind: "story", id }
    }
}
