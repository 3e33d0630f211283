//! # Wire Messages
//!
//! The JSON contract between a client and the room: internally tagged
//! enums, `"type"` discriminant, camelCase keys. Every client message
//! has a mirror on the server side; failures all travel as one
//! [`ServerMessage::Error`] whose [`ErrorKind`] is the machine-readable
//! half and `message` the human-readable one.
//!
//! Views ([`StoryView`], [`ReplyView`]) are the storage records minus
//! nothing — the records carry no secrets — but kept as separate types
//! so the wire shape can drift without touching the database.

use serde::{Deserialize, Serialize};

use crate::storage::{ReplyRecord, StoryRecord};

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Everything a client can ask of the room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Start the login handshake, claiming an address.
    #[serde(rename_all = "camelCase")]
    UserLogin { address: String },
    /// Answer the challenge with a hex-encoded signature envelope.
    #[serde(rename_all = "camelCase")]
    LoginSignature { signature: String },
    /// Resume with a previously issued credential, skipping the handshake.
    #[serde(rename_all = "camelCase")]
    CredentialLogin { token: String },

    /// Publish a story.
    #[serde(rename_all = "camelCase")]
    PublishStory { title: String, body: String },
    /// Soft-delete one of the caller's own stories.
    #[serde(rename_all = "camelCase")]
    DeleteStory { story_id: u64 },
    /// List the caller's own stories, newest first.
    GetMyStories,
    /// Deal a random story the caller has never seen.
    FetchStory,

    /// Send one whiskey point to a story's author.
    #[serde(rename_all = "camelCase")]
    SendWhiskey { story_id: u64 },
    /// Query the caller's balance.
    GetWhiskeyPoints,
    /// Query today's action counters.
    GetDailyQuota,

    /// Reply to a story; the story's author is the addressee.
    #[serde(rename_all = "camelCase")]
    ReplyStory { story_id: u64, content: String },
    /// Reply in a thread, naming the addressee explicitly.
    #[serde(rename_all = "camelCase")]
    ReplyUser {
        story_id: u64,
        content: String,
        target: String,
    },
    /// Unread replies addressed to the caller.
    GetNewReplies,
    /// Mark replies addressed to the caller as read.
    #[serde(rename_all = "camelCase")]
    MarkRepliesRead { reply_ids: Vec<u64> },
    /// Flip replies addressed to the caller back to unread.
    #[serde(rename_all = "camelCase")]
    MarkRepliesUnread { reply_ids: Vec<u64> },

    /// The caller's liked/received story ids.
    GetLikedStories,
    /// Add a story to the caller's liked set.
    #[serde(rename_all = "camelCase")]
    MarkLiked { story_id: u64 },
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// A story as the wire sees it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoryView {
    pub id: u64,
    pub author: String,
    pub title: String,
    pub body: String,
    pub whiskey_points: u64,
    pub created_at_ms: i64,
    pub deleted: bool,
}

impl From<StoryRecord> for StoryView {
    fn from(record: StoryRecord) -> Self {
        Self {
            id: record.id,
            author: record.author,
            title: record.title,
            body: record.body,
            whiskey_points: record.whiskey_points,
            created_at_ms: record.created_at_ms,
            deleted: record.deleted,
        }
    }
}

/// A reply as the wire sees it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReplyView {
    pub id: u64,
    pub story_id: u64,
    pub author: String,
    pub target: String,
    pub body: String,
    pub created_at_ms: i64,
    pub unread: bool,
}

impl From<ReplyRecord> for ReplyView {
    fn from(record: ReplyRecord) -> Self {
        Self {
            id: record.id,
            story_id: record.story_id,
            author: record.author,
            target: record.target,
            body: record.body,
            created_at_ms: record.created_at_ms,
            unread: record.unread,
        }
    }
}

/// Everything the room can say back. Always addressed to the one
/// connection whose request produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// The login nonce to sign.
    #[serde(rename_all = "camelCase")]
    Challenge { nonce: String },
    /// Authentication succeeded; the credential resumes future sessions.
    #[serde(rename_all = "camelCase")]
    LoginOk {
        address: String,
        credential: String,
        whiskey_points: u64,
    },

    #[serde(rename_all = "camelCase")]
    StoryPublished { story: StoryView },
    #[serde(rename_all = "camelCase")]
    StoryDeleted { story_id: u64 },
    #[serde(rename_all = "camelCase")]
    MyStories { stories: Vec<StoryView> },
    /// The random story dealt by `fetchStory`.
    #[serde(rename_all = "camelCase")]
    StoryDealt { story: StoryView },

    #[serde(rename_all = "camelCase")]
    WhiskeySent {
        story_id: u64,
        recipient: String,
        story_tally: u64,
        balance: u64,
    },
    #[serde(rename_all = "camelCase")]
    WhiskeyPoints { balance: u64 },
    #[serde(rename_all = "camelCase")]
    DailyQuota {
        published: u32,
        received: u32,
        whiskey_sent: u32,
        replies: u32,
    },

    #[serde(rename_all = "camelCase")]
    ReplyPosted { reply: ReplyView },
    #[serde(rename_all = "camelCase")]
    NewReplies { replies: Vec<ReplyView> },
    /// How many replies actually flipped; foreign and unknown ids are
    /// skipped, not errors.
    #[serde(rename_all = "camelCase")]
    RepliesMarked { count: usize },

    #[serde(rename_all = "camelCase")]
    LikedStories { story_ids: Vec<u64> },
    #[serde(rename_all = "camelCase")]
    Liked { story_id: u64 },

    #[serde(rename_all = "camelCase")]
    Error { kind: ErrorKind, message: String },
}

/// Machine-readable failure discriminant.
///
/// Authentication failures are deliberately coarse: a wrong address and
/// a wrong signature both read `authFailed`, so a probing client learns
/// nothing about which half it got right.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Login handshake or credential check failed. Generic on purpose.
    AuthFailed,
    /// An action arrived on a connection that never authenticated.
    Unauthenticated,
    /// The connection's credential expired mid-session; log in again.
    CredentialExpired,

    ContentTooShort,
    EmptyContent,
    DailyLimitReached,
    InsufficientBalance,
    NotOwner,
    AlreadyLiked,
    /// The draw pool is empty — distinct from a quota failure.
    NoStoriesAvailable,
    NotFound,

    /// Something broke below the waterline. Details are in the server
    /// log, not on the wire.
    Internal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_messages_use_the_tagged_camel_case_shape() {
        let msg: ClientMessage =
            serde_json::from_value(json!({ "type": "userLogin", "address": "0xAbC" })).unwrap();
        assert_eq!(msg, ClientMessage::UserLogin { address: "0xAbC".into() });

        let msg: ClientMessage =
            serde_json::from_value(json!({ "type": "sendWhiskey", "storyId": 7 })).unwrap();
        assert_eq!(msg, ClientMessage::SendWhiskey { story_id: 7 });

        // Unit variants carry only the tag.
        let msg: ClientMessage = serde_json::from_value(json!({ "type": "fetchStory" })).unwrap();
        assert_eq!(msg, ClientMessage::FetchStory);
    }

    #[test]
    fn unknown_type_tag_is_a_parse_error() {
        assert!(serde_json::from_value::<ClientMessage>(json!({ "type": "dropTables" })).is_err());
    }

    #[test]
    fn server_error_serializes_kind_in_camel_case() {
        let wire = serde_json::to_value(ServerMessage::Error {
            kind: ErrorKind::NoStoriesAvailable,
            message: "no stories available".into(),
        })
        .unwrap();
        assert_eq!(
            wire,
            json!({
                "type": "error",
                "kind": "noStoriesAvailable",
                "message": "no stories available",
            })
        );
    }

    #[test]
    fn story_view_mirrors_the_record() {
        let record = StoryRecord {
            id: 3,
            author: "0xaa".into(),
            title: "t".into(),
            body: "b".into(),
            whiskey_points: 2,
            created_at_ms: 1000,
            deleted: false,
        };
        let wire = serde_json::to_value(ServerMessage::StoryDealt { story: record.into() }).unwrap();
        assert_eq!(wire["type"], "storyDealt");
        assert_eq!(wire["story"]["whiskeyPoints"], 2);
        assert_eq!(wire["story"]["createdAtMs"], 1000);
    }
}
