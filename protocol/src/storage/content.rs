//! # ContentGraph — Stories, Replies, and the Seen Set
//!
//! The tavern's content graph has two node kinds: stories, and replies
//! that reference a story plus a target account. Alongside them lives
//! the per-account "seen" set — the story ids an account has already
//! liked or received, kept so the random draw never deals the same
//! story twice.
//!
//! Stories are immutable once published except for two things: the
//! whiskey-point tally goes up, and the author can flip the delete
//! flag. Deleted stories stay on disk (replies may still reference
//! them for display) but leave the draw pool and refuse new replies.
//!
//! Index trees (`story_authors`, `reply_targets`) are maintained in the
//! same transaction as their primary record, so a prefix scan never
//! sees a dangling entry.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::db::{decode, encode, id_from_index_key, id_key, index_key, DbResult, TavernDb};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A published story.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoryRecord {
    /// Monotonic id, unique across stories and replies.
    pub id: u64,
    /// Author's address, lowercase.
    pub author: String,
    /// Title, as submitted.
    pub title: String,
    /// Body, as submitted (already length-validated by the engine).
    pub body: String,
    /// Whiskey points this story has received.
    pub whiskey_points: u64,
    /// Creation time, Unix milliseconds.
    pub created_at_ms: i64,
    /// Author-requested soft delete. Deleted stories leave the draw
    /// pool and refuse new replies.
    pub deleted: bool,
}

/// A reply to a story, addressed to a target account. The target is the
/// story's author for first-level replies and the previous replier when
/// a thread bounces back and forth.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplyRecord {
    /// Monotonic id.
    pub id: u64,
    /// Parent story id. Always an existing, non-deleted story at
    /// creation time.
    pub story_id: u64,
    /// Replier's address, lowercase.
    pub author: String,
    /// Addressee, lowercase.
    pub target: String,
    /// Body text.
    pub body: String,
    /// Creation time, Unix milliseconds.
    pub created_at_ms: i64,
    /// Inbox flag; new replies start unread.
    pub unread: bool,
}

/// Outcome of inserting into the seen set: distinguishable so callers
/// can report a duplicate like without treating it as a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// The id was not in the set and is now.
    Added,
    /// The id was already there; the set is unchanged.
    AlreadyPresent,
}

// ---------------------------------------------------------------------------
// ContentGraph
// ---------------------------------------------------------------------------

/// Store view over the story, reply, index, and seen trees.
#[derive(Debug, Clone)]
pub struct ContentGraph {
    db: TavernDb,
}

impl ContentGraph {
    pub fn new(db: &TavernDb) -> Self {
        Self { db: db.clone() }
    }

    // -- Stories ------------------------------------------------------------

    /// Fetch a story by id.
    pub fn story(&self, id: u64) -> DbResult<Option<StoryRecord>> {
        match self.db.stories.get(id_key(id))? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Build (but do not persist) a fresh story record. The engine
    /// persists it inside the publish transaction.
    pub(crate) fn new_story(&self, author: &str, title: &str, body: &str) -> DbResult<StoryRecord> {
        Ok(StoryRecord {
            id: self.db.generate_id()?,
            author: author.to_lowercase(),
            title: title.to_string(),
            body: body.to_string(),
            whiskey_points: 0,
            created_at_ms: Utc::now().timestamp_millis(),
            deleted: false,
        })
    }

    /// Persist a story mutation (tally bump, delete flag) outside a
    /// multi-tree transaction. Index entries are keyed by id and author,
    /// neither of which changes, so one tree suffices.
    pub(crate) fn put_story(&self, story: &StoryRecord) -> DbResult<()> {
        self.db.stories.insert(id_key(story.id), encode(story)?)?;
        Ok(())
    }

    /// All stories by one author, newest first.
    pub fn stories_by_author(&self, author: &str) -> DbResult<Vec<StoryRecord>> {
        let mut out = Vec::new();
        for entry in self.db.story_authors.scan_prefix(author.to_lowercase().as_bytes()) {
            let (key, _) = entry?;
            if let Some(id) = id_from_index_key(&key) {
                if let Some(story) = self.story(id)? {
                    out.push(story);
                }
            }
        }
        // Prefix scans come back oldest-first; the room shows newest-first.
        out.reverse();
        Ok(out)
    }

    /// Ids of every non-deleted story not in `exclude`. This is the
    /// set-difference form of the random draw: bounded by construction,
    /// no loop-until-miss against the RNG.
    pub fn draw_pool(&self, exclude: &BTreeSet<u64>) -> DbResult<Vec<u64>> {
        let mut pool = Vec::new();
        for entry in self.db.stories.iter() {
            let (_, value) = entry?;
            let story: StoryRecord = decode(&value)?;
            if !story.deleted && !exclude.contains(&story.id) {
                pool.push(story.id);
            }
        }
        Ok(pool)
    }

    // -- Replies ------------------------------------------------------------

    /// Fetch a reply by id.
    pub fn reply(&self, id: u64) -> DbResult<Option<ReplyRecord>> {
        match self.db.replies.get(id_key(id))? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Build (but do not persist) a fresh reply record. The engine
    /// persists it, its index entry, and the reply quota in one
    /// transaction.
    pub(crate) fn new_reply(
        &self,
        story_id: u64,
        author: &str,
        target: &str,
        body: &str,
    ) -> DbResult<ReplyRecord> {
        Ok(ReplyRecord {
            id: self.db.generate_id()?,
            story_id,
            author: author.to_lowercase(),
            target: target.to_lowercase(),
            body: body.to_string(),
            created_at_ms: Utc::now().timestamp_millis(),
            unread: true,
        })
    }

    /// Unread replies addressed to `target`, newest first.
    pub fn unread_replies_for(&self, target: &str) -> DbResult<Vec<ReplyRecord>> {
        let mut out = Vec::new();
        for entry in self.db.reply_targets.scan_prefix(target.to_lowercase().as_bytes()) {
            let (key, _) = entry?;
            if let Some(id) = id_from_index_key(&key) {
                if let Some(reply) = self.reply(id)? {
                    if reply.unread {
                        out.push(reply);
                    }
                }
            }
        }
        out.reverse();
        Ok(out)
    }

    /// Flip the unread flag on a set of replies, touching only those
    /// addressed to `target`. Returns how many actually changed;
    /// unknown and foreign ids are skipped, not errors.
    pub(crate) fn set_replies_unread(
        &self,
        target: &str,
        reply_ids: &[u64],
        unread: bool,
    ) -> DbResult<usize> {
        let target = target.to_lowercase();
        let mut flipped = 0;
        for &id in reply_ids {
            if let Some(mut reply) = self.reply(id)? {
                if reply.target == target && reply.unread != unread {
                    reply.unread = unread;
                    self.db.replies.insert(id_key(id), encode(&reply)?)?;
                    flipped += 1;
                }
            }
        }
        Ok(flipped)
    }

    // -- Seen set -----------------------------------------------------------

    /// The set of story ids `address` has already liked or received.
    pub fn seen_set(&self, address: &str) -> DbResult<BTreeSet<u64>> {
        let value = self.db.seen.get(address.to_lowercase().as_bytes())?;
        Ok(Self::decode_seen(value.as_deref()))
    }

    /// Insert a story id into the seen set, reporting whether it was
    /// fresh. Used by the standalone like path; the fetch path does the
    /// same insertion inside its quota transaction.
    pub(crate) fn mark_seen(&self, address: &str, story_id: u64) -> DbResult<MarkOutcome> {
        let key = address.to_lowercase();
        let mut set = self.seen_set(&key)?;
        if !set.insert(story_id) {
            return Ok(MarkOutcome::AlreadyPresent);
        }
        self.db.seen.insert(key.as_bytes(), Self::encode_seen(&set)?)?;
        Ok(MarkOutcome::Added)
    }

    /// Decode a stored seen set; absent or malformed reads as empty.
    /// The single place where the representation is normalized — the
    /// engine only ever sees a typed set.
    pub(crate) fn decode_seen(bytes: Option<&[u8]>) -> BTreeSet<u64> {
        bytes
            .and_then(|b| decode(b).ok())
            .unwrap_or_default()
    }

    /// Encode a seen set for storage.
    pub(crate) fn encode_seen(set: &BTreeSet<u64>) -> DbResult<Vec<u8>> {
        encode(set)
    }
}
