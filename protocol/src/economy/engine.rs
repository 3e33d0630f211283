//! # EconomyEngine — The Workflows
//!
//! Orchestrates quota checks, the zero-sum whiskey transfer, and the
//! story/reply mutations. Each workflow reads, checks one invariant,
//! and commits its whole write set in a single sled multi-tree
//! transaction — the check-then-act sequences here are unsafe under
//! concurrent writers otherwise, and nothing stops a deployment from
//! running more than one room over the same database.
//!
//! The engine is the sole writer of the storage leaves. It is also
//! synchronous: sled is an embedded store with sub-millisecond
//! operations, so the room actor calls straight in. Per-room ordering
//! comes from the actor's single loop; cross-room safety comes from the
//! transactions.

use rand::seq::SliceRandom;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::Transactional;

use crate::config::EconomyLimits;
use crate::storage::db::{self, id_key, index_key};
use crate::storage::ledger::{decode_balance, encode_balance};
use crate::storage::{
    AccountRecord, AccountStore, ContentGraph, DailyQuota, DbError, MarkOutcome, PointLedger,
    QuotaStore, ReplyRecord, StoryRecord, TavernDb,
};

use super::error::{EconomyError, QuotaAction};

/// Result of a successful whiskey transfer, for the sender's eyes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhiskeyTransfer {
    /// The story that was toasted.
    pub story_id: u64,
    /// The story's author, who received the point.
    pub recipient: String,
    /// The story's tally after the transfer.
    pub story_tally: u64,
    /// The sender's balance after the transfer.
    pub sender_balance: u64,
}

/// The story economy's one and only writer.
pub struct EconomyEngine {
    db: TavernDb,
    accounts: AccountStore,
    ledger: PointLedger,
    quotas: QuotaStore,
    content: ContentGraph,
    limits: EconomyLimits,
}

impl EconomyEngine {
    /// Build an engine over a database with the given limits and the
    /// default quota timezone.
    pub fn new(db: TavernDb, limits: EconomyLimits) -> Self {
        let quotas = QuotaStore::new(&db);
        Self::assemble(db, limits, quotas)
    }

    /// Build an engine with an explicit quota reference timezone.
    pub fn with_offset(db: TavernDb, limits: EconomyLimits, offset: chrono::FixedOffset) -> Self {
        let quotas = QuotaStore::with_offset(&db, offset);
        Self::assemble(db, limits, quotas)
    }

    fn assemble(db: TavernDb, limits: EconomyLimits, quotas: QuotaStore) -> Self {
        Self {
            accounts: AccountStore::new(&db),
            ledger: PointLedger::new(&db),
            content: ContentGraph::new(&db),
            quotas,
            db,
            limits,
        }
    }

    // -- Accounts -----------------------------------------------------------

    /// Fetch-or-create the account for a freshly authenticated address.
    /// First creation credits the one-time welcome grant — the only
    /// mint in the system.
    pub fn ensure_account(&self, address: &str) -> Result<AccountRecord, EconomyError> {
        let (record, created) = self.accounts.get_or_create(address)?;
        if created {
            let balance = self
                .ledger
                .credit(&record.address, self.limits.welcome_points)?;
            tracing::info!(address = %record.address, balance, "account created, welcome grant credited");
        }
        Ok(record)
    }

    /// Current intimacy score for an address.
    pub fn intimacy(&self, address: &str) -> Result<i64, EconomyError> {
        Ok(self.accounts.intimacy(address)?)
    }

    /// Nudge the intimacy score by a signed delta; returns the new value.
    pub fn adjust_intimacy(&self, address: &str, delta: i64) -> Result<i64, EconomyError> {
        Ok(self.accounts.adjust_intimacy(address, delta)?)
    }

    // -- Queries ------------------------------------------------------------

    /// Current whiskey-point balance.
    pub fn whiskey_points(&self, address: &str) -> Result<u64, EconomyError> {
        Ok(self.ledger.balance(address)?)
    }

    /// Today's action counters for an address.
    pub fn daily_quota(&self, address: &str) -> Result<DailyQuota, EconomyError> {
        Ok(self.quotas.get(address)?)
    }

    /// Sum of every balance in the ledger. Only moves when an account is
    /// created; the audit hook for the zero-sum property.
    pub fn total_points(&self) -> Result<u64, EconomyError> {
        Ok(self.ledger.total_points()?)
    }

    /// The caller's own stories, newest first. Includes deleted ones —
    /// authors can see their whole shelf.
    pub fn my_stories(&self, author: &str) -> Result<Vec<StoryRecord>, EconomyError> {
        Ok(self.content.stories_by_author(author)?)
    }

    /// Story ids the account has liked or received.
    pub fn liked_stories(&self, address: &str) -> Result<Vec<u64>, EconomyError> {
        Ok(self.content.seen_set(address)?.into_iter().collect())
    }

    /// Unread replies addressed to the caller, newest first.
    pub fn unread_replies(&self, address: &str) -> Result<Vec<ReplyRecord>, EconomyError> {
        Ok(self.content.unread_replies_for(address)?)
    }

    // -- Stories ------------------------------------------------------------

    /// Publish a story: length check, daily ceiling, then story + author
    /// index + quota committed as one transaction.
    pub fn publish_story(
        &self,
        author: &str,
        title: &str,
        body: &str,
    ) -> Result<StoryRecord, EconomyError> {
        let actual = body.chars().count();
        if actual < self.limits.min_story_chars {
            return Err(EconomyError::ContentTooShort {
                minimum: self.limits.min_story_chars,
                actual,
            });
        }

        let story = self.content.new_story(author, title, body)?;
        let limit = self.limits.max_publish_per_day;
        let quota_key = self.quotas.key_today(&story.author);
        let story_key = id_key(story.id).to_vec();
        let author_key = index_key(&story.author, story.id);
        let encoded_story = db::encode(&story)?;

        (&self.db.quotas, &self.db.stories, &self.db.story_authors)
            .transaction(|(quotas, stories, authors)| {
                let mut quota =
                    QuotaStore::decode_value(quotas.get(quota_key.as_slice())?.as_deref());
                if quota.published >= limit {
                    return Err(abort(EconomyError::DailyLimitReached {
                        action: QuotaAction::Publish,
                        limit,
                    }));
                }
                quota.published += 1;
                quotas.insert(quota_key.as_slice(), tx_encode(&quota)?)?;
                stories.insert(story_key.as_slice(), encoded_story.as_slice())?;
                authors.insert(author_key.as_slice(), &[] as &[u8])?;
                Ok(())
            })
            .map_err(flatten)?;

        tracing::debug!(author = %story.author, story = story.id, "story published");
        Ok(story)
    }

    /// Mark a story deleted. Author-only; does not reclaim quota.
    /// Idempotent — deleting twice is still your story, still deleted.
    pub fn delete_story(&self, caller: &str, story_id: u64) -> Result<(), EconomyError> {
        let mut story = self
            .content
            .story(story_id)?
            .ok_or_else(|| EconomyError::story_not_found(story_id))?;
        if !story.author.eq_ignore_ascii_case(caller) {
            return Err(EconomyError::NotOwner);
        }
        if !story.deleted {
            story.deleted = true;
            self.content.put_story(&story)?;
            tracing::debug!(author = %story.author, story = story_id, "story deleted");
        }
        Ok(())
    }

    /// Deal a random story the account has never seen.
    ///
    /// The draw is a set difference — every non-deleted story minus the
    /// account's seen set — so termination never depends on the RNG
    /// missing. The quota increment and the seen-set insertion commit
    /// together; a validation failure commits neither.
    pub fn fetch_random_story(&self, account: &str) -> Result<StoryRecord, EconomyError> {
        let account = account.to_lowercase();
        let limit = self.limits.max_fetch_per_day;
        if self.quotas.get(&account)?.received >= limit {
            return Err(EconomyError::DailyLimitReached {
                action: QuotaAction::Fetch,
                limit,
            });
        }

        let seen = self.content.seen_set(&account)?;
        let pool = self.content.draw_pool(&seen)?;
        let story_id = *pool
            .choose(&mut rand::thread_rng())
            .ok_or(EconomyError::NoStoriesAvailable)?;
        let story = self
            .content
            .story(story_id)?
            .ok_or_else(|| EconomyError::story_not_found(story_id))?;

        let quota_key = self.quotas.key_today(&account);
        let seen_key = account.into_bytes();

        (&self.db.quotas, &self.db.seen)
            .transaction(|(quotas, seen_tree)| {
                let mut quota =
                    QuotaStore::decode_value(quotas.get(quota_key.as_slice())?.as_deref());
                if quota.received >= limit {
                    return Err(abort(EconomyError::DailyLimitReached {
                        action: QuotaAction::Fetch,
                        limit,
                    }));
                }
                quota.received += 1;

                // The draw already excluded seen ids; the insert is
                // idempotent if another room raced us on this account.
                let mut set =
                    ContentGraph::decode_seen(seen_tree.get(seen_key.as_slice())?.as_deref());
                set.insert(story_id);

                quotas.insert(quota_key.as_slice(), tx_encode(&quota)?)?;
                let encoded_set =
                    ContentGraph::encode_seen(&set).map_err(|e| abort(e.into()))?;
                seen_tree.insert(seen_key.as_slice(), encoded_set)?;
                Ok(())
            })
            .map_err(flatten)?;

        Ok(story)
    }

    // -- Whiskey ------------------------------------------------------------

    /// Transfer one whiskey point from the caller to a story's author.
    ///
    /// Strictly zero-sum: debit, credit, tally, and quota commit in one
    /// transaction or not at all. The ledger total is identical before
    /// and after every successful call.
    pub fn send_whiskey(
        &self,
        from: &str,
        story_id: u64,
    ) -> Result<WhiskeyTransfer, EconomyError> {
        let sender = from.to_lowercase();
        let story = self
            .content
            .story(story_id)?
            .ok_or_else(|| EconomyError::story_not_found(story_id))?;
        let recipient = story.author.clone();
        let limit = self.limits.max_whiskey_per_day;

        let quota_key = self.quotas.key_today(&sender);
        let story_key = id_key(story_id).to_vec();
        let sender_key = sender.clone().into_bytes();
        let recipient_key = recipient.clone().into_bytes();

        let (story_tally, sender_balance) =
            (&self.db.quotas, &self.db.balances, &self.db.stories)
                .transaction(|(quotas, balances, stories)| {
                    let mut quota =
                        QuotaStore::decode_value(quotas.get(quota_key.as_slice())?.as_deref());
                    if quota.whiskey_sent >= limit {
                        return Err(abort(EconomyError::DailyLimitReached {
                            action: QuotaAction::Whiskey,
                            limit,
                        }));
                    }

                    let sender_balance =
                        decode_balance(balances.get(sender_key.as_slice())?.as_deref());
                    if sender_balance == 0 {
                        return Err(abort(EconomyError::InsufficientBalance));
                    }

                    let story_bytes = stories
                        .get(story_key.as_slice())?
                        .ok_or_else(|| abort(EconomyError::story_not_found(story_id)))?;
                    let mut story: StoryRecord =
                        db::decode(&story_bytes).map_err(|e| abort(e.into()))?;

                    // Debit before reading the recipient: transactional
                    // reads see earlier writes, so a self-toast nets to
                    // zero instead of minting a point.
                    balances.insert(
                        sender_key.as_slice(),
                        encode_balance(sender_balance - 1).to_vec(),
                    )?;
                    let recipient_balance =
                        decode_balance(balances.get(recipient_key.as_slice())?.as_deref());
                    balances.insert(
                        recipient_key.as_slice(),
                        encode_balance(recipient_balance.saturating_add(1)).to_vec(),
                    )?;

                    story.whiskey_points += 1;
                    stories.insert(story_key.as_slice(), tx_encode(&story)?)?;

                    quota.whiskey_sent += 1;
                    quotas.insert(quota_key.as_slice(), tx_encode(&quota)?)?;

                    let final_balance =
                        decode_balance(balances.get(sender_key.as_slice())?.as_deref());
                    Ok((story.whiskey_points, final_balance))
                })
                .map_err(flatten)?;

        tracing::debug!(from = %sender, to = %recipient, story = story_id, "whiskey sent");
        Ok(WhiskeyTransfer {
            story_id,
            recipient,
            story_tally,
            sender_balance,
        })
    }

    // -- Replies ------------------------------------------------------------

    /// Reply to a story; the target is the story's author.
    pub fn reply_to_story(
        &self,
        author: &str,
        story_id: u64,
        body: &str,
    ) -> Result<ReplyRecord, EconomyError> {
        let story = self.replyable_story(story_id)?;
        let target = story.author.clone();
        self.post_reply(author, &story, body, &target)
    }

    /// Reply in an ongoing thread; the caller names the target account.
    pub fn reply_to_user(
        &self,
        author: &str,
        story_id: u64,
        body: &str,
        target: &str,
    ) -> Result<ReplyRecord, EconomyError> {
        let story = self.replyable_story(story_id)?;
        self.post_reply(author, &story, body, target)
    }

    /// Flip replies addressed to the caller to read. Returns the count
    /// actually flipped; foreign and unknown ids are skipped.
    pub fn mark_replies_read(
        &self,
        caller: &str,
        reply_ids: &[u64],
    ) -> Result<usize, EconomyError> {
        Ok(self.content.set_replies_unread(caller, reply_ids, false)?)
    }

    /// Flip replies addressed to the caller back to unread.
    pub fn mark_replies_unread(
        &self,
        caller: &str,
        reply_ids: &[u64],
    ) -> Result<usize, EconomyError> {
        Ok(self.content.set_replies_unread(caller, reply_ids, true)?)
    }

    /// A story that can take replies: exists and not deleted.
    fn replyable_story(&self, story_id: u64) -> Result<StoryRecord, EconomyError> {
        let story = self
            .content
            .story(story_id)?
            .ok_or_else(|| EconomyError::story_not_found(story_id))?;
        if story.deleted {
            return Err(EconomyError::story_not_found(story_id));
        }
        Ok(story)
    }

    fn post_reply(
        &self,
        author: &str,
        story: &StoryRecord,
        body: &str,
        target: &str,
    ) -> Result<ReplyRecord, EconomyError> {
        if body.trim().is_empty() {
            return Err(EconomyError::EmptyContent);
        }

        let reply = self.content.new_reply(story.id, author, target, body)?;
        let cap = self.limits.max_replies_per_day;
        let quota_key = self.quotas.key_today(&reply.author);
        let reply_key = id_key(reply.id).to_vec();
        let target_key = index_key(&reply.target, reply.id);
        let encoded_reply = db::encode(&reply)?;

        (&self.db.quotas, &self.db.replies, &self.db.reply_targets)
            .transaction(|(quotas, replies, targets)| {
                let mut quota =
                    QuotaStore::decode_value(quotas.get(quota_key.as_slice())?.as_deref());
                if let Some(limit) = cap {
                    if quota.replies >= limit {
                        return Err(abort(EconomyError::DailyLimitReached {
                            action: QuotaAction::Reply,
                            limit,
                        }));
                    }
                }
                // Counted even when uncapped, so enabling a cap later
                // starts from honest numbers.
                quota.replies += 1;
                quotas.insert(quota_key.as_slice(), tx_encode(&quota)?)?;
                replies.insert(reply_key.as_slice(), encoded_reply.as_slice())?;
                targets.insert(target_key.as_slice(), &[] as &[u8])?;
                Ok(())
            })
            .map_err(flatten)?;

        tracing::debug!(author = %reply.author, target = %reply.target, story = story.id, "reply posted");
        Ok(reply)
    }

    // -- Likes --------------------------------------------------------------

    /// Add a story to the caller's liked set. The second like of the
    /// same story reports `AlreadyLiked` and changes nothing.
    pub fn mark_liked(&self, account: &str, story_id: u64) -> Result<(), EconomyError> {
        self.content
            .story(story_id)?
            .ok_or_else(|| EconomyError::story_not_found(story_id))?;
        match self.content.mark_seen(account, story_id)? {
            MarkOutcome::Added => Ok(()),
            MarkOutcome::AlreadyPresent => Err(EconomyError::AlreadyLiked),
        }
    }
}

// ---------------------------------------------------------------------------
// Transaction plumbing
// ---------------------------------------------------------------------------

type TxError = ConflictableTransactionError<EconomyError>;

/// Abort a transaction with a terminal economy error.
fn abort(err: EconomyError) -> TxError {
    ConflictableTransactionError::Abort(err)
}

/// Encode a record inside a transaction closure.
fn tx_encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, TxError> {
    db::encode(value).map_err(|e| abort(e.into()))
}

/// Collapse sled's transaction error into the workflow error.
fn flatten(err: TransactionError<EconomyError>) -> EconomyError {
    match err {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => EconomyError::Storage(DbError::Sled(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    const ALICE: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const BOB: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
    const BODY: &str = "a story long enough to clear the minimum bar";

    fn engine() -> EconomyEngine {
        EconomyEngine::new(TavernDb::open_temporary().unwrap(), EconomyLimits::default())
    }

    fn engine_with(limits: EconomyLimits) -> EconomyEngine {
        EconomyEngine::new(TavernDb::open_temporary().unwrap(), limits)
    }

    // -- Accounts & welcome grant -------------------------------------------

    #[test]
    fn welcome_grant_is_credited_exactly_once() {
        let engine = engine();
        engine.ensure_account(ALICE).unwrap();
        assert_eq!(engine.whiskey_points(ALICE).unwrap(), 10);
        // Logging in again does not re-mint.
        engine.ensure_account(ALICE).unwrap();
        engine.ensure_account(&ALICE.to_uppercase().replace("0X", "0x")).unwrap();
        assert_eq!(engine.whiskey_points(ALICE).unwrap(), 10);
    }

    #[test]
    fn intimacy_adjusts_in_deltas() {
        let engine = engine();
        engine.ensure_account(ALICE).unwrap();
        assert_eq!(engine.adjust_intimacy(ALICE, 3).unwrap(), 3);
        assert_eq!(engine.adjust_intimacy(ALICE, -1).unwrap(), 2);
        assert_eq!(engine.intimacy(ALICE).unwrap(), 2);
    }

    // -- Publish ------------------------------------------------------------

    #[test]
    fn publish_three_then_limit() {
        let engine = engine();
        engine.ensure_account(ALICE).unwrap();

        for expected in 1..=3u32 {
            engine.publish_story(ALICE, "night tales", BODY).unwrap();
            assert_eq!(engine.daily_quota(ALICE).unwrap().published, expected);
        }

        let err = engine.publish_story(ALICE, "one too many", BODY).unwrap_err();
        assert!(matches!(
            err,
            EconomyError::DailyLimitReached { action: QuotaAction::Publish, limit: 3 }
        ));
        // The rejected story was never stored and the counter held.
        assert_eq!(engine.my_stories(ALICE).unwrap().len(), 3);
        assert_eq!(engine.daily_quota(ALICE).unwrap().published, 3);
    }

    #[test]
    fn short_story_is_rejected_without_touching_quota() {
        let engine = engine();
        let err = engine.publish_story(ALICE, "title", "too short").unwrap_err();
        assert!(matches!(err, EconomyError::ContentTooShort { minimum: 20, .. }));
        assert_eq!(engine.daily_quota(ALICE).unwrap().published, 0);
        assert!(engine.my_stories(ALICE).unwrap().is_empty());
    }

    // -- Delete -------------------------------------------------------------

    #[test]
    fn only_the_author_deletes() {
        let engine = engine();
        let story = engine.publish_story(ALICE, "mine", BODY).unwrap();

        assert!(matches!(
            engine.delete_story(BOB, story.id).unwrap_err(),
            EconomyError::NotOwner
        ));
        engine.delete_story(ALICE, story.id).unwrap();
        // Idempotent, and quota is not reclaimed.
        engine.delete_story(ALICE, story.id).unwrap();
        assert_eq!(engine.daily_quota(ALICE).unwrap().published, 1);
    }

    #[test]
    fn delete_unknown_story_is_not_found() {
        assert!(matches!(
            engine().delete_story(ALICE, 404).unwrap_err(),
            EconomyError::NotFound { kind: "story", id: 404 }
        ));
    }

    // -- Fetch --------------------------------------------------------------

    #[test]
    fn fetch_never_deals_the_same_story_twice() {
        let mut limits = EconomyLimits::default();
        limits.max_publish_per_day = 10;
        limits.max_fetch_per_day = 10;
        let engine = engine_with(limits);

        for i in 0..4 {
            engine.publish_story(BOB, &format!("tale {i}"), BODY).unwrap();
        }

        let mut dealt = BTreeSet::new();
        for _ in 0..4 {
            let story = engine.fetch_random_story(ALICE).unwrap();
            assert!(dealt.insert(story.id), "story {} dealt twice", story.id);
            assert!(!story.deleted);
        }
        // Pool exhausted: distinguishable from a quota failure.
        assert!(matches!(
            engine.fetch_random_story(ALICE).unwrap_err(),
            EconomyError::NoStoriesAvailable
        ));
        assert_eq!(engine.daily_quota(ALICE).unwrap().received, 4);
    }

    #[test]
    fn fetch_respects_the_daily_ceiling() {
        let engine = engine();
        for i in 0..5 {
            // Different authors so publish quota never interferes.
            let author = format!("0x{:040x}", i + 100);
            engine.publish_story(&author, "tale", BODY).unwrap();
        }

        for _ in 0..3 {
            engine.fetch_random_story(ALICE).unwrap();
        }
        assert!(matches!(
            engine.fetch_random_story(ALICE).unwrap_err(),
            EconomyError::DailyLimitReached { action: QuotaAction::Fetch, limit: 3 }
        ));
        // Counter capped, seen set did not grow past the ceiling.
        assert_eq!(engine.daily_quota(ALICE).unwrap().received, 3);
        assert_eq!(engine.liked_stories(ALICE).unwrap().len(), 3);
    }

    #[test]
    fn fetch_skips_deleted_stories() {
        let engine = engine();
        let keep = engine.publish_story(BOB, "keep", BODY).unwrap();
        let gone = engine.publish_story(BOB, "gone", BODY).unwrap();
        engine.delete_story(BOB, gone.id).unwrap();

        let story = engine.fetch_random_story(ALICE).unwrap();
        assert_eq!(story.id, keep.id);
    }

    #[test]
    fn fetch_with_no_stories_is_exhaustion() {
        assert!(matches!(
            engine().fetch_random_story(ALICE).unwrap_err(),
            EconomyError::NoStoriesAvailable
        ));
    }

    // -- Whiskey ------------------------------------------------------------

    #[test]
    fn whiskey_transfer_is_zero_sum() {
        let engine = engine();
        engine.ensure_account(ALICE).unwrap();
        engine.ensure_account(BOB).unwrap();
        let story = engine.publish_story(BOB, "toastworthy", BODY).unwrap();

        let total_before = engine.total_points().unwrap();
        let transfer = engine.send_whiskey(ALICE, story.id).unwrap();

        assert_eq!(transfer.recipient, BOB);
        assert_eq!(transfer.story_tally, 1);
        assert_eq!(transfer.sender_balance, 9);
        assert_eq!(engine.whiskey_points(ALICE).unwrap(), 9);
        assert_eq!(engine.whiskey_points(BOB).unwrap(), 11);
        assert_eq!(engine.total_points().unwrap(), total_before);
    }

    #[test]
    fn broke_sender_is_rejected_with_no_partial_write() {
        let mut limits = EconomyLimits::default();
        limits.welcome_points = 1;
        limits.max_whiskey_per_day = 10;
        let engine = engine_with(limits);
        engine.ensure_account(ALICE).unwrap();
        engine.ensure_account(BOB).unwrap();
        let story = engine.publish_story(BOB, "tale", BODY).unwrap();

        engine.send_whiskey(ALICE, story.id).unwrap();
        assert_eq!(engine.whiskey_points(ALICE).unwrap(), 0);

        let err = engine.send_whiskey(ALICE, story.id).unwrap_err();
        assert!(matches!(err, EconomyError::InsufficientBalance));
        // Balances, tally, and quota all unchanged from after the first send.
        assert_eq!(engine.whiskey_points(ALICE).unwrap(), 0);
        assert_eq!(engine.whiskey_points(BOB).unwrap(), 2);
        assert_eq!(engine.daily_quota(ALICE).unwrap().whiskey_sent, 1);
    }

    #[test]
    fn whiskey_daily_ceiling_blocks_the_fourth_send() {
        let engine = engine();
        engine.ensure_account(ALICE).unwrap();
        engine.ensure_account(BOB).unwrap();
        let story = engine.publish_story(BOB, "tale", BODY).unwrap();

        for _ in 0..3 {
            engine.send_whiskey(ALICE, story.id).unwrap();
        }
        assert!(matches!(
            engine.send_whiskey(ALICE, story.id).unwrap_err(),
            EconomyError::DailyLimitReached { action: QuotaAction::Whiskey, limit: 3 }
        ));
        assert_eq!(engine.whiskey_points(ALICE).unwrap(), 7);
        assert_eq!(engine.whiskey_points(BOB).unwrap(), 13);
    }

    #[test]
    fn self_toast_conserves_the_total() {
        let engine = engine();
        engine.ensure_account(ALICE).unwrap();
        let story = engine.publish_story(ALICE, "self regard", BODY).unwrap();

        let transfer = engine.send_whiskey(ALICE, story.id).unwrap();
        assert_eq!(transfer.sender_balance, 10);
        assert_eq!(engine.whiskey_points(ALICE).unwrap(), 10);
        assert_eq!(transfer.story_tally, 1);
    }

    #[test]
    fn whiskey_to_unknown_story_is_not_found() {
        let engine = engine();
        engine.ensure_account(ALICE).unwrap();
        assert!(matches!(
            engine.send_whiskey(ALICE, 404).unwrap_err(),
            EconomyError::NotFound { .. }
        ));
    }

    // -- Replies ------------------------------------------------------------

    #[test]
    fn reply_targets_the_story_author() {
        let engine = engine();
        let story = engine.publish_story(BOB, "tale", BODY).unwrap();

        let reply = engine.reply_to_story(ALICE, story.id, "loved it").unwrap();
        assert_eq!(reply.target, BOB);
        assert_eq!(reply.story_id, story.id);

        let inbox = engine.unread_replies(BOB).unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].id, reply.id);
    }

    #[test]
    fn threaded_reply_targets_the_named_account() {
        let engine = engine();
        let story = engine.publish_story(BOB, "tale", BODY).unwrap();
        engine.reply_to_story(ALICE, story.id, "first").unwrap();

        // Bob answers Alice on his own story.
        let back = engine
            .reply_to_user(BOB, story.id, "thanks", ALICE)
            .unwrap();
        assert_eq!(back.target, ALICE);
        assert_eq!(engine.unread_replies(ALICE).unwrap().len(), 1);
    }

    #[test]
    fn empty_reply_is_rejected() {
        let engine = engine();
        let story = engine.publish_story(BOB, "tale", BODY).unwrap();
        assert!(matches!(
            engine.reply_to_story(ALICE, story.id, "   ").unwrap_err(),
            EconomyError::EmptyContent
        ));
        assert!(engine.unread_replies(BOB).unwrap().is_empty());
    }

    #[test]
    fn reply_to_deleted_story_is_not_found() {
        let engine = engine();
        let story = engine.publish_story(BOB, "tale", BODY).unwrap();
        engine.delete_story(BOB, story.id).unwrap();
        assert!(matches!(
            engine.reply_to_story(ALICE, story.id, "too late").unwrap_err(),
            EconomyError::NotFound { .. }
        ));
    }

    #[test]
    fn replies_are_unbounded_by_default_but_cappable() {
        let engine = engine();
        let story = engine.publish_story(BOB, "tale", BODY).unwrap();
        for i in 0..10 {
            engine.reply_to_story(ALICE, story.id, &format!("reply {i}")).unwrap();
        }
        assert_eq!(engine.daily_quota(ALICE).unwrap().replies, 10);

        let mut limits = EconomyLimits::default();
        limits.max_replies_per_day = Some(2);
        let capped = engine_with(limits);
        let story = capped.publish_story(BOB, "tale", BODY).unwrap();
        capped.reply_to_story(ALICE, story.id, "one").unwrap();
        capped.reply_to_story(ALICE, story.id, "two").unwrap();
        assert!(matches!(
            capped.reply_to_story(ALICE, story.id, "three").unwrap_err(),
            EconomyError::DailyLimitReached { action: QuotaAction::Reply, limit: 2 }
        ));
    }

    #[test]
    fn mark_read_flips_only_owned_replies() {
        let engine = engine();
        let story = engine.publish_story(BOB, "tale", BODY).unwrap();
        let reply = engine.reply_to_story(ALICE, story.id, "hello").unwrap();

        // Alice cannot read Bob's mail.
        assert_eq!(engine.mark_replies_read(ALICE, &[reply.id]).unwrap(), 0);
        assert_eq!(engine.mark_replies_read(BOB, &[reply.id]).unwrap(), 1);
        assert!(engine.unread_replies(BOB).unwrap().is_empty());

        assert_eq!(engine.mark_replies_unread(BOB, &[reply.id]).unwrap(), 1);
        assert_eq!(engine.unread_replies(BOB).unwrap().len(), 1);
    }

    // -- Likes --------------------------------------------------------------

    #[test]
    fn second_like_reports_already_liked() {
        let engine = engine();
        let story = engine.publish_story(BOB, "tale", BODY).unwrap();

        engine.mark_liked(ALICE, story.id).unwrap();
        assert!(matches!(
            engine.mark_liked(ALICE, story.id).unwrap_err(),
            EconomyError::AlreadyLiked
        ));
        assert_eq!(engine.liked_stories(ALICE).unwrap(), vec![story.id]);
    }

    #[test]
    fn like_of_unknown_story_is_not_found() {
        assert!(matches!(
            engine().mark_liked(ALICE, 404).unwrap_err(),
            EconomyError::NotFound { .. }
        ));
    }

    #[test]
    fn fetched_stories_count_as_liked() {
        let engine = engine();
        let story = engine.publish_story(BOB, "tale", BODY).unwrap();
        let fetched = engine.fetch_random_story(ALICE).unwrap();
        assert_eq!(fetched.id, story.id);
        assert!(matches!(
            engine.mark_liked(ALICE, story.id).unwrap_err(),
            EconomyError::AlreadyLiked
        ));
    }
}
