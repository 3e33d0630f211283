//! # SessionActor — The Room
//!
//! One tokio task owns every connection in the room. Events arrive on a
//! single mpsc channel (`Joined`, `Message`, `Left`) and are processed
//! strictly in order, which is what makes the economy's check-then-act
//! sequences safe without locks: within a room there is never a second
//! actor mid-flight.
//!
//! The acting address always comes from the connection's phase, never
//! from a message payload — a client cannot act as anyone it has not
//! proven. Replies go only to the originating connection's outbox.
//!
//! ## Connection lifecycle
//!
//! ```text
//! Unauthenticated --userLogin--> Challenged --loginSignature--> Authenticated
//!        ^                                                          |
//!        +---- credential expiry / failed login -------------------+
//! ```
//!
//! `credentialLogin` shortcuts straight to `Authenticated` when the
//! token checks out. A failed login of either kind reports one generic
//! `authFailed` — which half was wrong stays private.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::auth::{ChallengeAuthenticator, CredentialIssuer};
use crate::economy::{EconomyEngine, EconomyError};

use super::message::{ClientMessage, ErrorKind, ServerMessage};

// ---------------------------------------------------------------------------
// Events & handle
// ---------------------------------------------------------------------------

/// What the gateway feeds the room.
pub enum SessionEvent {
    /// A socket connected; `outbox` is where its replies go.
    Joined {
        connection: Uuid,
        outbox: mpsc::UnboundedSender<ServerMessage>,
    },
    /// A parsed client message.
    Message {
        connection: Uuid,
        message: ClientMessage,
    },
    /// The socket closed.
    Left { connection: Uuid },
}

/// Cloneable sender half used by the gateway. Sends report `false` once
/// the actor has shut down.
#[derive(Clone)]
pub struct SessionHandle {
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionHandle {
    pub fn join(&self, connection: Uuid, outbox: mpsc::UnboundedSender<ServerMessage>) -> bool {
        self.events
            .send(SessionEvent::Joined { connection, outbox })
            .is_ok()
    }

    pub fn message(&self, connection: Uuid, message: ClientMessage) -> bool {
        self.events
            .send(SessionEvent::Message {
                connection,
                message,
            })
            .is_ok()
    }

    pub fn leave(&self, connection: Uuid) -> bool {
        self.events.send(SessionEvent::Left { connection }).is_ok()
    }
}

// ---------------------------------------------------------------------------
// Connection state
// ---------------------------------------------------------------------------

/// Where a connection stands in the login flow.
enum Phase {
    Unauthenticated,
    /// A challenge is outstanding; the authenticator holds the nonce.
    Challenged,
    Authenticated {
        /// The proven address, lowercase.
        address: String,
        /// When the credential backing this session dies. Checked on
        /// every action, not just at login.
        expires_at_ms: i64,
    },
}

struct Connection {
    outbox: mpsc::UnboundedSender<ServerMessage>,
    phase: Phase,
}

// ---------------------------------------------------------------------------
// SessionActor
// ---------------------------------------------------------------------------

/// The single-task room loop.
pub struct SessionActor {
    engine: EconomyEngine,
    authenticator: ChallengeAuthenticator,
    issuer: CredentialIssuer,
    connections: HashMap<Uuid, Connection>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
}

impl SessionActor {
    /// Wire up an actor and the handle that feeds it. The caller decides
    /// where `run` executes.
    pub fn new(
        engine: EconomyEngine,
        authenticator: ChallengeAuthenticator,
        issuer: CredentialIssuer,
    ) -> (Self, SessionHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = Self {
            engine,
            authenticator,
            issuer,
            connections: HashMap::new(),
            events: rx,
        };
        (actor, SessionHandle { events: tx })
    }

    /// Spawn the actor onto the current runtime and return its handle.
    pub fn spawn(
        engine: EconomyEngine,
        authenticator: ChallengeAuthenticator,
        issuer: CredentialIssuer,
    ) -> SessionHandle {
        let (actor, handle) = Self::new(engine, authenticator, issuer);
        tokio::spawn(actor.run());
        handle
    }

    /// Process events until every handle is dropped.
    pub async fn run(mut self) {
        tracing::info!("session actor started");
        while let Some(event) = self.events.recv().await {
            match event {
                SessionEvent::Joined { connection, outbox } => {
                    tracing::debug!(%connection, "connection joined");
                    self.connections.insert(
                        connection,
                        Connection {
                            outbox,
                            phase: Phase::Unauthenticated,
                        },
                    );
                }
                SessionEvent::Message {
                    connection,
                    message,
                } => {
                    if let Some(reply) = self.on_message(connection, message) {
                        self.send(connection, reply);
                    }
                }
                SessionEvent::Left { connection } => {
                    tracing::debug!(%connection, "connection left");
                    self.authenticator.discard(connection);
                    self.connections.remove(&connection);
                }
            }
        }
        tracing::info!("session actor stopped");
    }

    // -- Dispatch -----------------------------------------------------------

    fn on_message(&mut self, connection: Uuid, message: ClientMessage) -> Option<ServerMessage> {
        if !self.connections.contains_key(&connection) {
            // A message racing its own Left event; nowhere to reply to.
            return None;
        }
        match message {
            ClientMessage::UserLogin { address } => Some(self.begin_login(connection, &address)),
            ClientMessage::LoginSignature { signature } => {
                Some(self.finish_login(connection, &signature))
            }
            ClientMessage::CredentialLogin { token } => {
                Some(self.credential_login(connection, &token))
            }
            other => self.authenticated_action(connection, other),
        }
    }

    // -- Login --------------------------------------------------------------

    fn begin_login(&mut self, connection: Uuid, address: &str) -> ServerMessage {
        match self.authenticator.begin_challenge(connection, address) {
            Ok(nonce) => {
                self.set_phase(connection, Phase::Challenged);
                ServerMessage::Challenge { nonce }
            }
            Err(err) => {
                tracing::debug!(%connection, error = %err, "login rejected");
                auth_failed()
            }
        }
    }

    fn finish_login(&mut self, connection: Uuid, signature: &str) -> ServerMessage {
        match self.authenticator.verify(connection, signature) {
            Ok(address) => {
                let token = self.issuer.issue(&address);
                match self.issuer.claims(&token) {
                    Some(claims) => self.grant_session(connection, token, claims),
                    // Issuer configured with a zero/negative TTL.
                    None => auth_failed(),
                }
            }
            Err(err) => {
                tracing::debug!(%connection, error = %err, "signature verification failed");
                self.set_phase(connection, Phase::Unauthenticated);
                auth_failed()
            }
        }
    }

    fn credential_login(&mut self, connection: Uuid, token: &str) -> ServerMessage {
        match self.issuer.claims(token) {
            Some(claims) => self.grant_session(connection, token.to_string(), claims),
            None => {
                tracing::debug!(%connection, "credential rejected");
                auth_failed()
            }
        }
    }

    /// Shared tail of both login paths: bootstrap the account, move the
    /// connection to `Authenticated`, report the balance.
    fn grant_session(
        &mut self,
        connection: Uuid,
        credential: String,
        claims: crate::auth::CredentialClaims,
    ) -> ServerMessage {
        let account = match self.engine.ensure_account(&claims.address) {
            Ok(account) => account,
            Err(err) => return internal_error(&err),
        };
        let balance = match self.engine.whiskey_points(&account.address) {
            Ok(balance) => balance,
            Err(err) => return internal_error(&err),
        };
        tracing::info!(%connection, address = %account.address, "session authenticated");
        self.set_phase(
            connection,
            Phase::Authenticated {
                address: account.address.clone(),
                expires_at_ms: claims.expires_at_ms,
            },
        );
        ServerMessage::LoginOk {
            address: account.address,
            credential,
            whiskey_points: balance,
        }
    }

    // -- Actions ------------------------------------------------------------

    fn authenticated_action(
        &mut self,
        connection: Uuid,
        message: ClientMessage,
    ) -> Option<ServerMessage> {
        let conn = self.connections.get_mut(&connection)?;
        let address = match &conn.phase {
            Phase::Authenticated {
                address,
                expires_at_ms,
            } => {
                if Utc::now().timestamp_millis() >= *expires_at_ms {
                    conn.phase = Phase::Unauthenticated;
                    tracing::debug!(%connection, "credential expired mid-session");
                    return Some(wire_error(
                        ErrorKind::CredentialExpired,
                        "credential expired, log in again",
                    ));
                }
                address.clone()
            }
            _ => {
                return Some(wire_error(ErrorKind::Unauthenticated, "log in first"));
            }
        };
        Some(self.perform(&address, message))
    }

    /// Run one authenticated action against the engine. `address` is the
    /// connection's proven identity; payloads never name the actor.
    fn perform(&self, address: &str, message: ClientMessage) -> ServerMessage {
        let result = match message {
            ClientMessage::PublishStory { title, body } => self
                .engine
                .publish_story(address, &title, &body)
                .map(|story| ServerMessage::StoryPublished {
                    story: story.into(),
                }),
            ClientMessage::DeleteStory { story_id } => self
                .engine
                .delete_story(address, story_id)
                .map(|_| ServerMessage::StoryDeleted { story_id }),
            ClientMessage::GetMyStories => {
                self.engine.my_stories(address).map(|stories| {
                    ServerMessage::MyStories {
                        stories: stories.into_iter().map(Into::into).collect(),
                    }
                })
            }
            ClientMessage::FetchStory => self
                .engine
                .fetch_random_story(address)
                .map(|story| ServerMessage::StoryDealt {
                    story: story.into(),
                }),
            ClientMessage::SendWhiskey { story_id } => {
                self.engine
                    .send_whiskey(address, story_id)
                    .map(|transfer| ServerMessage::WhiskeySent {
                        story_id: transfer.story_id,
                        recipient: transfer.recipient,
                        story_tally: transfer.story_tally,
                        balance: transfer.sender_balance,
                    })
            }
            ClientMessage::GetWhiskeyPoints => self
                .engine
                .whiskey_points(address)
                .map(|balance| ServerMessage::WhiskeyPoints { balance }),
            ClientMessage::GetDailyQuota => {
                self.engine
                    .daily_quota(address)
                    .map(|quota| ServerMessage::DailyQuota {
                        published: quota.published,
                        received: quota.received,
                        whiskey_sent: quota.whiskey_sent,
                        replies: quota.replies,
                    })
            }
            ClientMessage::ReplyStory { story_id, content } => self
                .engine
                .reply_to_story(address, story_id, &content)
                .map(|reply| ServerMessage::ReplyPosted {
                    reply: reply.into(),
                }),
            ClientMessage::ReplyUser {
                story_id,
                content,
                target,
            } => self
                .engine
                .reply_to_user(address, story_id, &content, &target)
                .map(|reply| ServerMessage::ReplyPosted {
                    reply: reply.into(),
                }),
            ClientMessage::GetNewReplies => {
                self.engine.unread_replies(address).map(|replies| {
                    ServerMessage::NewReplies {
                        replies: replies.into_iter().map(Into::into).collect(),
                    }
                })
            }
            ClientMessage::MarkRepliesRead { reply_ids } => self
                .engine
                .mark_replies_read(address, &reply_ids)
                .map(|count| ServerMessage::RepliesMarked { count }),
            ClientMessage::MarkRepliesUnread { reply_ids } => self
                .engine
                .mark_replies_unread(address, &reply_ids)
                .map(|count| ServerMessage::RepliesMarked { count }),
            ClientMessage::GetLikedStories => self
                .engine
                .liked_stories(address)
                .map(|story_ids| ServerMessage::LikedStories { story_ids }),
            ClientMessage::MarkLiked { story_id } => self
                .engine
                .mark_liked(address, story_id)
                .map(|_| ServerMessage::Liked { story_id }),
            // Login messages are routed before perform; answering with a
            // generic failure keeps the match total without a panic path.
            ClientMessage::UserLogin { .. }
            | ClientMessage::LoginSignature { .. }
            | ClientMessage::CredentialLogin { .. } => return auth_failed(),
        };

        result.unwrap_or_else(|err| economy_reply(address, err))
    }

    // -- Plumbing -----------------------------------------------------------

    fn set_phase(&mut self, connection: Uuid, phase: Phase) {
        if let Some(conn) = self.connections.get_mut(&connection) {
            conn.phase = phase;
        }
    }

    fn send(&self, connection: Uuid, message: ServerMessage) {
        if let Some(conn) = self.connections.get(&connection) {
            if conn.outbox.send(message).is_err() {
                tracing::debug!(%connection, "outbox closed, reply dropped");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn wire_error(kind: ErrorKind, message: impl Into<String>) -> ServerMessage {
    ServerMessage::Error {
        kind,
        message: message.into(),
    }
}

/// The one answer every failed login gets.
fn auth_failed() -> ServerMessage {
    wire_error(ErrorKind::AuthFailed, "authentication failed")
}

fn internal_error(err: &EconomyError) -> ServerMessage {
    tracing::error!(error = %err, "storage failure during login");
    wire_error(ErrorKind::Internal, "internal error")
}

/// Validation errors go to the client verbatim; storage failures stay in
/// the log.
fn economy_reply(address: &str, err: EconomyError) -> ServerMessage {
    let kind = match &err {
        EconomyError::ContentTooShort { .. } => ErrorKind::ContentTooShort,
        EconomyError::EmptyContent => ErrorKind::EmptyContent,
        EconomyError::DailyLimitReached { .. } => ErrorKind::DailyLimitReached,
        EconomyError::InsufficientBalance => ErrorKind::InsufficientBalance,
        EconomyError::NotOwner => ErrorKind::NotOwner,
        EconomyError::AlreadyLiked => ErrorKind::AlreadyLiked,
        EconomyError::NoStoriesAvailable => ErrorKind::NoStoriesAvailable,
        EconomyError::NotFound { .. } => ErrorKind::NotFound,
        EconomyError::Storage(_) => {
            tracing::error!(%address, error = %err, "storage failure during action");
            return wire_error(ErrorKind::Internal, "internal error");
        }
    };
    wire_error(kind, err.to_string())
}
