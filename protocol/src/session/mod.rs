//! The realtime session layer: wire messages and the room actor.
//!
//! [`message`] defines the JSON contract; [`actor`] runs the room. The
//! transport is someone else's problem — the gateway hands the actor
//! parsed [`ClientMessage`]s and an outbox per connection, and the actor
//! neither knows nor cares that WebSockets exist.

pub mod actor;
pub mod message;

pub use actor::{SessionActor, SessionEvent, SessionHandle};
pub use message::{ClientMessage, ErrorKind, ReplyView, ServerMessage, StoryView};
