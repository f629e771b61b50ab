//! Connection identities and the outbound message queue.

use serde::Serialize;
use std::{collections::BTreeSet, fmt};

use crate::{
    game::Username,
    matches::MatchId,
    net::messages::{MessageType, ServerMessage},
};

/// Handle for one accepted socket, taken straight from the poll token.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct ConnectionId(pub usize);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub enum Status {
    #[default]
    Idle,
    AwaitingAccept,
    InMatch,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Idle => "idle",
            Self::AwaitingAccept => "awaiting accept",
            Self::InMatch => "in match",
        };
        write!(f, "{repr}")
    }
}

/// Everything the lobby knows about a registered connection.
#[derive(Clone, Debug, Serialize)]
pub struct Identity {
    pub id: ConnectionId,
    /// Registration order, used to break ranking ties.
    pub seq: u64,
    pub name: Username,
    pub bio: Option<String>,
    pub status: Status,
    pub current_match: Option<MatchId>,
    pub is_turn: bool,
    /// Challenges sent, oldest first.
    pub outgoing: Vec<ConnectionId>,
    /// Challenges received, oldest first.
    pub incoming: Vec<ConnectionId>,
    pub friends: BTreeSet<Username>,
    pub pending_friend_to: Option<Username>,
    pub pending_friend_from: Option<Username>,
    pub wins: u32,
}

impl Identity {
    #[must_use]
    pub fn new(id: ConnectionId, seq: u64, name: Username) -> Self {
        Self {
            id,
            seq,
            name,
            bio: None,
            status: Status::Idle,
            current_match: None,
            is_turn: false,
            outgoing: Vec::new(),
            incoming: Vec::new(),
            friends: BTreeSet::new(),
            pending_friend_to: None,
            pending_friend_from: None,
            wins: 0,
        }
    }

    #[must_use]
    pub fn bio_or_default(&self) -> &str {
        self.bio.as_deref().unwrap_or("no bio")
    }

    /// Back to the lobby after a match or after the last outgoing challenge
    /// went away.
    pub fn reset_to_idle(&mut self) {
        self.status = Status::Idle;
        self.current_match = None;
        self.is_turn = false;
    }
}

/// A message addressed to one connection.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Envelope {
    pub to: ConnectionId,
    pub message: ServerMessage,
}

/// Messages produced by command handlers, flushed by the event loop after
/// every handled event.
#[derive(Debug, Default)]
pub struct Outbox {
    envelopes: Vec<Envelope>,
}

impl Outbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, to: ConnectionId, message: ServerMessage) {
        self.envelopes.push(Envelope { to, message });
    }

    pub fn send(&mut self, to: ConnectionId, kind: MessageType, text: impl Into<String>) {
        self.push(to, ServerMessage::new(kind, text));
    }

    pub fn info(&mut self, to: ConnectionId, text: impl Into<String>) {
        self.push(to, ServerMessage::info(text));
    }

    /// Same message to every recipient.
    pub fn broadcast<I>(&mut self, recipients: I, message: &ServerMessage)
    where
        I: IntoIterator<Item = ConnectionId>,
    {
        for to in recipients {
            self.push(to, message.clone());
        }
    }

    pub fn drain(&mut self) -> Vec<Envelope> {
        std::mem::take(&mut self.envelopes)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.envelopes.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.envelopes.len()
    }
}
