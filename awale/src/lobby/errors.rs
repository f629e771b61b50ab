//! Lobby error types.
//!
//! Every variant is reported to the issuing connection only, as an `error`
//! message carrying its `Display` text.

use thiserror::Error;

use crate::{game::MoveError, matches::MatchId, net::messages::ParseError};

#[derive(Debug, Eq, Error, PartialEq)]
pub enum LobbyError {
    /// Malformed command arguments
    #[error(transparent)]
    Usage(#[from] ParseError),

    #[error("name is empty")]
    EmptyName,

    #[error("name '{0}' is already taken")]
    NameTaken(String),

    #[error("server is full ({max} users)")]
    ServerFull { max: usize },

    #[error("user '{0}' is not connected")]
    UserNotFound(String),

    #[error("you cannot challenge yourself")]
    SelfChallenge,

    #[error("you are already in a match")]
    AlreadyInMatch,

    #[error("you already challenged {0}")]
    AlreadyPending(String),

    #[error("{0} is busy")]
    TargetBusy(String),

    #[error("too many pending challenges (max {max})")]
    TooManyChallenges { max: usize },

    #[error("no pending challenge")]
    NoPendingChallenge,

    #[error("no pending challenge with {0}")]
    NoChallengeWith(String),

    /// More than one challenge could match an unnamed accept/refuse/cancel
    #[error("several challenges pending, specify one of: {0}")]
    AmbiguousChallenge(String),

    #[error("you are not in a match")]
    NotInMatch,

    #[error("it is not your turn")]
    NotYourTurn,

    #[error("illegal move: {0}")]
    IllegalMove(#[from] MoveError),

    #[error("too many live matches (max {max})")]
    TooManyMatches { max: usize },

    #[error("match #{0} does not exist")]
    NoSuchMatch(MatchId),

    #[error("match #{0} is over")]
    MatchOver(MatchId),

    #[error("match #{0} is private")]
    PrivateMatch(MatchId),

    #[error("you are playing in match #{0}")]
    AlreadySeated(MatchId),

    #[error("you are not watching match #{0}")]
    NotWatching(MatchId),

    #[error("you are not watching any match")]
    NotWatchingAny,

    #[error("match #{0} has no recorded moves")]
    EmptyReplay(MatchId),

    #[error("bio is longer than {max} characters")]
    BioTooLong { max: usize },

    #[error("you cannot message yourself")]
    SelfMessage,

    #[error("you cannot befriend yourself")]
    SelfFriend,

    #[error("{0} is already your friend")]
    AlreadyFriends(String),

    #[error("you already have a pending friend request")]
    FriendRequestPending,

    #[error("{0} already has a pending friend request")]
    TargetRequestPending(String),

    #[error("no pending friend request")]
    NoFriendRequest,

    #[error("no pending friend request from {0}")]
    NoFriendRequestFrom(String),

    #[error("friend list is full (max {max})")]
    FriendListFull { max: usize },
}

impl LobbyError {
    /// Errors after which a connection that failed its handshake is closed.
    #[must_use]
    pub fn closes_connection(&self) -> bool {
        matches!(
            self,
            Self::EmptyName | Self::NameTaken(_) | Self::ServerFull { .. }
        )
    }
}
