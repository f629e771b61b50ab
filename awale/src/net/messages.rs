use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::matches::MatchId;

/// Numeric tags prefixed to every server payload as `"<code>|<text>"`.
///
/// Codes are part of the wire contract and must never be renumbered.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[repr(u8)]
pub enum MessageType {
    ConnectAck = 0,
    Chat = 1,
    UserList = 2,
    Challenge = 3,
    ChallengeResponse = 4,
    Move = 5,
    BoardUpdate = 6,
    GameOver = 7,
    Error = 8,
    Info = 9,
    BioSet = 10,
    BioInfo = 11,
    PrivateChat = 12,
    MatchList = 13,
    FriendRequest = 14,
    FriendResponse = 15,
    FriendList = 16,
    RankList = 17,
    ReplayData = 18,
}

impl MessageType {
    pub const ALL: [MessageType; 19] = [
        Self::ConnectAck,
        Self::Chat,
        Self::UserList,
        Self::Challenge,
        Self::ChallengeResponse,
        Self::Move,
        Self::BoardUpdate,
        Self::GameOver,
        Self::Error,
        Self::Info,
        Self::BioSet,
        Self::BioInfo,
        Self::PrivateChat,
        Self::MatchList,
        Self::FriendRequest,
        Self::FriendResponse,
        Self::FriendList,
        Self::RankList,
        Self::ReplayData,
    ];

    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::ConnectAck => "connect-ack",
            Self::Chat => "chat",
            Self::UserList => "user-list",
            Self::Challenge => "challenge",
            Self::ChallengeResponse => "challenge-response",
            Self::Move => "move",
            Self::BoardUpdate => "board-update",
            Self::GameOver => "game-over",
            Self::Error => "error",
            Self::Info => "info",
            Self::BioSet => "bio-set",
            Self::BioInfo => "bio-info",
            Self::PrivateChat => "private-chat",
            Self::MatchList => "match-list",
            Self::FriendRequest => "friend-request",
            Self::FriendResponse => "friend-response",
            Self::FriendList => "friend-list",
            Self::RankList => "rank-list",
            Self::ReplayData => "replay-data",
        };
        write!(f, "{repr}")
    }
}

/// A message from the server to a client.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ServerMessage {
    pub kind: MessageType,
    pub text: String,
}

impl ServerMessage {
    pub fn new(kind: MessageType, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(MessageType::Info, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(MessageType::Error, text)
    }

    /// Wire payload without the length prefix.
    #[must_use]
    pub fn encode(&self) -> String {
        format!("{}|{}", self.kind.code(), self.text)
    }

    /// Parses a `"<code>|<text>"` payload. The pipe must appear within the
    /// first four characters.
    pub fn decode(payload: &str) -> Option<Self> {
        let pipe = payload.char_indices().take(4).find(|&(_, c)| c == '|')?.0;
        let code = payload[..pipe].parse().ok()?;
        let kind = MessageType::from_code(code)?;
        Some(Self::new(kind, &payload[pipe + 1..]))
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.text)
    }
}

/// Malformed command arguments. Reported to the issuer only.
#[derive(Debug, Eq, Error, PartialEq)]
pub enum ParseError {
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("'{value}' is not a valid {what}")]
    InvalidNumber { what: &'static str, value: String },
}

/// A client request, one per inbound line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    /// `msg <text>` or any line without a recognized keyword.
    Chat(String),
    ListUsers,
    SetBio(String),
    GetBio(String),
    PrivateMessage { to: String, text: String },
    Challenge(String),
    Accept(Option<String>),
    Refuse(Option<String>),
    Cancel(Option<String>),
    Move(usize),
    Quit,
    Games,
    Watch(MatchId),
    Unwatch(Option<MatchId>),
    WatchReplay(MatchId),
    AddFriend(String),
    AcceptFriend(Option<String>),
    RefuseFriend(Option<String>),
    Private(bool),
    Friends,
    Ranking,
}

impl Command {
    /// Splits a line into keyword and arguments and builds the command.
    ///
    /// Lines that don't start with a known keyword become [`Command::Chat`]
    /// carrying the whole line.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim();
        let (keyword, args) = match line.split_once(char::is_whitespace) {
            Some((keyword, args)) => (keyword, args.trim()),
            None => (line, ""),
        };
        let name = || first_word(args);

        let command = match keyword {
            "msg" => Self::Chat(required(args, "msg <text>")?.to_string()),
            "list" => Self::ListUsers,
            "bio" => Self::SetBio(required(args, "bio <text>")?.to_string()),
            "getbio" => Self::GetBio(required(name(), "getbio <username>")?.to_string()),
            "pm" => {
                let (to, text) = args
                    .split_once(char::is_whitespace)
                    .map(|(to, text)| (to, text.trim()))
                    .filter(|(_, text)| !text.is_empty())
                    .ok_or(ParseError::Usage("pm <username> <message>"))?;
                Self::PrivateMessage {
                    to: to.to_string(),
                    text: text.to_string(),
                }
            }
            "challenge" => {
                Self::Challenge(required(name(), "challenge <username>")?.to_string())
            }
            "accept" => Self::Accept(optional(name())),
            "refuse" => Self::Refuse(optional(name())),
            "cancel" => Self::Cancel(optional(name())),
            "move" => {
                let pit = required(name(), "move <pit>")?;
                Self::Move(number(pit, "pit number")?)
            }
            "quit" => Self::Quit,
            "games" => Self::Games,
            "watch" => Self::Watch(number(required(name(), "watch <matchId>")?, "match id")?),
            "unwatch" => Self::Unwatch(match optional(name()) {
                Some(id) => Some(number(&id, "match id")?),
                None => None,
            }),
            "watchreplay" => Self::WatchReplay(number(
                required(name(), "watchreplay <matchId>")?,
                "match id",
            )?),
            "addfriend" => Self::AddFriend(required(name(), "addfriend <username>")?.to_string()),
            "acceptfriend" => Self::AcceptFriend(optional(name())),
            "refusefriend" => Self::RefuseFriend(optional(name())),
            "private" => match name() {
                "on" => Self::Private(true),
                "off" => Self::Private(false),
                _ => return Err(ParseError::Usage("private on|off")),
            },
            "friends" => Self::Friends,
            "ranking" => Self::Ranking,
            _ => Self::Chat(line.to_string()),
        };
        Ok(command)
    }

    /// Keyword used in logs.
    #[must_use]
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Chat(_) => "msg",
            Self::ListUsers => "list",
            Self::SetBio(_) => "bio",
            Self::GetBio(_) => "getbio",
            Self::PrivateMessage { .. } => "pm",
            Self::Challenge(_) => "challenge",
            Self::Accept(_) => "accept",
            Self::Refuse(_) => "refuse",
            Self::Cancel(_) => "cancel",
            Self::Move(_) => "move",
            Self::Quit => "quit",
            Self::Games => "games",
            Self::Watch(_) => "watch",
            Self::Unwatch(_) => "unwatch",
            Self::WatchReplay(_) => "watchreplay",
            Self::AddFriend(_) => "addfriend",
            Self::AcceptFriend(_) => "acceptfriend",
            Self::RefuseFriend(_) => "refusefriend",
            Self::Private(_) => "private",
            Self::Friends => "friends",
            Self::Ranking => "ranking",
        }
    }
}

fn first_word(args: &str) -> &str {
    args.split_whitespace().next().unwrap_or("")
}

fn required<'a>(value: &'a str, usage: &'static str) -> Result<&'a str, ParseError> {
    if value.is_empty() {
        Err(ParseError::Usage(usage))
    } else {
        Ok(value)
    }
}

fn optional(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn number<T: std::str::FromStr>(value: &str, what: &'static str) -> Result<T, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidNumber {
        what,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // === MessageType Tests ===

    #[test]
    fn codes_are_stable() {
        assert_eq!(MessageType::ConnectAck.code(), 0);
        assert_eq!(MessageType::Error.code(), 8);
        assert_eq!(MessageType::BioSet.code(), 10);
        assert_eq!(MessageType::ReplayData.code(), 18);
        for (i, kind) in MessageType::ALL.iter().enumerate() {
            assert_eq!(usize::from(kind.code()), i);
        }
        assert_eq!(MessageType::from_code(19), None);
    }

    // === ServerMessage Tests ===

    #[test]
    fn encode_uses_code_and_pipe() {
        let msg = ServerMessage::new(MessageType::Chat, "alice: hi");
        assert_eq!(msg.encode(), "1|alice: hi");
    }

    #[test]
    fn decode_reads_two_digit_codes_and_keeps_pipes_in_text() {
        let msg = ServerMessage::decode("17|1. a | b").unwrap();
        assert_eq!(msg.kind, MessageType::RankList);
        assert_eq!(msg.text, "1. a | b");
    }

    #[test]
    fn decode_rejects_missing_or_late_pipe() {
        assert!(ServerMessage::decode("hello").is_none());
        assert!(ServerMessage::decode("12345|x").is_none());
        assert!(ServerMessage::decode("99|x").is_none());
    }

    // === Command Tests ===

    #[test]
    fn parses_keywords_with_arguments() {
        assert_eq!(Command::parse("list"), Ok(Command::ListUsers));
        assert_eq!(
            Command::parse("challenge bob"),
            Ok(Command::Challenge("bob".to_string()))
        );
        assert_eq!(Command::parse("move 3"), Ok(Command::Move(3)));
        assert_eq!(Command::parse("accept"), Ok(Command::Accept(None)));
        assert_eq!(
            Command::parse("refuse  carol "),
            Ok(Command::Refuse(Some("carol".to_string())))
        );
        assert_eq!(Command::parse("private on"), Ok(Command::Private(true)));
        assert_eq!(Command::parse("unwatch"), Ok(Command::Unwatch(None)));
        assert_eq!(Command::parse("watch 7"), Ok(Command::Watch(7)));
    }

    #[test]
    fn keeps_full_text_for_messages() {
        assert_eq!(
            Command::parse("msg hello  there"),
            Ok(Command::Chat("hello  there".to_string()))
        );
        assert_eq!(
            Command::parse("pm bob see you soon"),
            Ok(Command::PrivateMessage {
                to: "bob".to_string(),
                text: "see you soon".to_string()
            })
        );
        assert_eq!(
            Command::parse("bio I like seeds"),
            Ok(Command::SetBio("I like seeds".to_string()))
        );
    }

    #[test]
    fn unknown_keyword_is_chat() {
        assert_eq!(
            Command::parse("hello everyone"),
            Ok(Command::Chat("hello everyone".to_string()))
        );
        // Keywords only match whole words.
        assert_eq!(
            Command::parse("listing"),
            Ok(Command::Chat("listing".to_string()))
        );
    }

    #[test]
    fn usage_errors() {
        assert_eq!(
            Command::parse("challenge"),
            Err(ParseError::Usage("challenge <username>"))
        );
        assert_eq!(Command::parse("pm bob"), Err(ParseError::Usage("pm <username> <message>")));
        assert_eq!(Command::parse("private maybe"), Err(ParseError::Usage("private on|off")));
        assert!(matches!(
            Command::parse("move x"),
            Err(ParseError::InvalidNumber { .. })
        ));
        assert!(matches!(
            Command::parse("move -1"),
            Err(ParseError::InvalidNumber { .. })
        ));
    }
}
