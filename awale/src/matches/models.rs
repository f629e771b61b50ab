//! Match records.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{collections::BTreeSet, fmt};

use crate::{
    game::{Board, Username},
    lobby::ConnectionId,
};

/// Monotonic, never reused for the lifetime of the process.
pub type MatchId = u32;

/// A seated player. The seat index is the board's logical player.
#[derive(Clone, Debug, Serialize)]
pub struct Seat {
    pub id: ConnectionId,
    pub name: Username,
}

/// How a finished match ended.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum Outcome {
    Winner(Username),
    Draw,
    /// Voluntary quit, the opponent isn't credited.
    Quit(Username),
    /// Seat dropped, the opponent is credited.
    Disconnected(Username),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Winner(name) => write!(f, "{name} won"),
            Self::Draw => write!(f, "draw"),
            Self::Quit(name) => write!(f, "{name} quit"),
            Self::Disconnected(name) => write!(f, "{name} disconnected"),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum MatchState {
    Live,
    Finished(Outcome),
}

#[derive(Clone, Debug, Serialize)]
pub struct Match {
    pub id: MatchId,
    pub seats: [Seat; 2],
    pub board: Board,
    pub spectators: BTreeSet<ConnectionId>,
    pub is_private: bool,
    /// Rendered board after each move, oldest first.
    pub replay: Vec<String>,
    pub state: MatchState,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Match {
    #[must_use]
    pub fn new(id: MatchId, seats: [Seat; 2]) -> Self {
        Self {
            id,
            seats,
            board: Board::new(),
            spectators: BTreeSet::new(),
            is_private: false,
            replay: Vec::new(),
            state: MatchState::Live,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.state == MatchState::Live
    }

    #[must_use]
    pub fn seat_of(&self, id: ConnectionId) -> Option<usize> {
        self.seats.iter().position(|seat| seat.id == id)
    }

    /// Seat whose turn it is.
    #[must_use]
    pub fn to_move(&self) -> &Seat {
        &self.seats[self.board.current_player()]
    }

    /// Both seats followed by every spectator.
    #[must_use]
    pub fn audience(&self) -> Vec<ConnectionId> {
        self.seats
            .iter()
            .map(|seat| seat.id)
            .chain(self.spectators.iter().copied())
            .collect()
    }

    /// `alice vs bob`
    #[must_use]
    pub fn title(&self) -> String {
        format!("{} vs {}", self.seats[0].name, self.seats[1].name)
    }

    /// One line for `games`.
    #[must_use]
    pub fn summary(&self) -> String {
        let privacy = if self.is_private { " [private]" } else { "" };
        format!(
            "#{}: {} | turn: {} | started {}{}",
            self.id,
            self.title(),
            self.to_move().name,
            self.started_at.format("%H:%M:%S"),
            privacy
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Match {
        Match::new(
            3,
            [
                Seat {
                    id: ConnectionId(5),
                    name: Username::new("bob"),
                },
                Seat {
                    id: ConnectionId(2),
                    name: Username::new("alice"),
                },
            ],
        )
    }

    #[test]
    fn first_seat_moves_first() {
        let m = sample();
        assert!(m.is_live());
        assert_eq!(m.to_move().name.as_str(), "bob");
        assert_eq!(m.seat_of(ConnectionId(2)), Some(1));
        assert_eq!(m.seat_of(ConnectionId(9)), None);
    }

    #[test]
    fn audience_lists_seats_then_spectators() {
        let mut m = sample();
        m.spectators.insert(ConnectionId(8));
        assert_eq!(
            m.audience(),
            vec![ConnectionId(5), ConnectionId(2), ConnectionId(8)]
        );
    }

    #[test]
    fn summary_names_players_and_turn() {
        let mut m = sample();
        m.is_private = true;
        let summary = m.summary();
        assert!(summary.starts_with("#3: bob vs alice | turn: bob | started "));
        assert!(summary.ends_with(" [private]"));
    }
}
