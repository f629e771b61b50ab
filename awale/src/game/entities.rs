use serde::{Deserialize, Deserializer, Serialize};
use std::{borrow::Borrow, fmt};
use thiserror::Error;

use super::constants::{self, MIN_SEEDS_TO_WIN, PITS_PER_PLAYER, TOTAL_PITS, TOTAL_SEEDS};
use super::functional::{self, Pits, opponent, side};

/// Type alias for a seed count. The whole game only ever holds 48 seeds.
pub type Seeds = u8;

/// Reasons the engine refuses a pit.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum MoveError {
    #[error("pit {0} does not exist, choose 0-11")]
    OutOfRange(usize),
    #[error("pit {pit} is not on your side (pits {first}-{last})")]
    NotYourSide { pit: usize, first: usize, last: usize },
    #[error("pit {0} is empty")]
    EmptyPit(usize),
    #[error("you must give seeds to your opponent")]
    MustFeedOpponent,
}

/// Rejections when building a board from raw parts.
#[derive(Debug, Eq, Error, PartialEq)]
pub enum BoardError {
    #[error("board holds {0} seeds, expected 48")]
    SeedCount(u32),
    #[error("player {0} does not exist")]
    InvalidPlayer(usize),
}

/// What a successfully applied move did.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MoveReport {
    pub player: usize,
    pub pit: usize,
    pub sown: Seeds,
    pub last_pit: usize,
    pub captured: Seeds,
}

/// Final standing derived from the scores.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum GameResult {
    Winner(usize),
    Draw,
}

/// A single awale board: 12 pits, two capture scores and the player to move.
///
/// The sum of all pits plus both scores is always [`TOTAL_SEEDS`]. The only
/// mutating entry point is [`Board::apply_move`].
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Board {
    pits: Pits,
    scores: [Seeds; 2],
    current_player: usize,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Fresh board: 4 seeds per pit, no captures, player 0 to move.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pits: [constants::INITIAL_SEEDS; TOTAL_PITS],
            scores: [0, 0],
            current_player: 0,
        }
    }

    /// Builds an arbitrary position, checking that it conserves all seeds.
    pub fn from_parts(
        pits: Pits,
        scores: [Seeds; 2],
        current_player: usize,
    ) -> Result<Self, BoardError> {
        if current_player > 1 {
            return Err(BoardError::InvalidPlayer(current_player));
        }
        let total: u32 = pits.iter().chain(scores.iter()).map(|&s| u32::from(s)).sum();
        if total != u32::from(TOTAL_SEEDS) {
            return Err(BoardError::SeedCount(total));
        }
        Ok(Self {
            pits,
            scores,
            current_player,
        })
    }

    #[must_use]
    pub fn pits(&self) -> &Pits {
        &self.pits
    }

    #[must_use]
    pub fn scores(&self) -> [Seeds; 2] {
        self.scores
    }

    #[must_use]
    pub fn current_player(&self) -> usize {
        self.current_player
    }

    /// Seeds still on the board plus both scores.
    #[must_use]
    pub fn total_seeds(&self) -> u32 {
        self.pits
            .iter()
            .chain(self.scores.iter())
            .map(|&s| u32::from(s))
            .sum()
    }

    /// Checks a pit for the player to move without changing anything.
    pub fn validate_move(&self, pit: usize) -> Result<(), MoveError> {
        if pit >= TOTAL_PITS {
            return Err(MoveError::OutOfRange(pit));
        }
        let own = side(self.current_player);
        if !own.contains(&pit) {
            return Err(MoveError::NotYourSide {
                pit,
                first: own.start,
                last: own.end - 1,
            });
        }
        if self.pits[pit] == 0 {
            return Err(MoveError::EmptyPit(pit));
        }
        // Starving opponent: a move that doesn't feed them is only allowed
        // when no move on this side can.
        if functional::side_seeds(&self.pits, opponent(self.current_player)) == 0
            && !functional::reaches_opponent(&self.pits, pit)
            && functional::can_feed(&self.pits, self.current_player)
        {
            return Err(MoveError::MustFeedOpponent);
        }
        Ok(())
    }

    #[must_use]
    pub fn is_valid_move(&self, pit: usize) -> bool {
        self.validate_move(pit).is_ok()
    }

    /// Pits the player to move may currently choose.
    #[must_use]
    pub fn legal_moves(&self) -> Vec<usize> {
        side(self.current_player)
            .filter(|&pit| self.is_valid_move(pit))
            .collect()
    }

    /// Sows the chosen pit, resolves captures and hands the turn over.
    pub fn apply_move(&mut self, pit: usize) -> Result<MoveReport, MoveError> {
        self.validate_move(pit)?;

        let player = self.current_player;
        let victim = opponent(player);
        let sown = self.pits[pit];
        let last_pit = functional::sow(&mut self.pits, pit);

        // All-or-nothing: the whole run is skipped if it would strip the
        // victim's side bare.
        let run = functional::capture_run(&self.pits, last_pit, victim);
        let would_capture: Seeds = run.iter().map(|&p| self.pits[p]).sum();
        let remaining = functional::side_seeds(&self.pits, victim);
        let mut captured = 0;
        if remaining > would_capture {
            for p in run {
                captured += self.pits[p];
                self.pits[p] = 0;
            }
            self.scores[player] += captured;
        }

        self.current_player = victim;
        Ok(MoveReport {
            player,
            pit,
            sown,
            last_pit,
            captured,
        })
    }

    #[must_use]
    pub fn is_game_over(&self) -> bool {
        if self.scores.iter().any(|&s| s >= MIN_SEEDS_TO_WIN) {
            return true;
        }
        let player = self.current_player;
        if functional::side_seeds(&self.pits, player) == 0 {
            return true;
        }
        functional::side_seeds(&self.pits, opponent(player)) == 0
            && !functional::can_feed(&self.pits, player)
    }

    /// Standing by score. Only meaningful once [`Board::is_game_over`] holds.
    #[must_use]
    pub fn result(&self) -> GameResult {
        match self.scores[0].cmp(&self.scores[1]) {
            std::cmp::Ordering::Greater => GameResult::Winner(0),
            std::cmp::Ordering::Less => GameResult::Winner(1),
            std::cmp::Ordering::Equal => GameResult::Draw,
        }
    }

    /// Deterministic text snapshot used for board updates and replay frames.
    #[must_use]
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=====================================")?;
        writeln!(
            f,
            "Player 2 [Score: {:>2}]           <-- Direction",
            self.scores[1]
        )?;
        write!(f, "     ")?;
        for pit in side(1).rev() {
            write!(f, "[{:>2}]", self.pits[pit])?;
        }
        writeln!(f)?;
        writeln!(f, "Pit:   {}", pit_labels(side(1).rev()))?;
        writeln!(f, "     -------------------------")?;
        writeln!(f, "Pit:   {}", pit_labels(side(0)))?;
        write!(f, "     ")?;
        for pit in side(0) {
            write!(f, "[{:>2}]", self.pits[pit])?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "Direction -->           Player 1 [Score: {:>2}]",
            self.scores[0]
        )?;
        write!(
            f,
            "Player {} to move (pits {}-{})",
            self.current_player + 1,
            self.current_player * PITS_PER_PLAYER,
            self.current_player * PITS_PER_PLAYER + PITS_PER_PLAYER - 1
        )
    }
}

fn pit_labels(pits: impl Iterator<Item = usize>) -> String {
    pits.map(|pit| format!("{pit:>2}"))
        .collect::<Vec<_>>()
        .join("  ")
}

/// A connection's display name.
///
/// Whitespace is replaced by underscores so names stay a single command
/// argument, and the name is cut to [`constants::MAX_USERNAME_LEN`] characters.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Username(String);

impl Username {
    pub fn new(s: &str) -> Self {
        let username: String = s
            .trim()
            .chars()
            .map(|c| if c.is_whitespace() { '_' } else { c })
            .take(constants::MAX_USERNAME_LEN)
            .collect();
        Self(username)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for Username {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}

impl From<&str> for Username {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl Borrow<str> for Username {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(pits: Pits, scores: [Seeds; 2], player: usize) -> Board {
        Board::from_parts(pits, scores, player).unwrap()
    }

    // === Setup Tests ===

    #[test]
    fn new_board_has_four_seeds_everywhere() {
        let board = Board::new();
        assert!(board.pits().iter().all(|&s| s == 4));
        assert_eq!(board.scores(), [0, 0]);
        assert_eq!(board.current_player(), 0);
        assert_eq!(board.total_seeds(), 48);
    }

    #[test]
    fn from_parts_rejects_lost_seeds() {
        let err = Board::from_parts([4; TOTAL_PITS], [1, 0], 0).unwrap_err();
        assert_eq!(err, BoardError::SeedCount(49));
        let err = Board::from_parts([4; TOTAL_PITS], [0, 0], 2).unwrap_err();
        assert_eq!(err, BoardError::InvalidPlayer(2));
    }

    // === Validation Tests ===

    #[test]
    fn rejects_out_of_range_and_foreign_pits() {
        let board = Board::new();
        assert_eq!(board.validate_move(12), Err(MoveError::OutOfRange(12)));
        assert_eq!(
            board.validate_move(6),
            Err(MoveError::NotYourSide {
                pit: 6,
                first: 0,
                last: 5
            })
        );
        assert!(board.is_valid_move(0));
        assert!(board.is_valid_move(5));
    }

    #[test]
    fn rejects_empty_pit() {
        let b = board([0, 8, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4], [0, 0], 0);
        assert_eq!(b.validate_move(0), Err(MoveError::EmptyPit(0)));
    }

    #[test]
    fn forced_feed_rejects_non_feeding_move() {
        let b = board([1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0], [24, 22], 0);
        assert_eq!(b.validate_move(0), Err(MoveError::MustFeedOpponent));
        assert!(b.is_valid_move(5));
        assert_eq!(b.legal_moves(), vec![5]);
    }

    #[test]
    fn forced_feed_allows_move_when_nothing_can_feed() {
        let b = board([1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0], [24, 23], 0);
        assert!(b.is_valid_move(0));
        assert!(b.is_game_over());
    }

    // === Sowing And Capture Tests ===

    #[test]
    fn plain_sowing_moves_turn() {
        let mut b = Board::new();
        let report = b.apply_move(2).unwrap();
        assert_eq!(report.sown, 4);
        assert_eq!(report.last_pit, 6);
        assert_eq!(report.captured, 0);
        assert_eq!(b.pits()[2], 0);
        assert_eq!(b.pits()[6], 5);
        assert_eq!(b.current_player(), 1);
        assert_eq!(b.total_seeds(), 48);
    }

    #[test]
    fn twelve_seeds_never_refill_origin() {
        let mut b = board([12, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3], [3, 0], 0);
        let report = b.apply_move(0).unwrap();
        assert_eq!(b.pits()[0], 0);
        assert_eq!(b.pits()[1], 5);
        assert!(b.pits()[2..].iter().all(|&s| s == 4));
        assert_eq!(report.last_pit, 1);
        assert_eq!(b.total_seeds(), 48);
    }

    #[test]
    fn single_capture_stops_at_non_qualifying_pit() {
        let mut b = board([10, 0, 0, 0, 0, 2, 4, 1, 5, 5, 5, 5], [5, 6], 0);
        let report = b.apply_move(5).unwrap();
        assert_eq!(report.captured, 2);
        assert_eq!(b.pits()[7], 0);
        assert_eq!(b.pits()[6], 5);
        assert_eq!(b.scores(), [7, 6]);
        assert_eq!(b.total_seeds(), 48);
    }

    #[test]
    fn capture_chains_backwards() {
        let mut b = board([11, 0, 0, 0, 0, 2, 1, 1, 5, 5, 5, 5], [6, 7], 0);
        let report = b.apply_move(5).unwrap();
        assert_eq!(report.captured, 4);
        assert_eq!(b.pits()[6], 0);
        assert_eq!(b.pits()[7], 0);
        assert_eq!(b.scores(), [10, 7]);
    }

    #[test]
    fn capture_never_crosses_into_own_side() {
        let mut b = board([10, 0, 0, 0, 3, 1, 1, 1, 4, 4, 4, 4], [8, 8], 0);
        let report = b.apply_move(4).unwrap();
        assert_eq!(report.captured, 4);
        // Pit 5 holds 2 seeds but belongs to the mover.
        assert_eq!(b.pits()[5], 2);
        assert_eq!(b.scores(), [12, 8]);
        assert_eq!(b.total_seeds(), 48);
    }

    #[test]
    fn capture_that_would_empty_opponent_is_cancelled() {
        let mut b = board([10, 0, 0, 0, 3, 0, 1, 1, 0, 0, 0, 0], [20, 13], 0);
        let report = b.apply_move(4).unwrap();
        assert_eq!(report.captured, 0);
        assert_eq!(b.pits()[6], 2);
        assert_eq!(b.pits()[7], 2);
        assert_eq!(b.scores(), [20, 13]);
        assert_eq!(b.current_player(), 1);
    }

    #[test]
    fn player_two_captures_on_player_one_side() {
        let mut b = board([1, 1, 5, 5, 5, 10, 0, 0, 0, 0, 0, 2], [10, 9], 1);
        let report = b.apply_move(11).unwrap();
        assert_eq!(report.last_pit, 1);
        assert_eq!(report.captured, 4);
        assert_eq!(b.scores(), [10, 13]);
        assert_eq!(b.current_player(), 0);
    }

    #[test]
    fn apply_move_rejects_illegal_pit_without_mutation() {
        let mut b = Board::new();
        let before = b.clone();
        assert!(b.apply_move(7).is_err());
        assert_eq!(b, before);
    }

    // === Termination Tests ===

    #[test]
    fn majority_score_ends_game() {
        let b = board([4, 4, 4, 4, 0, 0, 3, 0, 0, 0, 0, 0], [25, 4], 0);
        assert!(b.is_game_over());
        assert_eq!(b.result(), GameResult::Winner(0));
    }

    #[test]
    fn empty_side_to_move_ends_game() {
        let b = board([0, 0, 0, 0, 0, 0, 4, 4, 4, 4, 4, 4], [12, 12], 0);
        assert!(b.is_game_over());
        assert_eq!(b.result(), GameResult::Draw);
    }

    #[test]
    fn opening_is_not_over() {
        assert!(!Board::new().is_game_over());
    }

    // === Rendering Tests ===

    #[test]
    fn render_is_stable() {
        let b = Board::new();
        assert_eq!(b.render(), b.render());
        let expected = "\
=====================================
Player 2 [Score:  0]           <-- Direction
     [ 4][ 4][ 4][ 4][ 4][ 4]
Pit:   11  10   9   8   7   6
     -------------------------
Pit:    0   1   2   3   4   5
     [ 4][ 4][ 4][ 4][ 4][ 4]
Direction -->           Player 1 [Score:  0]
Player 1 to move (pits 0-5)";
        assert_eq!(b.render(), expected);
    }

    // === Username Tests ===

    #[test]
    fn username_sanitizes_whitespace_and_length() {
        assert_eq!(Username::new("  bob smith \n").as_str(), "bob_smith");
        assert_eq!(Username::new(&"x".repeat(40)).as_str().len(), 31);
        assert!(Username::new("   ").is_empty());
    }
}
