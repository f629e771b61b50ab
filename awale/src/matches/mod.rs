//! Live and finished matches.
//!
//! A match wraps one [`Board`](crate::game::Board) with its two seats, a
//! spectator set, a privacy flag and a bounded replay log of rendered boards.

pub mod manager;
pub mod models;

pub use manager::MatchManager;
pub use models::{Match, MatchId, MatchState, Outcome, Seat};
