//! Board geometry and scoring thresholds.

use super::entities::Seeds;

pub const PITS_PER_PLAYER: usize = 6;
pub const TOTAL_PITS: usize = 2 * PITS_PER_PLAYER;
pub const INITIAL_SEEDS: Seeds = 4;

/// Seeds in play for the whole game. Pits plus both scores always add up to this.
pub const TOTAL_SEEDS: Seeds = INITIAL_SEEDS * TOTAL_PITS as Seeds;

/// A strict majority of all seeds ends the game.
pub const MIN_SEEDS_TO_WIN: Seeds = TOTAL_SEEDS / 2 + 1;

/// A pit is captured when the sowing leaves it holding 2 or 3 seeds.
pub const MIN_CAPTURE_SEEDS: Seeds = 2;
pub const MAX_CAPTURE_SEEDS: Seeds = 3;

/// Longest display name kept after sanitizing.
pub const MAX_USERNAME_LEN: usize = 31;
