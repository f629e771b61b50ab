//! Pure functions over raw pit arrays.
//!
//! These never touch scores or the player to move; [`Board`](super::entities::Board)
//! composes them into legality checks and move application.

use std::ops::Range;

use super::constants::{MAX_CAPTURE_SEEDS, MIN_CAPTURE_SEEDS, PITS_PER_PLAYER, TOTAL_PITS};
use super::entities::Seeds;

/// Raw pit storage, pits `0..6` belong to player 0 and `6..12` to player 1.
pub type Pits = [Seeds; TOTAL_PITS];

/// The pit indices owned by `player`.
#[must_use]
pub const fn side(player: usize) -> Range<usize> {
    let start = player * PITS_PER_PLAYER;
    start..start + PITS_PER_PLAYER
}

#[must_use]
pub const fn opponent(player: usize) -> usize {
    1 - player
}

#[must_use]
pub fn side_seeds(pits: &Pits, player: usize) -> Seeds {
    pits[side(player)].iter().sum()
}

#[must_use]
pub const fn is_capturable(seeds: Seeds) -> bool {
    seeds >= MIN_CAPTURE_SEEDS && seeds <= MAX_CAPTURE_SEEDS
}

/// Simulates sowing from `pit` and reports whether any seed lands on the
/// side opposite to the pit's owner.
#[must_use]
pub fn reaches_opponent(pits: &Pits, pit: usize) -> bool {
    let target = side(opponent(pit / PITS_PER_PLAYER));
    let mut current = pit;
    for _ in 0..pits[pit] {
        current = (current + 1) % TOTAL_PITS;
        if target.contains(&current) {
            return true;
        }
    }
    false
}

/// Whether any non-empty pit of `player` can deliver at least one seed to
/// the other side.
#[must_use]
pub fn can_feed(pits: &Pits, player: usize) -> bool {
    side(player).any(|pit| pits[pit] > 0 && reaches_opponent(pits, pit))
}

/// Empties `pit` and distributes its seeds one by one counter-clockwise,
/// never dropping a seed back into the origin. Returns the last pit sown.
pub fn sow(pits: &mut Pits, pit: usize) -> usize {
    let seeds = pits[pit];
    pits[pit] = 0;
    let mut current = pit;
    for _ in 0..seeds {
        current = (current + 1) % TOTAL_PITS;
        if current == pit {
            current = (current + 1) % TOTAL_PITS;
        }
        pits[current] += 1;
    }
    current
}

/// Pits that a capture ending on `last` would take from `victim`, walking
/// backwards from `last` and stopping at the first pit that doesn't hold
/// 2 or 3 seeds or at the start of the victim's side.
#[must_use]
pub fn capture_run(pits: &Pits, last: usize, victim: usize) -> Vec<usize> {
    let range = side(victim);
    if !range.contains(&last) {
        return Vec::new();
    }
    (range.start..=last)
        .rev()
        .take_while(|&pit| is_capturable(pits[pit]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sides_partition_the_board() {
        assert_eq!(side(0), 0..6);
        assert_eq!(side(1), 6..12);
        assert_eq!(opponent(0), 1);
        assert_eq!(opponent(1), 0);
    }

    #[test]
    fn sow_skips_origin_on_full_lap() {
        let mut pits = [0; TOTAL_PITS];
        pits[3] = 13;
        let last = sow(&mut pits, 3);
        assert_eq!(pits[3], 0);
        assert_eq!(pits.iter().sum::<Seeds>(), 13);
        // 11 seeds cover every other pit once, the last two wrap past the origin.
        assert_eq!(pits[4], 2);
        assert_eq!(pits[5], 2);
        assert_eq!(last, 5);
    }

    #[test]
    fn reaches_opponent_only_when_crossing() {
        let mut pits = [0; TOTAL_PITS];
        pits[0] = 5;
        pits[1] = 5;
        assert!(!reaches_opponent(&pits, 0));
        assert!(reaches_opponent(&pits, 1));
        pits[11] = 1;
        assert!(reaches_opponent(&pits, 11));
    }

    #[test]
    fn capture_run_stops_at_side_boundary() {
        let mut pits = [0; TOTAL_PITS];
        pits[5] = 2;
        pits[6] = 3;
        pits[7] = 2;
        assert_eq!(capture_run(&pits, 7, 1), vec![7, 6]);
    }

    #[test]
    fn capture_run_stops_at_non_qualifying_pit() {
        let mut pits = [0; TOTAL_PITS];
        pits[6] = 2;
        pits[7] = 4;
        pits[8] = 3;
        assert_eq!(capture_run(&pits, 8, 1), vec![8]);
    }

    #[test]
    fn capture_run_empty_when_last_on_own_side() {
        let mut pits = [0; TOTAL_PITS];
        pits[4] = 2;
        assert!(capture_run(&pits, 4, 1).is_empty());
    }
}
