//! Awale game engine.
//!
//! A pure, single-board rules implementation:
//! - Board setup and seed conservation
//! - Move legality, including the forced-feed rule
//! - Sowing with origin skipping and backward captures
//! - Terminal state detection and text rendering
//!
//! Nothing here performs I/O; the match layer decides how results surface.

pub mod constants;
pub mod entities;
pub mod functional;

pub use entities::{Board, BoardError, GameResult, MoveError, MoveReport, Seeds, Username};
