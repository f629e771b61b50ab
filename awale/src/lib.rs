//! # Awale
//!
//! A multiplayer awale (oware) server: many clients connect over TCP, chat,
//! challenge each other, play two-player matches, spectate and replay them.
//!
//! ## Architecture
//!
//! - [`game`]: the deterministic board engine (sowing, capture, forced
//!   feeding, termination, rendering)
//! - [`lobby`]: connection registry, challenge broker, social ledger and the
//!   [`Lobby`] that routes commands to them
//! - [`matches`]: match records and the [`MatchManager`]
//! - [`net`]: wire codec, blocking test client and the `mio` event loop
//!
//! All lobby and match state is owned by one thread; handlers queue
//! outbound messages instead of touching sockets.
//!
//! ## Example
//!
//! ```
//! use awale::Board;
//!
//! let mut board = Board::new();
//! let report = board.apply_move(2).unwrap();
//! assert_eq!(report.sown, 4);
//! assert_eq!(board.total_seeds(), 48);
//! ```

/// Networking components for client-server communication.
pub mod net;
pub use net::{client::Client, messages, server, utils};

/// Board engine.
pub mod game;
pub use game::{
    Board, BoardError, GameResult, MoveError, MoveReport, Username,
    constants::{self, TOTAL_SEEDS},
    functional,
};

/// Connections, challenges and friends.
pub mod lobby;
pub use lobby::{ConnectionId, Lobby, LobbyConfig, LobbyError};

/// Matches, spectators and replays.
pub mod matches;
pub use matches::{MatchId, MatchManager};
