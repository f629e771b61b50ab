//! Networking layer for client-server communication.
//!
//! Clients send newline-terminated text commands; the server answers with
//! length-prefixed `"<code>|<text>"` frames. The server uses `mio` for
//! non-blocking I/O on a single thread.

/// Framing error types.
pub mod errors;

/// Blocking TCP client, mostly for tests.
pub mod client;

/// Message codes, server messages and client commands.
pub mod messages;

/// Single-threaded TCP server with a `mio` event loop.
pub mod server;

/// Length-prefixed framing and the inbound line buffer.
pub mod utils;
