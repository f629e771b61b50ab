//! A low-level TCP awale client.
//!
//! This client is blocking and so is primarily used as a testing utility
//! rather than an actual awale client.

use anyhow::{Error, bail};
use std::{
    io::Write,
    net::{SocketAddr, TcpStream},
    thread,
    time::Duration,
};

use super::{
    super::game::entities::Username,
    messages::{MessageType, ServerMessage},
    utils,
};
use crate::matches::MatchId;

/// Default timeout for reading from the server.
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for writing to the server.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Messages skipped while waiting for a specific kind.
const MAX_SKIPPED: usize = 64;

/// A blocking TCP client speaking the line protocol.
pub struct Client {
    /// The username the server acknowledged.
    pub username: Username,
    /// The underlying TCP stream.
    pub stream: TcpStream,
}

impl Client {
    /// Connect to an awale server and complete the name handshake.
    ///
    /// This method attempts to connect with backoff, trying three times with
    /// decreasing timeouts (1s, 500ms, 100ms).
    ///
    /// # Returns
    ///
    /// Returns the connected client and the server's welcome message.
    ///
    /// # Errors
    ///
    /// Returns an error if unable to connect or if the server rejects the name.
    pub fn connect(username: &str, addr: &SocketAddr) -> Result<(Self, ServerMessage), Error> {
        let mut connect_timeouts = vec![
            Duration::from_secs(1),
            Duration::from_millis(500),
            Duration::from_millis(100),
        ];
        while let Some(connect_timeout) = connect_timeouts.pop() {
            match TcpStream::connect_timeout(addr, connect_timeout) {
                Ok(mut stream) => {
                    stream.set_read_timeout(Some(READ_TIMEOUT))?;
                    stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
                    stream.write_all(format!("{username}\n").as_bytes())?;
                    let welcome = Self::recv_ack(&mut stream)?;
                    let client = Self {
                        username: Username::new(username),
                        stream,
                    };
                    return Ok((client, welcome));
                }
                _ => thread::sleep(connect_timeout),
            }
        }
        bail!("couldn't connect to {addr} as {username}")
    }

    pub fn recv_ack(stream: &mut TcpStream) -> Result<ServerMessage, Error> {
        match utils::read_prefixed(stream) {
            Ok(msg) if msg.kind == MessageType::ConnectAck => Ok(msg),
            Ok(msg) if msg.kind == MessageType::Error => bail!(msg.text),
            Ok(response) => bail!("invalid server response: {response}"),
            Err(error) => bail!(error),
        }
    }

    /// Next message of any kind.
    pub fn recv(&mut self) -> Result<ServerMessage, Error> {
        Ok(utils::read_prefixed(&mut self.stream)?)
    }

    /// Skips messages until one of `kind` shows up.
    pub fn recv_until(&mut self, kind: MessageType) -> Result<ServerMessage, Error> {
        for _ in 0..MAX_SKIPPED {
            let msg = self.recv()?;
            if msg.kind == kind {
                return Ok(msg);
            }
        }
        bail!("no {kind} message within {MAX_SKIPPED} messages")
    }

    /// Next message, which must be of `kind`.
    pub fn recv_kind(&mut self, kind: MessageType) -> Result<ServerMessage, Error> {
        let msg = self.recv()?;
        if msg.kind != kind {
            bail!("expected {kind}, got {msg}");
        }
        Ok(msg)
    }

    pub fn send_line(&mut self, line: &str) -> Result<(), Error> {
        self.stream.write_all(format!("{line}\n").as_bytes())?;
        Ok(())
    }

    pub fn chat(&mut self, text: &str) -> Result<(), Error> {
        self.send_line(&format!("msg {text}"))
    }

    pub fn challenge(&mut self, username: &str) -> Result<(), Error> {
        self.send_line(&format!("challenge {username}"))
    }

    pub fn accept(&mut self, username: Option<&str>) -> Result<(), Error> {
        match username {
            Some(username) => self.send_line(&format!("accept {username}")),
            None => self.send_line("accept"),
        }
    }

    pub fn play(&mut self, pit: usize) -> Result<(), Error> {
        self.send_line(&format!("move {pit}"))
    }

    pub fn watch(&mut self, match_id: MatchId) -> Result<(), Error> {
        self.send_line(&format!("watch {match_id}"))
    }

    pub fn quit_match(&mut self) -> Result<(), Error> {
        self.send_line("quit")
    }
}
