//! Single-threaded event loop.
//!
//! One `mio::Poll` multiplexes the listener, every client socket and a
//! waker fed by the stdin control thread. Lines are handed to the
//! [`Lobby`] one at a time, so lobby state needs no locking. Replies are
//! queued per connection and written as the sockets allow.

use anyhow::Error;
use log::{debug, error, info, warn};
use mio::{
    Events, Interest, Poll, Registry, Token, Waker,
    event::Event,
    net::{TcpListener, TcpStream},
};
use std::{
    collections::HashMap,
    io::{self, BufRead, Read, Write},
    net::SocketAddr,
    sync::{
        Arc,
        mpsc::{self, Receiver},
    },
    thread,
};

use super::{
    errors::FrameError,
    utils::{self, LineBuffer, MAX_OUTBOUND},
};
use crate::lobby::{ConnectionId, Lobby, LobbyConfig};

const SERVER: Token = Token(0);
const WAKER: Token = Token(1);
const FIRST_CLIENT: usize = 2;

const READ_CHUNK: usize = 4096;

#[derive(Clone, Debug, Default)]
pub struct AwaleConfig {
    pub lobby: LobbyConfig,
    /// Read `status` / `quit` commands from stdin.
    pub stdin_control: bool,
}

/// Binds `addr` and serves until `quit` arrives on the control channel.
///
/// # Errors
///
/// Only setup failures (invalid limits, bind, poll registration) and a
/// failing poll are fatal.
pub fn run(addr: SocketAddr, config: AwaleConfig) -> Result<(), Error> {
    config.lobby.validate().map_err(Error::msg)?;

    let mut poll = Poll::new()?;
    let mut listener = TcpListener::bind(addr)?;
    poll.registry()
        .register(&mut listener, SERVER, Interest::READABLE)?;
    let waker = Arc::new(Waker::new(poll.registry(), WAKER)?);
    let control = config.stdin_control.then(|| spawn_control(waker));
    info!("listening on {}", listener.local_addr()?);

    let mut server = Server::new(Lobby::new(config.lobby));
    let mut events = Events::with_capacity(1024);
    loop {
        if let Err(error) = poll.poll(&mut events, None) {
            if error.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            error!("poll failed: {error}");
            return Err(error.into());
        }

        for event in &events {
            match event.token() {
                SERVER => server.accept(&listener, poll.registry()),
                WAKER => {
                    if let Some(control) = &control {
                        if server.control(control) == Control::Quit {
                            info!("shutting down");
                            return Ok(());
                        }
                    }
                }
                token => server.client_event(token, event),
            }
        }

        // Removing a connection queues notices for others, which may in turn
        // reveal more broken peers.
        loop {
            server.flush(poll.registry());
            if !server.reap(poll.registry()) {
                break;
            }
        }
    }
}

fn spawn_control(waker: Arc<Waker>) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.send(line).is_err() || waker.wake().is_err() {
                break;
            }
        }
    });
    rx
}

#[derive(Debug, Eq, PartialEq)]
enum Control {
    Continue,
    Quit,
}

/// Socket plus its inbound line buffer and outbound byte queue.
struct Connection {
    stream: TcpStream,
    addr: SocketAddr,
    lines: LineBuffer,
    outbound: Vec<u8>,
    writable_interest: bool,
    /// Peer closed its side.
    eof: bool,
    /// A read or write failed.
    broken: bool,
    /// Close once everything queued has been written.
    closing: bool,
}

impl Connection {
    fn new(stream: TcpStream, addr: SocketAddr) -> Self {
        Self {
            stream,
            addr,
            lines: LineBuffer::new(),
            outbound: Vec::new(),
            writable_interest: false,
            eof: false,
            broken: false,
            closing: false,
        }
    }

    /// Reads until the socket would block. Returns complete lines and
    /// over-long line errors in arrival order.
    fn read_lines(&mut self) -> io::Result<Vec<Result<String, FrameError>>> {
        let mut lines = Vec::new();
        let mut buf = [0; READ_CHUNK];
        loop {
            match self.stream.read(&mut buf) {
                Ok(0) => {
                    self.eof = true;
                    break;
                }
                Ok(n) => {
                    self.lines.extend(&buf[..n]);
                    lines.extend(std::iter::from_fn(|| self.lines.next_line()));
                }
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => break,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => return Err(error),
            }
        }
        Ok(lines)
    }

    fn flush(&mut self) -> io::Result<()> {
        while !self.outbound.is_empty() {
            match self.stream.write(&self.outbound) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => {
                    self.outbound.drain(..n);
                }
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => break,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => return Err(error),
            }
        }
        Ok(())
    }

    /// Asks for writable events only while bytes are waiting.
    fn update_interest(&mut self, registry: &Registry, token: Token) -> io::Result<()> {
        let want_writable = !self.outbound.is_empty();
        if want_writable != self.writable_interest {
            let interest = if want_writable {
                Interest::READABLE | Interest::WRITABLE
            } else {
                Interest::READABLE
            };
            registry.reregister(&mut self.stream, token, interest)?;
            self.writable_interest = want_writable;
        }
        Ok(())
    }

    fn is_done(&self) -> bool {
        self.eof || self.broken || (self.closing && self.outbound.is_empty())
    }
}

struct Server {
    lobby: Lobby,
    connections: HashMap<Token, Connection>,
    next_token: usize,
}

impl Server {
    fn new(lobby: Lobby) -> Self {
        Self {
            lobby,
            connections: HashMap::new(),
            next_token: FIRST_CLIENT,
        }
    }

    fn accept(&mut self, listener: &TcpListener, registry: &Registry) {
        loop {
            match listener.accept() {
                Ok((mut stream, addr)) => {
                    let token = Token(self.next_token);
                    self.next_token += 1;
                    if let Err(error) = registry.register(&mut stream, token, Interest::READABLE) {
                        warn!("couldn't register {addr}: {error}");
                        continue;
                    }
                    debug!("accepted {addr} as {}", ConnectionId(token.0));
                    self.connections.insert(token, Connection::new(stream, addr));
                }
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => break,
                Err(error) => {
                    warn!("accept failed: {error}");
                    break;
                }
            }
        }
    }

    fn client_event(&mut self, token: Token, event: &Event) {
        if !event.is_readable() {
            // Writable events are served by the flush after every iteration.
            return;
        }
        let Some(conn) = self.connections.get_mut(&token) else {
            return;
        };
        let lines = match conn.read_lines() {
            Ok(lines) => lines,
            Err(error) => {
                warn!("read from {} failed: {error}", conn.addr);
                conn.broken = true;
                return;
            }
        };

        let id = ConnectionId(token.0);
        for line in lines {
            if conn.closing {
                break;
            }
            match line {
                Err(error) => {
                    warn!("{}: {error}", conn.addr);
                    self.lobby.report_error(id, error.to_string());
                }
                Ok(line) if self.lobby.is_registered(id) => self.lobby.handle_line(id, &line),
                Ok(line) => {
                    if self.lobby.register(id, &line).is_err() {
                        conn.closing = true;
                    }
                }
            }
        }
    }

    fn control(&mut self, control: &Receiver<String>) -> Control {
        for line in control.try_iter() {
            match line.trim() {
                "quit" => return Control::Quit,
                "status" => match serde_json::to_string_pretty(&self.lobby.snapshot()) {
                    Ok(status) => info!("status:\n{status}"),
                    Err(error) => warn!("couldn't serialize status: {error}"),
                },
                "" => {}
                other => warn!("unknown control command '{other}', expected 'status' or 'quit'"),
            }
        }
        Control::Continue
    }

    /// Moves queued lobby messages into connection buffers and writes as
    /// much as each socket takes.
    fn flush(&mut self, registry: &Registry) {
        for envelope in self.lobby.drain_outbox() {
            let Some(conn) = self.connections.get_mut(&Token(envelope.to.0)) else {
                continue;
            };
            if conn.broken {
                continue;
            }
            match utils::encode_frame(&envelope.message) {
                Ok(frame) => conn.outbound.extend(frame),
                Err(error) => warn!("dropping message to {}: {error}", conn.addr),
            }
        }

        for (&token, conn) in &mut self.connections {
            if conn.broken || (conn.outbound.is_empty() && !conn.writable_interest) {
                continue;
            }
            let result = conn
                .flush()
                .and_then(|()| conn.update_interest(registry, token));
            if let Err(error) = result {
                warn!("send to {} failed: {error}", conn.addr);
                conn.broken = true;
            } else if conn.outbound.len() > MAX_OUTBOUND {
                warn!(
                    "{} is not reading, dropping it with {} bytes queued",
                    conn.addr,
                    conn.outbound.len()
                );
                conn.outbound.clear();
                conn.broken = true;
            }
        }
    }

    /// Drops finished connections and runs the lobby's unregister cascade
    /// for each. Returns whether anything was removed.
    fn reap(&mut self, registry: &Registry) -> bool {
        let done: Vec<Token> = self
            .connections
            .iter()
            .filter(|(_, conn)| conn.is_done())
            .map(|(&token, _)| token)
            .collect();
        for token in &done {
            if let Some(mut conn) = self.connections.remove(token) {
                if let Err(error) = registry.deregister(&mut conn.stream) {
                    debug!("deregister {} failed: {error}", conn.addr);
                }
                info!("{} closed", conn.addr);
                self.lobby.unregister(ConnectionId(token.0));
            }
        }
        !done.is_empty()
    }
}
