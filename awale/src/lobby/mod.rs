//! Session state shared by every connection.
//!
//! [`Lobby`] owns the connection registry, the challenge broker, the match
//! manager and the social ledger, and hands each of them the tables they
//! operate on. Handlers never write to sockets: they queue [`Envelope`]s
//! that the event loop drains and sends after every event.

pub mod challenges;
pub mod config;
pub mod errors;
pub mod models;
pub mod registry;
pub mod social;

pub use challenges::{ChallengeBroker, Retraction};
pub use config::LobbyConfig;
pub use errors::LobbyError;
pub use models::{ConnectionId, Envelope, Identity, Outbox, Status};
pub use registry::Registry;
pub use social::SocialLedger;

use log::{debug, info};
use serde_json::{Value, json};

use crate::{
    matches::MatchManager,
    net::messages::{Command, MessageType, ServerMessage},
};

#[derive(Debug)]
pub struct Lobby {
    config: LobbyConfig,
    registry: Registry,
    broker: ChallengeBroker,
    matches: MatchManager,
    social: SocialLedger,
    outbox: Outbox,
}

impl Lobby {
    #[must_use]
    pub fn new(config: LobbyConfig) -> Self {
        let matches = MatchManager::new(config.max_matches, config.max_replay_frames);
        Self::with_matches(config, matches)
    }

    /// Lobby whose seat draws are reproducible.
    #[must_use]
    pub fn with_seed(config: LobbyConfig, seed: u64) -> Self {
        let matches =
            MatchManager::with_seed(config.max_matches, config.max_replay_frames, seed);
        Self::with_matches(config, matches)
    }

    fn with_matches(config: LobbyConfig, matches: MatchManager) -> Self {
        Self {
            broker: ChallengeBroker::new(config.max_challenges),
            social: SocialLedger::new(config.max_friends),
            registry: Registry::new(),
            matches,
            outbox: Outbox::new(),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &LobbyConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub fn matches(&self) -> &MatchManager {
        &self.matches
    }

    #[must_use]
    pub fn is_registered(&self, id: ConnectionId) -> bool {
        self.registry.contains(id)
    }

    /// Handshake: the first line of a connection is its display name.
    ///
    /// On failure an error is queued for `id` and returned; the caller closes
    /// the connection once the error is flushed.
    pub fn register(&mut self, id: ConnectionId, raw_name: &str) -> Result<(), LobbyError> {
        let result = self.registry.register(
            id,
            raw_name,
            self.config.max_users,
            self.config.max_name_len,
        );
        match result {
            Ok(identity) => {
                let name = identity.name.clone();
                info!("{name} connected as {id}");
                self.outbox.send(
                    id,
                    MessageType::ConnectAck,
                    format!("Welcome {name}! Type 'list' to see who is online"),
                );
                Ok(())
            }
            Err(error) => {
                info!("rejected handshake from {id}: {error}");
                self.outbox.push(id, ServerMessage::error(error.to_string()));
                Err(error)
            }
        }
    }

    /// Removes a connection and everything hanging off it: its match is
    /// forfeited, its challenges and friend requests are withdrawn and it
    /// leaves every spectator set. Everyone left is told.
    pub fn unregister(&mut self, id: ConnectionId) {
        let Some(name) = self.registry.name(id).cloned() else {
            return;
        };
        self.matches
            .forfeit(&mut self.registry, &mut self.outbox, id);
        self.broker.retract_all(
            &mut self.registry,
            &mut self.outbox,
            id,
            Retraction::Disconnected,
        );
        self.social
            .drop_requests(&mut self.registry, &mut self.outbox, id);
        self.matches.drop_viewer(id);
        self.registry.remove(id);

        info!("{name} disconnected");
        let notice = ServerMessage::info(format!("{name} disconnected !"));
        self.outbox.broadcast(self.registry.ids(), &notice);
    }

    /// Parses and runs one line from a registered connection. Failures are
    /// reported to that connection only.
    pub fn handle_line(&mut self, id: ConnectionId, line: &str) {
        if !self.registry.contains(id) || line.trim().is_empty() {
            return;
        }
        let result = Command::parse(line)
            .map_err(LobbyError::from)
            .and_then(|command| self.handle_command(id, command));
        if let Err(error) = result {
            debug!("{id}: {error}");
            self.report_error(id, error.to_string());
        }
    }

    pub fn handle_command(&mut self, id: ConnectionId, command: Command) -> Result<(), LobbyError> {
        debug!("{id}: {}", command.keyword());
        let (registry, outbox) = (&mut self.registry, &mut self.outbox);
        match command {
            Command::Chat(text) => self.chat(id, &text),
            Command::ListUsers => self.list_users(id),
            Command::SetBio(bio) => self.set_bio(id, bio),
            Command::GetBio(name) => self.get_bio(id, &name),
            Command::PrivateMessage { to, text } => self.private_message(id, &to, &text),
            Command::Challenge(target) => self.broker.challenge(registry, outbox, id, &target),
            Command::Accept(name) => self.accept(id, name.as_deref()),
            Command::Refuse(name) => self.broker.refuse(registry, outbox, id, name.as_deref()),
            Command::Cancel(name) => self.broker.cancel(registry, outbox, id, name.as_deref()),
            Command::Move(pit) => self.matches.apply_move(registry, outbox, id, pit),
            Command::Quit => self.matches.quit(registry, outbox, id),
            Command::Games => self.games(id),
            Command::Watch(match_id) => self.matches.watch(registry, outbox, id, match_id),
            Command::Unwatch(match_id) => self.matches.unwatch(outbox, id, match_id),
            Command::WatchReplay(match_id) => self.matches.replay(registry, outbox, id, match_id),
            Command::AddFriend(name) => self.social.add_friend(registry, outbox, id, &name),
            Command::AcceptFriend(name) => {
                self.social
                    .accept_friend(registry, outbox, id, name.as_deref())
            }
            Command::RefuseFriend(name) => {
                self.social
                    .refuse_friend(registry, outbox, id, name.as_deref())
            }
            Command::Private(on) => self.matches.set_private(registry, outbox, id, on),
            Command::Friends => self.friends(id),
            Command::Ranking => self.ranking(id),
        }
    }

    pub fn report_error(&mut self, id: ConnectionId, text: impl Into<String>) {
        self.outbox.push(id, ServerMessage::error(text));
    }

    /// Messages queued since the last drain, in the order they were produced.
    pub fn drain_outbox(&mut self) -> Vec<Envelope> {
        self.outbox.drain()
    }

    /// JSON view of connections, matches and the ranking for the control
    /// channel.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        let connections: Vec<Value> = self
            .registry
            .iter()
            .map(|identity| {
                json!({
                    "id": identity.id,
                    "name": identity.name,
                    "status": identity.status,
                    "match": identity.current_match,
                    "wins": identity.wins,
                })
            })
            .collect();
        let live: Vec<Value> = self
            .matches
            .iter()
            .filter(|m| m.is_live())
            .map(|m| {
                json!({
                    "id": m.id,
                    "players": m.title(),
                    "moves": m.replay.len(),
                    "private": m.is_private,
                    "spectators": m.spectators.len(),
                    "started_at": m.started_at,
                })
            })
            .collect();
        let finished = self.matches.iter().filter(|m| !m.is_live()).count();
        json!({
            "connections": connections,
            "live_matches": live,
            "finished_matches": finished,
            "ranking": self.social.ranking(&self.registry),
        })
    }

    fn accept(&mut self, id: ConnectionId, name: Option<&str>) -> Result<(), LobbyError> {
        self.matches.ensure_capacity()?;
        let challenger = self.broker.accept(&mut self.registry, id, name)?;
        for player in [challenger, id] {
            self.broker.retract_all(
                &mut self.registry,
                &mut self.outbox,
                player,
                Retraction::MatchStarted,
            );
        }
        self.matches
            .start(&mut self.registry, &mut self.outbox, challenger, id)?;
        Ok(())
    }

    fn chat(&mut self, id: ConnectionId, text: &str) -> Result<(), LobbyError> {
        let name = self.registry.identity(id)?.name.clone();
        let msg = ServerMessage::new(MessageType::Chat, format!("{name}: {text}"));
        let others = self.registry.ids().into_iter().filter(|&other| other != id);
        self.outbox.broadcast(others, &msg);
        self.outbox.info(id, "Message received");
        Ok(())
    }

    fn list_users(&mut self, id: ConnectionId) -> Result<(), LobbyError> {
        let mut lines = vec![format!("Connected users ({}):", self.registry.len())];
        lines.extend(self.registry.iter().map(|identity| {
            format!(
                "{} [{}] - {}",
                identity.name,
                identity.status,
                identity.bio_or_default()
            )
        }));
        self.outbox
            .send(id, MessageType::UserList, lines.join("\n"));
        Ok(())
    }

    fn set_bio(&mut self, id: ConnectionId, bio: String) -> Result<(), LobbyError> {
        let max = self.config.max_bio_len;
        if bio.chars().count() > max {
            return Err(LobbyError::BioTooLong { max });
        }
        let text = format!("Bio updated: {bio}");
        self.registry.identity_mut(id)?.bio = Some(bio);
        self.outbox.send(id, MessageType::BioSet, text);
        Ok(())
    }

    fn get_bio(&mut self, id: ConnectionId, name: &str) -> Result<(), LobbyError> {
        let target = self
            .registry
            .find(name)
            .ok_or_else(|| LobbyError::UserNotFound(name.to_string()))?;
        let identity = self.registry.identity(target)?;
        let text = format!("{}: {}", identity.name, identity.bio_or_default());
        self.outbox.send(id, MessageType::BioInfo, text);
        Ok(())
    }

    fn private_message(&mut self, id: ConnectionId, to: &str, text: &str) -> Result<(), LobbyError> {
        let target = self
            .registry
            .find(to)
            .ok_or_else(|| LobbyError::UserNotFound(to.to_string()))?;
        if target == id {
            return Err(LobbyError::SelfMessage);
        }
        let name = self.registry.identity(id)?.name.clone();
        self.outbox.send(
            target,
            MessageType::PrivateChat,
            format!("[PM from {name}] {text}"),
        );
        self.outbox.info(id, format!("PM sent to {to}"));
        Ok(())
    }

    fn games(&mut self, id: ConnectionId) -> Result<(), LobbyError> {
        let lines: Vec<String> = self.matches.list_matches().collect();
        if lines.is_empty() {
            self.outbox.info(id, "No live matches");
        } else {
            self.outbox.send(
                id,
                MessageType::MatchList,
                format!("Live matches:\n{}", lines.join("\n")),
            );
        }
        Ok(())
    }

    fn friends(&mut self, id: ConnectionId) -> Result<(), LobbyError> {
        let lines = self.social.friend_list(&self.registry, id);
        let text = if lines.is_empty() {
            "You have no friends yet".to_string()
        } else {
            lines.join("\n")
        };
        self.outbox.send(id, MessageType::FriendList, text);
        Ok(())
    }

    fn ranking(&mut self, id: ConnectionId) -> Result<(), LobbyError> {
        let text = format!("Ranking:\n{}", self.social.ranking(&self.registry).join("\n"));
        self.outbox.send(id, MessageType::RankList, text);
        Ok(())
    }
}
