use chrono::Utc;
use log::{debug, info, warn};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::collections::BTreeMap;

use super::models::{Match, MatchId, MatchState, Outcome, Seat};
use crate::{
    game::{GameResult, functional::side},
    lobby::{ConnectionId, LobbyError, Outbox, Registry, Status, social},
    net::messages::{MessageType, ServerMessage},
};

/// Owns every match started since the process began. Finished matches stay
/// around for replays.
#[derive(Debug)]
pub struct MatchManager {
    matches: BTreeMap<MatchId, Match>,
    next_id: MatchId,
    rng: StdRng,
    max_matches: usize,
    max_replay_frames: usize,
}

impl MatchManager {
    #[must_use]
    pub fn new(max_matches: usize, max_replay_frames: usize) -> Self {
        Self::with_rng(max_matches, max_replay_frames, StdRng::from_os_rng())
    }

    /// Deterministic seat draws.
    #[must_use]
    pub fn with_seed(max_matches: usize, max_replay_frames: usize, seed: u64) -> Self {
        Self::with_rng(max_matches, max_replay_frames, StdRng::seed_from_u64(seed))
    }

    fn with_rng(max_matches: usize, max_replay_frames: usize, rng: StdRng) -> Self {
        Self {
            matches: BTreeMap::new(),
            next_id: 1,
            rng,
            max_matches,
            max_replay_frames,
        }
    }

    #[must_use]
    pub fn get(&self, id: MatchId) -> Option<&Match> {
        self.matches.get(&id)
    }

    /// Every match, live or finished, by id.
    pub fn iter(&self) -> impl Iterator<Item = &Match> {
        self.matches.values()
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.matches.values().filter(|m| m.is_live()).count()
    }

    pub fn ensure_capacity(&self) -> Result<(), LobbyError> {
        if self.live_count() >= self.max_matches {
            return Err(LobbyError::TooManyMatches {
                max: self.max_matches,
            });
        }
        Ok(())
    }

    /// Seats both players on a fresh board. Who moves first is a coin flip.
    pub fn start(
        &mut self,
        registry: &mut Registry,
        outbox: &mut Outbox,
        challenger: ConnectionId,
        accepter: ConnectionId,
    ) -> Result<MatchId, LobbyError> {
        self.ensure_capacity()?;
        let mut order = [challenger, accepter];
        if self.rng.random_bool(0.5) {
            order.swap(0, 1);
        }
        let seats = [seat(registry, order[0])?, seat(registry, order[1])?];

        let id = self.next_id;
        self.next_id += 1;
        let m = Match::new(id, seats);
        for (index, seat) in m.seats.iter().enumerate() {
            let identity = registry.identity_mut(seat.id)?;
            identity.status = Status::InMatch;
            identity.current_match = Some(id);
            identity.is_turn = index == 0;
        }

        let accepter_name = &m.seats[m.seat_of(accepter).unwrap_or(1)].name;
        outbox.send(
            challenger,
            MessageType::ChallengeResponse,
            format!("{accepter_name} accepted your challenge"),
        );
        for (index, seat) in m.seats.iter().enumerate() {
            let pits = side(index);
            let first = if index == 0 {
                "You play first".to_string()
            } else {
                format!("{} plays first", m.seats[0].name)
            };
            outbox.info(
                seat.id,
                format!(
                    "Match #{id} against {}: you are Player {} (pits {}-{}). {first}.",
                    m.seats[1 - index].name,
                    index + 1,
                    pits.start,
                    pits.end - 1
                ),
            );
        }
        outbox.broadcast(m.audience(), &board_update(&m));

        info!("match #{id} started: {}", m.title());
        self.matches.insert(id, m);
        Ok(id)
    }

    /// Plays `pit` for `actor` and broadcasts the result to seats and
    /// spectators, finishing the match when the board is terminal.
    pub fn apply_move(
        &mut self,
        registry: &mut Registry,
        outbox: &mut Outbox,
        actor: ConnectionId,
        pit: usize,
    ) -> Result<(), LobbyError> {
        let match_id = current_match(registry, actor)?;
        let m = self
            .matches
            .get_mut(&match_id)
            .filter(|m| m.is_live())
            .ok_or(LobbyError::NotInMatch)?;
        let seat = m.seat_of(actor).ok_or(LobbyError::NotInMatch)?;
        if m.board.current_player() != seat {
            return Err(LobbyError::NotYourTurn);
        }

        let report = m.board.apply_move(pit)?;
        let to_move = m.board.current_player();
        for (index, s) in m.seats.iter().enumerate() {
            if let Some(identity) = registry.get_mut(s.id) {
                identity.is_turn = index == to_move;
            }
        }

        if m.replay.len() < self.max_replay_frames {
            m.replay.push(m.board.render());
        } else {
            warn!(
                "match #{match_id}: replay log full ({} frames), dropping move",
                self.max_replay_frames
            );
        }

        let mover = &m.seats[seat].name;
        let capture = if report.captured > 0 {
            format!(", captured {}", report.captured)
        } else {
            String::new()
        };
        let notice = ServerMessage::new(
            MessageType::Move,
            format!("{mover} played pit {pit} ({} seeds){capture}", report.sown),
        );
        let audience = m.audience();
        outbox.broadcast(audience.iter().copied(), &notice);
        outbox.broadcast(audience, &board_update(m));
        debug!("match #{match_id}: {mover} played pit {pit}");

        if m.board.is_game_over() {
            let outcome = match m.board.result() {
                GameResult::Winner(player) => Outcome::Winner(m.seats[player].name.clone()),
                GameResult::Draw => Outcome::Draw,
            };
            self.finish(registry, outbox, match_id, outcome);
        }
        Ok(())
    }

    /// Voluntary forfeit. Nobody is credited.
    pub fn quit(
        &mut self,
        registry: &mut Registry,
        outbox: &mut Outbox,
        actor: ConnectionId,
    ) -> Result<(), LobbyError> {
        let match_id = current_match(registry, actor)?;
        if !self.matches.get(&match_id).is_some_and(Match::is_live) {
            return Err(LobbyError::NotInMatch);
        }
        let name = registry.identity(actor)?.name.clone();
        self.finish(registry, outbox, match_id, Outcome::Quit(name));
        Ok(())
    }

    /// Forfeit of a dropped connection. The remaining seat is credited.
    pub fn forfeit(&mut self, registry: &mut Registry, outbox: &mut Outbox, actor: ConnectionId) {
        let Ok(match_id) = current_match(registry, actor) else {
            return;
        };
        let Some(name) = registry.name(actor).cloned() else {
            return;
        };
        if self.matches.get(&match_id).is_some_and(Match::is_live) {
            self.finish(registry, outbox, match_id, Outcome::Disconnected(name));
        }
    }

    fn finish(
        &mut self,
        registry: &mut Registry,
        outbox: &mut Outbox,
        match_id: MatchId,
        outcome: Outcome,
    ) {
        let Some(m) = self.matches.get_mut(&match_id) else {
            return;
        };
        m.state = MatchState::Finished(outcome.clone());
        m.ended_at = Some(Utc::now());

        let credited = match &outcome {
            Outcome::Winner(name) => m.seats.iter().position(|s| &s.name == name),
            Outcome::Disconnected(name) => m.seats.iter().position(|s| &s.name != name),
            Outcome::Draw | Outcome::Quit(_) => None,
        };
        if let Some(identity) = credited.and_then(|seat| registry.get_mut(m.seats[seat].id)) {
            identity.wins += 1;
        }

        let [first, second] = m.board.scores();
        let text = match (&outcome, credited) {
            (Outcome::Winner(name), _) => format!("Game over! {name} wins {first}-{second}"),
            (Outcome::Draw, _) => format!("Game over! Draw {first}-{second}"),
            (Outcome::Quit(name), _) => format!("Game over! {name} left the match"),
            (Outcome::Disconnected(name), Some(seat)) => format!(
                "Game over! {name} disconnected, {} wins by forfeit",
                m.seats[seat].name
            ),
            (Outcome::Disconnected(name), None) => format!("Game over! {name} disconnected"),
        };
        outbox.broadcast(
            m.audience(),
            &ServerMessage::new(MessageType::GameOver, text),
        );

        for seat in &m.seats {
            if let Some(identity) = registry.get_mut(seat.id) {
                identity.reset_to_idle();
            }
        }
        info!("match #{match_id} finished: {outcome}");
    }

    pub fn watch(
        &mut self,
        registry: &Registry,
        outbox: &mut Outbox,
        viewer: ConnectionId,
        match_id: MatchId,
    ) -> Result<(), LobbyError> {
        let m = self
            .matches
            .get_mut(&match_id)
            .ok_or(LobbyError::NoSuchMatch(match_id))?;
        if !m.is_live() {
            return Err(LobbyError::MatchOver(match_id));
        }
        if m.seat_of(viewer).is_some() {
            return Err(LobbyError::AlreadySeated(match_id));
        }
        if !can_view(registry, viewer, m) {
            return Err(LobbyError::PrivateMatch(match_id));
        }

        if !m.spectators.insert(viewer) {
            outbox.info(viewer, format!("You are already watching match #{match_id}"));
            return Ok(());
        }
        outbox.info(viewer, format!("Now watching match #{match_id}: {}", m.title()));
        outbox.push(viewer, board_update(m));
        Ok(())
    }

    /// Leaves one match, or every match when `match_id` is `None`.
    pub fn unwatch(
        &mut self,
        outbox: &mut Outbox,
        viewer: ConnectionId,
        match_id: Option<MatchId>,
    ) -> Result<(), LobbyError> {
        match match_id {
            Some(match_id) => {
                let m = self
                    .matches
                    .get_mut(&match_id)
                    .ok_or(LobbyError::NoSuchMatch(match_id))?;
                if !m.spectators.remove(&viewer) {
                    return Err(LobbyError::NotWatching(match_id));
                }
                outbox.info(viewer, format!("Stopped watching match #{match_id}"));
            }
            None => {
                let left = self.drop_viewer(viewer);
                if left == 0 {
                    return Err(LobbyError::NotWatchingAny);
                }
                outbox.info(viewer, format!("Stopped watching {left} match(es)"));
            }
        }
        Ok(())
    }

    /// Removes `viewer` from every spectator set and returns how many it left.
    pub fn drop_viewer(&mut self, viewer: ConnectionId) -> usize {
        let mut left = 0;
        for m in self.matches.values_mut() {
            if m.spectators.remove(&viewer) {
                left += 1;
            }
        }
        left
    }

    /// Toggles privacy on the actor's match. Going private evicts spectators
    /// who aren't friends with either seat.
    pub fn set_private(
        &mut self,
        registry: &Registry,
        outbox: &mut Outbox,
        actor: ConnectionId,
        on: bool,
    ) -> Result<(), LobbyError> {
        let match_id = current_match(registry, actor)?;
        let m = self
            .matches
            .get_mut(&match_id)
            .filter(|m| m.is_live())
            .ok_or(LobbyError::NotInMatch)?;
        m.is_private = on;

        if on {
            let evicted: Vec<_> = m
                .spectators
                .iter()
                .copied()
                .filter(|&viewer| !can_view(registry, viewer, m))
                .collect();
            for viewer in evicted {
                m.spectators.remove(&viewer);
                outbox.info(
                    viewer,
                    format!("Match #{match_id} is now private, you stopped watching"),
                );
            }
        }

        let state = if on { "private" } else { "public" };
        for seat in &m.seats {
            outbox.info(seat.id, format!("Match #{match_id} is now {state}"));
        }
        Ok(())
    }

    /// One line per live match, in id order. Each call starts over.
    pub fn list_matches(&self) -> impl Iterator<Item = String> + '_ {
        self.matches
            .values()
            .filter(|m| m.is_live())
            .map(Match::summary)
    }

    /// Sends the stored frames of a live or finished match to `viewer`.
    pub fn replay(
        &self,
        registry: &Registry,
        outbox: &mut Outbox,
        viewer: ConnectionId,
        match_id: MatchId,
    ) -> Result<(), LobbyError> {
        let m = self
            .matches
            .get(&match_id)
            .ok_or(LobbyError::NoSuchMatch(match_id))?;
        if !can_view(registry, viewer, m) {
            return Err(LobbyError::PrivateMatch(match_id));
        }
        if m.replay.is_empty() {
            return Err(LobbyError::EmptyReplay(match_id));
        }

        let total = m.replay.len();
        let status = match &m.state {
            MatchState::Live => "in progress".to_string(),
            MatchState::Finished(outcome) => outcome.to_string(),
        };
        outbox.info(
            viewer,
            format!(
                "Replay of match #{match_id}: {} ({status}), {total} move(s), started {}",
                m.title(),
                m.started_at.format("%Y-%m-%d %H:%M:%S")
            ),
        );
        for (index, frame) in m.replay.iter().enumerate() {
            outbox.send(
                viewer,
                MessageType::ReplayData,
                format!("Move {}/{total}\n{frame}", index + 1),
            );
        }
        Ok(())
    }
}

fn seat(registry: &Registry, id: ConnectionId) -> Result<Seat, LobbyError> {
    let name = registry.identity(id)?.name.clone();
    Ok(Seat { id, name })
}

fn current_match(registry: &Registry, actor: ConnectionId) -> Result<MatchId, LobbyError> {
    registry
        .identity(actor)?
        .current_match
        .ok_or(LobbyError::NotInMatch)
}

/// Public matches are open to everyone; private ones to seats and their
/// friends.
fn can_view(registry: &Registry, viewer: ConnectionId, m: &Match) -> bool {
    !m.is_private
        || m.seat_of(viewer).is_some()
        || m
            .seats
            .iter()
            .any(|seat| social::is_friend(registry, viewer, &seat.name))
}

fn board_update(m: &Match) -> ServerMessage {
    ServerMessage::new(
        MessageType::BoardUpdate,
        format!("Match #{}: {}\n{}", m.id, m.title(), m.board.render()),
    )
}
