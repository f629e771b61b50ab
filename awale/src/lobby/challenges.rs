//! Challenge edges between identities.
//!
//! An edge `(challenger, challenged)` lives on both identities: the
//! challenger's `outgoing` list and the target's `incoming` list. Every
//! operation here keeps the two in step.

use super::{
    errors::LobbyError,
    models::{ConnectionId, Outbox, Status},
    registry::Registry,
};
use crate::net::messages::MessageType;

/// Why an identity's edges are retracted wholesale.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Retraction {
    MatchStarted,
    Disconnected,
}

impl Retraction {
    fn reason(self) -> &'static str {
        match self {
            Self::MatchStarted => "now in a match",
            Self::Disconnected => "disconnected",
        }
    }
}

#[derive(Debug)]
pub struct ChallengeBroker {
    max_challenges: usize,
}

impl ChallengeBroker {
    #[must_use]
    pub fn new(max_challenges: usize) -> Self {
        Self { max_challenges }
    }

    /// Opens an edge from `from` to the identity named `target`.
    pub fn challenge(
        &self,
        registry: &mut Registry,
        outbox: &mut Outbox,
        from: ConnectionId,
        target: &str,
    ) -> Result<(), LobbyError> {
        let challenger = registry.identity(from)?;
        let from_name = challenger.name.clone();
        if from_name.as_str() == target {
            return Err(LobbyError::SelfChallenge);
        }
        if challenger.status == Status::InMatch {
            return Err(LobbyError::AlreadyInMatch);
        }
        let to = registry
            .find(target)
            .ok_or_else(|| LobbyError::UserNotFound(target.to_string()))?;
        if challenger.outgoing.contains(&to) {
            return Err(LobbyError::AlreadyPending(target.to_string()));
        }
        let challenged = registry.identity(to)?;
        if challenged.status != Status::Idle {
            return Err(LobbyError::TargetBusy(target.to_string()));
        }
        if challenger.outgoing.len() >= self.max_challenges
            || challenged.incoming.len() >= self.max_challenges
        {
            return Err(LobbyError::TooManyChallenges {
                max: self.max_challenges,
            });
        }

        let challenger = registry.identity_mut(from)?;
        challenger.outgoing.push(to);
        challenger.status = Status::AwaitingAccept;
        registry.identity_mut(to)?.incoming.push(from);

        outbox.send(
            to,
            MessageType::Challenge,
            format!("{from_name} challenges you! Type 'accept {from_name}' or 'refuse {from_name}'"),
        );
        outbox.info(from, format!("Challenge sent to {target}"));
        Ok(())
    }

    /// Consumes the incoming edge picked by `name` and returns the
    /// challenger. Starting the match is up to the caller.
    pub fn accept(
        &self,
        registry: &mut Registry,
        by: ConnectionId,
        name: Option<&str>,
    ) -> Result<ConnectionId, LobbyError> {
        let challenger = pick(registry, &registry.identity(by)?.incoming, name)?;
        unlink(registry, challenger, by);
        Ok(challenger)
    }

    pub fn refuse(
        &self,
        registry: &mut Registry,
        outbox: &mut Outbox,
        by: ConnectionId,
        name: Option<&str>,
    ) -> Result<(), LobbyError> {
        let challenger = pick(registry, &registry.identity(by)?.incoming, name)?;
        unlink(registry, challenger, by);
        settle(registry, challenger);

        let by_name = registry.identity(by)?.name.clone();
        let challenger_name = registry.identity(challenger)?.name.clone();
        outbox.send(
            challenger,
            MessageType::ChallengeResponse,
            format!("{by_name} refused your challenge"),
        );
        outbox.info(by, format!("You refused the challenge from {challenger_name}"));
        Ok(())
    }

    /// Withdraws an outgoing edge. The canceller goes back to idle once no
    /// outgoing challenge remains.
    pub fn cancel(
        &self,
        registry: &mut Registry,
        outbox: &mut Outbox,
        by: ConnectionId,
        name: Option<&str>,
    ) -> Result<(), LobbyError> {
        let target = pick(registry, &registry.identity(by)?.outgoing, name)?;
        unlink(registry, by, target);
        settle(registry, by);

        let by_name = registry.identity(by)?.name.clone();
        let target_name = registry.identity(target)?.name.clone();
        outbox.send(
            target,
            MessageType::ChallengeResponse,
            format!("{by_name} cancelled the challenge"),
        );
        outbox.info(by, format!("Challenge to {target_name} cancelled"));
        Ok(())
    }

    /// Removes every edge touching `id` and tells each counterparty.
    pub fn retract_all(
        &self,
        registry: &mut Registry,
        outbox: &mut Outbox,
        id: ConnectionId,
        why: Retraction,
    ) {
        let Some(identity) = registry.get_mut(id) else {
            return;
        };
        let outgoing = std::mem::take(&mut identity.outgoing);
        let incoming = std::mem::take(&mut identity.incoming);
        let name = identity.name.clone();
        settle(registry, id);

        for target in outgoing {
            if let Some(challenged) = registry.get_mut(target) {
                challenged.incoming.retain(|&c| c != id);
                outbox.send(
                    target,
                    MessageType::ChallengeResponse,
                    format!("{name} withdrew the challenge ({})", why.reason()),
                );
            }
        }
        for challenger in incoming {
            if let Some(identity) = registry.get_mut(challenger) {
                identity.outgoing.retain(|&t| t != id);
                settle(registry, challenger);
                outbox.send(
                    challenger,
                    MessageType::ChallengeResponse,
                    format!("Your challenge to {name} was withdrawn ({})", why.reason()),
                );
            }
        }
    }
}

/// Picks the counterparty of one edge among `candidates`, by name when given.
fn pick(
    registry: &Registry,
    candidates: &[ConnectionId],
    name: Option<&str>,
) -> Result<ConnectionId, LobbyError> {
    match name {
        Some(name) => registry
            .find(name)
            .filter(|id| candidates.contains(id))
            .ok_or_else(|| LobbyError::NoChallengeWith(name.to_string())),
        None => match candidates {
            [] => Err(LobbyError::NoPendingChallenge),
            [only] => Ok(*only),
            many => {
                let names: Vec<_> = many
                    .iter()
                    .filter_map(|&id| registry.name(id))
                    .map(|name| name.as_str())
                    .collect();
                Err(LobbyError::AmbiguousChallenge(names.join(", ")))
            }
        },
    }
}

fn unlink(registry: &mut Registry, challenger: ConnectionId, challenged: ConnectionId) {
    if let Some(identity) = registry.get_mut(challenger) {
        identity.outgoing.retain(|&t| t != challenged);
    }
    if let Some(identity) = registry.get_mut(challenged) {
        identity.incoming.retain(|&c| c != challenger);
    }
}

/// An identity waiting on nobody is idle again.
fn settle(registry: &mut Registry, id: ConnectionId) {
    if let Some(identity) = registry.get_mut(id) {
        if identity.status == Status::AwaitingAccept && identity.outgoing.is_empty() {
            identity.status = Status::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: ConnectionId = ConnectionId(2);
    const B: ConnectionId = ConnectionId(3);
    const C: ConnectionId = ConnectionId(4);

    fn setup() -> (Registry, Outbox, ChallengeBroker) {
        let mut registry = Registry::new();
        for (id, name) in [(A, "alice"), (B, "bob"), (C, "carol")] {
            registry.register(id, name, 10, 31).unwrap();
        }
        (registry, Outbox::new(), ChallengeBroker::new(4))
    }

    #[test]
    fn challenge_links_both_sides_and_notifies() {
        let (mut registry, mut outbox, broker) = setup();
        broker.challenge(&mut registry, &mut outbox, A, "bob").unwrap();
        assert_eq!(registry.get(A).unwrap().outgoing, vec![B]);
        assert_eq!(registry.get(B).unwrap().incoming, vec![A]);
        assert_eq!(registry.get(A).unwrap().status, Status::AwaitingAccept);
        let sent = outbox.drain();
        assert_eq!(sent[0].to, B);
        assert_eq!(sent[0].message.kind, MessageType::Challenge);
    }

    #[test]
    fn challenge_rejections() {
        let (mut registry, mut outbox, broker) = setup();
        assert_eq!(
            broker.challenge(&mut registry, &mut outbox, A, "alice"),
            Err(LobbyError::SelfChallenge)
        );
        assert_eq!(
            broker.challenge(&mut registry, &mut outbox, A, "dave"),
            Err(LobbyError::UserNotFound("dave".to_string()))
        );
        broker.challenge(&mut registry, &mut outbox, A, "bob").unwrap();
        assert_eq!(
            broker.challenge(&mut registry, &mut outbox, A, "bob"),
            Err(LobbyError::AlreadyPending("bob".to_string()))
        );
        // Alice is waiting on an answer, so she isn't idle.
        assert_eq!(
            broker.challenge(&mut registry, &mut outbox, C, "alice"),
            Err(LobbyError::TargetBusy("alice".to_string()))
        );
        registry.get_mut(C).unwrap().status = Status::InMatch;
        assert_eq!(
            broker.challenge(&mut registry, &mut outbox, C, "bob"),
            Err(LobbyError::AlreadyInMatch)
        );
    }

    #[test]
    fn challenge_capacity_is_enforced() {
        let (mut registry, mut outbox, _) = setup();
        let broker = ChallengeBroker::new(1);
        broker.challenge(&mut registry, &mut outbox, A, "bob").unwrap();
        assert_eq!(
            broker.challenge(&mut registry, &mut outbox, A, "carol"),
            Err(LobbyError::TooManyChallenges { max: 1 })
        );
    }

    #[test]
    fn accept_needs_a_name_when_ambiguous() {
        let (mut registry, mut outbox, broker) = setup();
        broker.challenge(&mut registry, &mut outbox, A, "carol").unwrap();
        broker.challenge(&mut registry, &mut outbox, B, "carol").unwrap();
        assert_eq!(
            broker.accept(&mut registry, C, None),
            Err(LobbyError::AmbiguousChallenge("alice, bob".to_string()))
        );
        assert_eq!(broker.accept(&mut registry, C, Some("bob")), Ok(B));
        assert_eq!(registry.get(C).unwrap().incoming, vec![A]);
        assert!(registry.get(B).unwrap().outgoing.is_empty());
        assert_eq!(
            broker.accept(&mut registry, C, Some("bob")),
            Err(LobbyError::NoChallengeWith("bob".to_string()))
        );
    }

    #[test]
    fn refuse_returns_challenger_to_idle() {
        let (mut registry, mut outbox, broker) = setup();
        broker.challenge(&mut registry, &mut outbox, A, "bob").unwrap();
        outbox.drain();
        broker.refuse(&mut registry, &mut outbox, B, None).unwrap();
        assert_eq!(registry.get(A).unwrap().status, Status::Idle);
        assert!(registry.get(B).unwrap().incoming.is_empty());
        let sent = outbox.drain();
        assert_eq!(sent[0].to, A);
        assert_eq!(sent[0].message.kind, MessageType::ChallengeResponse);
        assert_eq!(sent[0].message.text, "bob refused your challenge");
        assert_eq!(
            broker.refuse(&mut registry, &mut outbox, B, None),
            Err(LobbyError::NoPendingChallenge)
        );
    }

    #[test]
    fn cancel_keeps_waiting_while_other_challenges_remain() {
        let (mut registry, mut outbox, broker) = setup();
        broker.challenge(&mut registry, &mut outbox, A, "bob").unwrap();
        broker.challenge(&mut registry, &mut outbox, A, "carol").unwrap();
        broker
            .cancel(&mut registry, &mut outbox, A, Some("bob"))
            .unwrap();
        assert_eq!(registry.get(A).unwrap().status, Status::AwaitingAccept);
        broker.cancel(&mut registry, &mut outbox, A, None).unwrap();
        assert_eq!(registry.get(A).unwrap().status, Status::Idle);
        assert!(registry.get(C).unwrap().incoming.is_empty());
    }

    #[test]
    fn retract_all_clears_every_edge() {
        let (mut registry, mut outbox, broker) = setup();
        broker.challenge(&mut registry, &mut outbox, A, "carol").unwrap();
        broker.challenge(&mut registry, &mut outbox, B, "alice").unwrap_err();
        broker.challenge(&mut registry, &mut outbox, C, "bob").unwrap();
        outbox.drain();

        broker.retract_all(&mut registry, &mut outbox, C, Retraction::Disconnected);
        assert!(registry.get(A).unwrap().outgoing.is_empty());
        assert_eq!(registry.get(A).unwrap().status, Status::Idle);
        assert!(registry.get(B).unwrap().incoming.is_empty());
        let recipients: Vec<_> = outbox.drain().into_iter().map(|e| e.to).collect();
        assert_eq!(recipients, vec![B, A]);
    }
}
