//! Friend requests, friendships and the win ranking.
//!
//! Unlike challenges, an identity has at most one outgoing and one incoming
//! friend request at a time.

use super::{
    errors::LobbyError,
    models::{ConnectionId, Outbox},
    registry::Registry,
};
use crate::{game::Username, net::messages::MessageType};

/// Whether `viewer` counts `other` among its friends.
#[must_use]
pub fn is_friend(registry: &Registry, viewer: ConnectionId, other: &Username) -> bool {
    registry
        .get(viewer)
        .is_some_and(|identity| identity.friends.contains(other))
}

#[derive(Debug)]
pub struct SocialLedger {
    max_friends: usize,
}

impl SocialLedger {
    #[must_use]
    pub fn new(max_friends: usize) -> Self {
        Self { max_friends }
    }

    pub fn add_friend(
        &self,
        registry: &mut Registry,
        outbox: &mut Outbox,
        from: ConnectionId,
        target: &str,
    ) -> Result<(), LobbyError> {
        let sender = registry.identity(from)?;
        if sender.name.as_str() == target {
            return Err(LobbyError::SelfFriend);
        }
        let to = registry
            .find(target)
            .ok_or_else(|| LobbyError::UserNotFound(target.to_string()))?;
        if sender.friends.contains(target) {
            return Err(LobbyError::AlreadyFriends(target.to_string()));
        }
        if sender.pending_friend_to.is_some() {
            return Err(LobbyError::FriendRequestPending);
        }
        if sender.friends.len() >= self.max_friends {
            return Err(LobbyError::FriendListFull {
                max: self.max_friends,
            });
        }
        let receiver = registry.identity(to)?;
        if receiver.pending_friend_from.is_some() {
            return Err(LobbyError::TargetRequestPending(target.to_string()));
        }

        let from_name = sender.name.clone();
        let to_name = receiver.name.clone();
        registry.identity_mut(from)?.pending_friend_to = Some(to_name.clone());
        registry.identity_mut(to)?.pending_friend_from = Some(from_name.clone());

        outbox.send(
            to,
            MessageType::FriendRequest,
            format!("{from_name} wants to be your friend. Type 'acceptfriend' or 'refusefriend'"),
        );
        outbox.info(from, format!("Friend request sent to {to_name}"));
        Ok(())
    }

    /// Links both identities as friends. Both lists must have room.
    pub fn accept_friend(
        &self,
        registry: &mut Registry,
        outbox: &mut Outbox,
        by: ConnectionId,
        name: Option<&str>,
    ) -> Result<(), LobbyError> {
        let (sender_name, sender) = self.pending_from(registry, by, name)?;
        let full = [by, sender].iter().any(|&id| {
            registry
                .get(id)
                .is_some_and(|identity| identity.friends.len() >= self.max_friends)
        });
        if full {
            return Err(LobbyError::FriendListFull {
                max: self.max_friends,
            });
        }

        let acceptor = registry.identity_mut(by)?;
        acceptor.pending_friend_from = None;
        acceptor.friends.insert(sender_name.clone());
        let by_name = acceptor.name.clone();
        let requester = registry.identity_mut(sender)?;
        requester.pending_friend_to = None;
        requester.friends.insert(by_name.clone());

        outbox.send(
            sender,
            MessageType::FriendResponse,
            format!("{by_name} accepted your friend request"),
        );
        outbox.send(
            by,
            MessageType::FriendResponse,
            format!("You are now friends with {sender_name}"),
        );
        Ok(())
    }

    pub fn refuse_friend(
        &self,
        registry: &mut Registry,
        outbox: &mut Outbox,
        by: ConnectionId,
        name: Option<&str>,
    ) -> Result<(), LobbyError> {
        let (sender_name, sender) = self.pending_from(registry, by, name)?;
        let refuser = registry.identity_mut(by)?;
        refuser.pending_friend_from = None;
        let by_name = refuser.name.clone();
        registry.identity_mut(sender)?.pending_friend_to = None;

        outbox.send(
            sender,
            MessageType::FriendResponse,
            format!("{by_name} refused your friend request"),
        );
        outbox.info(by, format!("You refused the friend request from {sender_name}"));
        Ok(())
    }

    /// Clears both request slots touching a departing identity.
    /// Established friendships are kept.
    pub fn drop_requests(&self, registry: &mut Registry, outbox: &mut Outbox, id: ConnectionId) {
        let Some(identity) = registry.get_mut(id) else {
            return;
        };
        let name = identity.name.clone();
        let sent = identity.pending_friend_to.take();
        let received = identity.pending_friend_from.take();

        if let Some(to) = sent.and_then(|name| registry.find(name.as_str())) {
            if let Some(receiver) = registry.get_mut(to) {
                receiver.pending_friend_from = None;
            }
            outbox.info(to, format!("Friend request from {name} withdrawn"));
        }
        if let Some(from) = received.and_then(|name| registry.find(name.as_str())) {
            if let Some(sender) = registry.get_mut(from) {
                sender.pending_friend_to = None;
            }
            outbox.info(from, format!("Friend request to {name} cancelled"));
        }
    }

    /// Friends marked online or offline, then pending requests.
    #[must_use]
    pub fn friend_list(&self, registry: &Registry, id: ConnectionId) -> Vec<String> {
        let Some(identity) = registry.get(id) else {
            return Vec::new();
        };
        let mut lines: Vec<String> = identity
            .friends
            .iter()
            .map(|friend| {
                let presence = if registry.find(friend.as_str()).is_some() {
                    "online"
                } else {
                    "offline"
                };
                format!("{friend} ({presence})")
            })
            .collect();
        if let Some(from) = &identity.pending_friend_from {
            lines.push(format!("Pending request from {from}"));
        }
        if let Some(to) = &identity.pending_friend_to {
            lines.push(format!("Pending request to {to}"));
        }
        lines
    }

    /// Registered identities by wins, descending. Ties keep registration
    /// order.
    #[must_use]
    pub fn ranking(&self, registry: &Registry) -> Vec<String> {
        let mut identities: Vec<_> = registry.iter().collect();
        identities.sort_by(|a, b| b.wins.cmp(&a.wins).then(a.seq.cmp(&b.seq)));
        identities
            .iter()
            .enumerate()
            .map(|(rank, identity)| {
                format!("{}. {} - {} win(s)", rank + 1, identity.name, identity.wins)
            })
            .collect()
    }

    /// The pending incoming request of `by`, checked against `name`.
    fn pending_from(
        &self,
        registry: &Registry,
        by: ConnectionId,
        name: Option<&str>,
    ) -> Result<(Username, ConnectionId), LobbyError> {
        let sender_name = registry
            .identity(by)?
            .pending_friend_from
            .clone()
            .ok_or(LobbyError::NoFriendRequest)?;
        if let Some(name) = name {
            if name != sender_name.as_str() {
                return Err(LobbyError::NoFriendRequestFrom(name.to_string()));
            }
        }
        let sender = registry
            .find(sender_name.as_str())
            .ok_or_else(|| LobbyError::UserNotFound(sender_name.to_string()))?;
        Ok((sender_name, sender))
    }
}
