//! Registered connections, indexed by handle and by name.

use std::collections::HashMap;

use super::{
    errors::LobbyError,
    models::{ConnectionId, Identity},
};
use crate::game::Username;

#[derive(Debug, Default)]
pub struct Registry {
    identities: HashMap<ConnectionId, Identity>,
    names: HashMap<Username, ConnectionId>,
    /// Handles in registration order.
    order: Vec<ConnectionId>,
    next_seq: u64,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an identity for `id` under a sanitized `raw_name`.
    ///
    /// # Errors
    ///
    /// Fails on an empty name, a name held by another live connection, or a
    /// full server.
    pub fn register(
        &mut self,
        id: ConnectionId,
        raw_name: &str,
        max_users: usize,
        max_name_len: usize,
    ) -> Result<&Identity, LobbyError> {
        let trimmed: String = Username::new(raw_name)
            .as_str()
            .chars()
            .take(max_name_len)
            .collect();
        let name = Username::new(&trimmed);
        if name.is_empty() {
            return Err(LobbyError::EmptyName);
        }
        if self.names.contains_key(&name) {
            return Err(LobbyError::NameTaken(name.to_string()));
        }
        if self.identities.len() >= max_users {
            return Err(LobbyError::ServerFull { max: max_users });
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.names.insert(name.clone(), id);
        self.order.push(id);
        Ok(self
            .identities
            .entry(id)
            .or_insert_with(|| Identity::new(id, seq, name)))
    }

    /// Drops the identity; its name becomes available again.
    pub fn remove(&mut self, id: ConnectionId) -> Option<Identity> {
        let identity = self.identities.remove(&id)?;
        self.names.remove(&identity.name);
        self.order.retain(|&other| other != id);
        Some(identity)
    }

    #[must_use]
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.identities.contains_key(&id)
    }

    #[must_use]
    pub fn get(&self, id: ConnectionId) -> Option<&Identity> {
        self.identities.get(&id)
    }

    pub fn get_mut(&mut self, id: ConnectionId) -> Option<&mut Identity> {
        self.identities.get_mut(&id)
    }

    /// Like [`Registry::get`] but as a lobby error for handlers.
    pub fn identity(&self, id: ConnectionId) -> Result<&Identity, LobbyError> {
        self.get(id)
            .ok_or_else(|| LobbyError::UserNotFound(id.to_string()))
    }

    pub fn identity_mut(&mut self, id: ConnectionId) -> Result<&mut Identity, LobbyError> {
        self.get_mut(id)
            .ok_or_else(|| LobbyError::UserNotFound(id.to_string()))
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<ConnectionId> {
        self.names.get(name).copied()
    }

    /// Display name of a live connection, for messages.
    #[must_use]
    pub fn name(&self, id: ConnectionId) -> Option<&Username> {
        self.identities.get(&id).map(|identity| &identity.name)
    }

    /// Identities in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Identity> {
        self.order.iter().filter_map(|id| self.identities.get(id))
    }

    /// Handles in registration order.
    #[must_use]
    pub fn ids(&self) -> Vec<ConnectionId> {
        self.order.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX_USERS: usize = 3;
    const MAX_NAME: usize = 31;

    #[test]
    fn register_and_find() {
        let mut registry = Registry::new();
        let identity = registry
            .register(ConnectionId(2), " alice ", MAX_USERS, MAX_NAME)
            .unwrap();
        assert_eq!(identity.name.as_str(), "alice");
        assert_eq!(identity.seq, 0);
        assert_eq!(registry.find("alice"), Some(ConnectionId(2)));
        assert_eq!(registry.find("bob"), None);
    }

    #[test]
    fn names_are_unique_while_connected() {
        let mut registry = Registry::new();
        registry
            .register(ConnectionId(2), "alice", MAX_USERS, MAX_NAME)
            .unwrap();
        assert_eq!(
            registry
                .register(ConnectionId(3), "alice", MAX_USERS, MAX_NAME)
                .unwrap_err(),
            LobbyError::NameTaken("alice".to_string())
        );
        registry.remove(ConnectionId(2));
        assert!(
            registry
                .register(ConnectionId(3), "alice", MAX_USERS, MAX_NAME)
                .is_ok()
        );
    }

    #[test]
    fn rejects_empty_name_and_full_server() {
        let mut registry = Registry::new();
        assert_eq!(
            registry
                .register(ConnectionId(2), "   ", MAX_USERS, MAX_NAME)
                .unwrap_err(),
            LobbyError::EmptyName
        );
        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            registry
                .register(ConnectionId(i + 2), name, MAX_USERS, MAX_NAME)
                .unwrap();
        }
        assert_eq!(
            registry
                .register(ConnectionId(9), "d", MAX_USERS, MAX_NAME)
                .unwrap_err(),
            LobbyError::ServerFull { max: MAX_USERS }
        );
    }

    #[test]
    fn truncates_to_configured_length() {
        let mut registry = Registry::new();
        let identity = registry
            .register(ConnectionId(2), "abcdefgh", MAX_USERS, 4)
            .unwrap();
        assert_eq!(identity.name.as_str(), "abcd");
    }

    #[test]
    fn iter_keeps_registration_order() {
        let mut registry = Registry::new();
        for (id, name) in [(7, "zed"), (2, "amy"), (5, "kim")] {
            registry
                .register(ConnectionId(id), name, MAX_USERS, MAX_NAME)
                .unwrap();
        }
        registry.remove(ConnectionId(2));
        let names: Vec<_> = registry.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["zed", "kim"]);
        assert_eq!(registry.ids(), vec![ConnectionId(7), ConnectionId(5)]);
    }
}
