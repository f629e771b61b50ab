//! Lobby limits.

use serde::{Deserialize, Serialize};

use crate::game::constants::MAX_USERNAME_LEN;

/// Caps enforced as explicit validation by the lobby components.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct LobbyConfig {
    /// Registered connections (default: 256)
    pub max_users: usize,

    /// Live matches at once (default: 128)
    pub max_matches: usize,

    /// Pending challenges per identity and direction (default: 512)
    pub max_challenges: usize,

    /// Friends per identity (default: 64)
    pub max_friends: usize,

    /// Board snapshots kept per match for replays (default: 512)
    pub max_replay_frames: usize,

    /// Bio length in characters (default: 255)
    pub max_bio_len: usize,

    /// Display name length in characters, at most 31
    pub max_name_len: usize,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            max_users: 256,
            max_matches: 128,
            max_challenges: 512,
            max_friends: 64,
            max_replay_frames: 512,
            max_bio_len: 255,
            max_name_len: MAX_USERNAME_LEN,
        }
    }
}

impl LobbyConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        let limits = [
            ("max_users", self.max_users),
            ("max_matches", self.max_matches),
            ("max_challenges", self.max_challenges),
            ("max_friends", self.max_friends),
            ("max_replay_frames", self.max_replay_frames),
            ("max_bio_len", self.max_bio_len),
        ];
        if let Some((name, _)) = limits.iter().find(|(_, value)| *value == 0) {
            return Err(format!("{name} must be at least 1"));
        }

        if self.max_name_len == 0 || self.max_name_len > MAX_USERNAME_LEN {
            return Err(format!(
                "max_name_len must be between 1 and {MAX_USERNAME_LEN}"
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(LobbyConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_limits() {
        let config = LobbyConfig {
            max_friends: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err("max_friends must be at least 1".to_string())
        );
    }

    #[test]
    fn rejects_name_len_above_protocol_limit() {
        let config = LobbyConfig {
            max_name_len: 32,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
