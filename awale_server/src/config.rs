//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use awale::LobbyConfig;
use std::net::SocketAddr;

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Limits handed to the lobby
    pub lobby: LobbyConfig,
}

/// Values given on the command line, which win over the environment.
#[derive(Debug, Default)]
pub struct Overrides {
    pub bind: Option<SocketAddr>,
    pub max_users: Option<usize>,
    pub max_matches: Option<usize>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but can't be parsed.
    pub fn from_env(overrides: Overrides) -> Result<Self, ConfigError> {
        Self::from_lookup(overrides, |key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(overrides: Overrides, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = match overrides.bind {
            Some(bind) => bind,
            None => parse_or(&lookup, "SERVER_BIND", default_bind())?,
        };

        let defaults = LobbyConfig::default();
        let max_users = match overrides.max_users {
            Some(max_users) => max_users,
            None => parse_or(&lookup, "MAX_USERS", defaults.max_users)?,
        };
        let max_matches = match overrides.max_matches {
            Some(max_matches) => max_matches,
            None => parse_or(&lookup, "MAX_MATCHES", defaults.max_matches)?,
        };

        let lobby = LobbyConfig {
            max_users,
            max_matches,
            max_challenges: parse_or(&lookup, "MAX_CHALLENGES", defaults.max_challenges)?,
            max_friends: parse_or(&lookup, "MAX_FRIENDS", defaults.max_friends)?,
            max_replay_frames: parse_or(&lookup, "MAX_REPLAY_FRAMES", defaults.max_replay_frames)?,
            max_bio_len: parse_or(&lookup, "MAX_BIO_LEN", defaults.max_bio_len)?,
            max_name_len: parse_or(&lookup, "MAX_NAME_LEN", defaults.max_name_len)?,
        };

        Ok(ServerConfig { bind, lobby })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.lobby
            .validate()
            .map_err(|reason| ConfigError::Invalid {
                var: "lobby limits".to_string(),
                reason,
            })
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5050))
}

/// Parses `key` when it's set, falls back to `default` when it isn't.
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|error: T::Err| ConfigError::Invalid {
            var: key.to_string(),
            reason: format!("'{value}': {error}"),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = ServerConfig::from_lookup(Overrides::default(), lookup(&[])).unwrap();
        assert_eq!(config.bind, "127.0.0.1:5050".parse().unwrap());
        assert_eq!(config.lobby, LobbyConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_values_are_read() {
        let config = ServerConfig::from_lookup(
            Overrides::default(),
            lookup(&[
                ("SERVER_BIND", "0.0.0.0:7000"),
                ("MAX_FRIENDS", "3"),
                ("MAX_REPLAY_FRAMES", " 10 "),
            ]),
        )
        .unwrap();
        assert_eq!(config.bind.port(), 7000);
        assert_eq!(config.lobby.max_friends, 3);
        assert_eq!(config.lobby.max_replay_frames, 10);
    }

    #[test]
    fn test_overrides_win_over_env() {
        let overrides = Overrides {
            bind: Some("127.0.0.1:9000".parse().unwrap()),
            max_users: Some(4),
            max_matches: None,
        };
        let config = ServerConfig::from_lookup(
            overrides,
            lookup(&[("SERVER_BIND", "0.0.0.0:7000"), ("MAX_USERS", "100")]),
        )
        .unwrap();
        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.lobby.max_users, 4);
    }

    #[test]
    fn test_unparsable_value_is_an_error() {
        let err = ServerConfig::from_lookup(Overrides::default(), lookup(&[("MAX_USERS", "lots")]))
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("MAX_USERS"));
        assert!(msg.contains("lots"));
    }

    #[test]
    fn test_zero_limit_fails_validation() {
        let config =
            ServerConfig::from_lookup(Overrides::default(), lookup(&[("MAX_MATCHES", "0")]))
                .unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert!(err.to_string().contains("max_matches"));
    }
}
