//! Server configuration management.
//!
//! Consolidates environment variable reads and provides validated
//! configuration.

use std::net::SocketAddr;

/// Complete server configuration loaded from the environment, with CLI
/// overrides taking precedence.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Base seed for per-table RNGs
    pub seed: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

const DEFAULT_BIND: &str = "127.0.0.1:65432";

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a set variable does not parse.
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        seed_override: Option<u64>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => match std::env::var("HOLDEM_BIND") {
                Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                    var: "HOLDEM_BIND".to_string(),
                    reason: format!("'{raw}' is not an IP:PORT address"),
                })?,
                Err(_) => DEFAULT_BIND
                    .parse()
                    .expect("default bind address is valid"),
            },
        };

        let seed = match seed_override {
            Some(seed) => seed,
            None => match std::env::var("HOLDEM_SEED") {
                Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                    var: "HOLDEM_SEED".to_string(),
                    reason: format!("'{raw}' is not an unsigned integer"),
                })?,
                Err(_) => 0,
            },
        };

        Ok(Self { bind, seed })
    }

    /// # Errors
    ///
    /// Returns an error if the configuration cannot run a server.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind.port() == 0 {
            return Err(ConfigError::Invalid {
                var: "HOLDEM_BIND".to_string(),
                reason: "an OS-assigned port would be unreachable by clients".to_string(),
            });
        }
        Ok(())
    }
}
