//! Server configuration from the environment.

use std::net::SocketAddr;
use thiserror::Error;

const DEFAULT_ADDR: &str = "0.0.0.0:3030";
const DEFAULT_USER_HEADER: &str = "x-user-id";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid FLOORPLAN_ADDR {value:?}: {source}")]
    Addr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("FLOORPLAN_USER_HEADER cannot be empty")]
    EmptyHeader,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Header carrying the caller's user id, set by an upstream gateway.
    pub user_header: String,
}

impl ServerConfig {
    /// Read `FLOORPLAN_ADDR` and `FLOORPLAN_USER_HEADER`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = lookup("FLOORPLAN_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = value
            .parse()
            .map_err(|source| ConfigError::Addr { value, source })?;

        let user_header = lookup("FLOORPLAN_USER_HEADER")
            .unwrap_or_else(|| DEFAULT_USER_HEADER.to_string())
            .trim()
            .to_ascii_lowercase();
        if user_header.is_empty() {
            return Err(ConfigError::EmptyHeader);
        }

        Ok(Self { addr, user_header })
    }
}
