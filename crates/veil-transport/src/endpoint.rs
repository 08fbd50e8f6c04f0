//! Endpoint naming and the localhost port layout.
//!
//! ```text
//! directory   -> directory_port              (default 8080)
//! relay N     -> relay_base_port + N         (default 4000 + N)
//! user N      -> user_base_port + N          (default 3000 + N)
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use veil_types::{Destination, RelayId, UserId};

use crate::{Result, TransportError};

/// Default directory port.
pub const DEFAULT_DIRECTORY_PORT: u16 = 8080;

/// Default base port for relays.
pub const DEFAULT_RELAY_BASE_PORT: u16 = 4000;

/// Default base port for users.
pub const DEFAULT_USER_BASE_PORT: u16 = 3000;

/// An addressable role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", content = "id", rename_all = "snake_case")]
pub enum Endpoint {
    Directory,
    Relay(RelayId),
    User(UserId),
}

impl From<Destination> for Endpoint {
    fn from(dest: Destination) -> Self {
        match dest {
            Destination::Relay(id) => Endpoint::Relay(id),
            Destination::User(id) => Endpoint::User(id),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Directory => write!(f, "directory"),
            Endpoint::Relay(id) => write!(f, "relay {id}"),
            Endpoint::User(id) => write!(f, "user {id}"),
        }
    }
}

/// Maps endpoints to socket addresses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddressBook {
    /// Host every role listens on.
    pub host: String,
    /// Port of the directory.
    pub directory_port: u16,
    /// Relay N listens on `relay_base_port + N`.
    pub relay_base_port: u16,
    /// User N listens on `user_base_port + N`.
    pub user_base_port: u16,
}

impl Default for AddressBook {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            directory_port: DEFAULT_DIRECTORY_PORT,
            relay_base_port: DEFAULT_RELAY_BASE_PORT,
            user_base_port: DEFAULT_USER_BASE_PORT,
        }
    }
}

impl AddressBook {
    /// Port an endpoint listens on.
    pub fn port(&self, endpoint: Endpoint) -> Result<u16> {
        let (base, id) = match endpoint {
            Endpoint::Directory => return Ok(self.directory_port),
            Endpoint::Relay(RelayId(id)) => (self.relay_base_port, id),
            Endpoint::User(UserId(id)) => (self.user_base_port, id),
        };
        u16::try_from(id)
            .ok()
            .and_then(|id| base.checked_add(id))
            .ok_or_else(|| {
                TransportError::Unreachable(format!("{endpoint} has no port above {base}"))
            })
    }

    /// `host:port` string for an endpoint.
    pub fn addr(&self, endpoint: Endpoint) -> Result<String> {
        Ok(format!("{}:{}", self.host, self.port(endpoint)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let book = AddressBook::default();
        assert_eq!(book.port(Endpoint::Directory).expect("port"), 8080);
        assert_eq!(book.port(Endpoint::Relay(RelayId(2))).expect("port"), 4002);
        assert_eq!(book.port(Endpoint::User(UserId(20))).expect("port"), 3020);
        assert_eq!(
            book.addr(Endpoint::User(UserId(1))).expect("addr"),
            "127.0.0.1:3001"
        );
    }

    #[test]
    fn test_port_overflow() {
        let book = AddressBook::default();
        assert!(book.port(Endpoint::Relay(RelayId(70_000))).is_err());
        assert!(book.port(Endpoint::Relay(RelayId(65_000))).is_err());
    }

    #[test]
    fn test_endpoint_from_destination() {
        assert_eq!(
            Endpoint::from(Destination::Relay(RelayId(1))),
            Endpoint::Relay(RelayId(1))
        );
        assert_eq!(
            Endpoint::from(Destination::User(UserId(1))),
            Endpoint::User(UserId(1))
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Endpoint::Directory.to_string(), "directory");
        assert_eq!(Endpoint::Relay(RelayId(3)).to_string(), "relay 3");
    }
}
