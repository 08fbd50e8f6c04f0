//! Configuration file management.
//!
//! Read from `veil.toml` in the working directory, or from the path in
//! `VEIL_CONFIG`. Every field has a default; a missing file means all defaults.
//!
//! Every role gets its own port: relay N on `relay_base_port + N`, user N on
//! `user_base_port + N`. A config whose relay range, user range and directory
//! port collide, or that runs past port 65535, is rejected at load time.

use std::ops::RangeInclusive;

use std::path::PathBuf;

use anyhow::{bail, ensure};
use serde::{Deserialize, Serialize};
use veil_transport::endpoint::{
    DEFAULT_DIRECTORY_PORT, DEFAULT_RELAY_BASE_PORT, DEFAULT_USER_BASE_PORT,
};
use veil_transport::AddressBook;

/// Environment variable overriding the config file path.
pub const CONFIG_ENV: &str = "VEIL_CONFIG";

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Where each role listens.
    #[serde(default)]
    pub network: NetworkConfig,
    /// How many relays and users to launch.
    #[serde(default)]
    pub topology: TopologyConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_directory_port")]
    pub directory_port: u16,
    /// Relay N listens on `relay_base_port + N`.
    #[serde(default = "default_relay_base_port")]
    pub relay_base_port: u16,
    /// User N listens on `user_base_port + N`.
    #[serde(default = "default_user_base_port")]
    pub user_base_port: u16,
}

/// Topology configuration. Relays are numbered 1..=relays, users 1..=users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyConfig {
    #[serde(default = "default_relays")]
    pub relays: u32,
    #[serde(default = "default_users")]
    pub users: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace" | "debug" | "info" | "warn" | "error".
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default value functions

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_directory_port() -> u16 {
    DEFAULT_DIRECTORY_PORT
}

fn default_relay_base_port() -> u16 {
    DEFAULT_RELAY_BASE_PORT
}

fn default_user_base_port() -> u16 {
    DEFAULT_USER_BASE_PORT
}

fn default_relays() -> u32 {
    10
}

fn default_users() -> u32 {
    2
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            directory_port: default_directory_port(),
            relay_base_port: default_relay_base_port(),
            user_base_port: default_user_base_port(),
        }
    }
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            relays: default_relays(),
            users: default_users(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the config file location.
    ///
    /// Falls back to defaults if the file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::parse(&content)
        } else {
            let config = Self::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Parse and validate a TOML document.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every role gets a distinct, representable port.
    pub fn validate(&self) -> anyhow::Result<()> {
        let net = &self.network;
        let relays = port_range("relay", net.relay_base_port, self.topology.relays)?;
        let users = port_range("user", net.user_base_port, self.topology.users)?;

        if let (Some(relays), Some(users)) = (&relays, &users) {
            if relays.start() <= users.end() && users.start() <= relays.end() {
                bail!(
                    "relay ports {}..={} overlap user ports {}..={}",
                    relays.start(),
                    relays.end(),
                    users.start(),
                    users.end()
                );
            }
        }

        let directory = u32::from(net.directory_port);
        for (role, range) in [("relay", &relays), ("user", &users)] {
            if let Some(range) = range {
                ensure!(
                    !range.contains(&directory),
                    "directory port {} falls inside the {} ports {}..={}",
                    directory,
                    role,
                    range.start(),
                    range.end()
                );
            }
        }
        Ok(())
    }

    /// Address book matching the network section.
    pub fn address_book(&self) -> AddressBook {
        AddressBook {
            host: self.network.host.clone(),
            directory_port: self.network.directory_port,
            relay_base_port: self.network.relay_base_port,
            user_base_port: self.network.user_base_port,
        }
    }

    /// Get the config file path.
    fn config_path() -> PathBuf {
        std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("veil.toml"))
    }
}

/// Ports used by `count` roles numbered from 1, or `None` when there are none.
fn port_range(role: &str, base: u16, count: u32) -> anyhow::Result<Option<RangeInclusive<u32>>> {
    if count == 0 {
        return Ok(None);
    }
    let first = u32::from(base) + 1;
    let last = u32::from(base).saturating_add(count);
    ensure!(
        last <= u32::from(u16::MAX),
        "{} {} would listen on port {}, past {}",
        role,
        count,
        last,
        u16::MAX
    );
    Ok(Some(first..=last))
}
