use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use re_relay::RelayConfig;

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub upstream: UpstreamSection,
    #[serde(default)]
    pub listen: ListenSection,
    #[serde(default)]
    pub relay: RelaySection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// The server whose session is mirrored.
#[derive(Debug, Deserialize)]
pub struct UpstreamSection {
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Offline-mode username to log in with.
    pub username: String,
}

fn default_port() -> u16 {
    25565
}

#[derive(Debug, Deserialize)]
pub struct ListenSection {
    #[serde(default = "default_listen_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Packets at least this long are compressed. -1 disables compression.
    #[serde(default = "default_compression_threshold")]
    pub compression_threshold: i32,
    #[serde(default = "default_motd")]
    pub motd: String,
    #[serde(default = "default_max_players")]
    pub max_players: u32,
}

fn default_listen_address() -> String {
    "0.0.0.0".into()
}

fn default_compression_threshold() -> i32 {
    256
}

fn default_motd() -> String {
    "Session relay".into()
}

fn default_max_players() -> u32 {
    20
}

impl Default for ListenSection {
    fn default() -> Self {
        Self {
            address: default_listen_address(),
            port: default_port(),
            compression_threshold: default_compression_threshold(),
            motd: default_motd(),
            max_players: default_max_players(),
        }
    }
}

impl ListenSection {
    pub fn compression(&self) -> Option<i32> {
        (self.compression_threshold >= 0).then_some(self.compression_threshold)
    }
}

#[derive(Debug, Deserialize)]
pub struct RelaySection {
    /// Delay in milliseconds between login success and snapshot replay.
    #[serde(default = "default_attach_grace_ms")]
    pub attach_grace_ms: u64,
    #[serde(default = "default_feed_capacity")]
    pub feed_capacity: usize,
    /// Entity id handed to downstreams. 0 mirrors the upstream's own id.
    #[serde(default)]
    pub client_eid: i32,
}

fn default_attach_grace_ms() -> u64 {
    100
}

fn default_feed_capacity() -> usize {
    4096
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            attach_grace_ms: default_attach_grace_ms(),
            feed_capacity: default_feed_capacity(),
            client_eid: 0,
        }
    }
}

impl RelaySection {
    pub fn client_eid(&self) -> Option<i32> {
        (self.client_eid != 0).then_some(self.client_eid)
    }

    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            attach_grace: Duration::from_millis(self.attach_grace_ms),
            feed_capacity: self.feed_capacity,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".into()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl ServerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }
}
