use std::collections::HashMap;
use std::net::SocketAddr;
use std::num::NonZeroU64;
use std::path::Path;
use std::time::Duration;

use nodelink_core::{NodeIdentity, PeerAddress};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub node: NodeConfig,
    pub peer: PeerConfig,
    pub link: LinkConfig,
    #[serde(default)]
    pub sensor: SensorConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// Which sentinels this node stamps on its frames
    pub identity: NodeIdentity,
    /// Milliseconds between samples
    pub sample_interval_ms: NonZeroU64,
}

impl NodeConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms.get())
    }
}

/// The single remote node this node reports to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PeerConfig {
    pub address: PeerAddress,
    /// Radio channel the peer listens on
    #[serde(default = "default_channel")]
    pub channel: u8,
}

const DEFAULT_SAMPLE_INTERVAL_MS: NonZeroU64 = NonZeroU64::new(2000).unwrap();

fn default_channel() -> u8 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LinkConfig {
    Mock,
    Udp {
        /// Local socket to send from and listen on
        bind: SocketAddr,
        /// Physical address this node announces in every datagram
        local_address: PeerAddress,
        /// Where each physical address is reachable
        #[serde(default)]
        peers: HashMap<PeerAddress, SocketAddr>,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SensorConfig {
    #[default]
    Simulated,
}

impl Config {
    pub fn load(path: &Path) -> color_eyre::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node: NodeConfig {
                identity: NodeIdentity::NodeB,
                sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            },
            peer: PeerConfig {
                address: PeerAddress::new([0x40, 0x91, 0x51, 0xbf, 0xf5, 0x94]),
                channel: default_channel(),
            },
            link: LinkConfig::Mock,
            sensor: SensorConfig::Simulated,
        }
    }
}
