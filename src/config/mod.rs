//! Configuration data structures for the tracker.
//!
//! Configuration is loaded from an optional TOML file layered under
//! `SHROUD_TRACKER_*` environment overrides. Key names keep the camelCase
//! spelling of the original deployment format, e.g.:
//!
//! ```toml
//! [core]
//! createOnAnnounce = true
//! privateEnabled = false
//! reapInterval = 60
//! reapRatio = 1.25
//!
//! [network]
//! name = "clearnet"
//! ```
//!
//! Configuration is treated as immutable after startup.
use std::collections::HashMap;

use derive_more::Constructor;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable prefix for configuration overrides.
const ENV_VAR_PREFIX: &str = "SHROUD_TRACKER_";

/// The maximum number of peers returned for one announce, whatever `numwant`
/// asked for.
pub const TORRENT_PEERS_LIMIT: usize = 74;

/// Log threshold, mapped onto the `log` crate levels at startup.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Announce interval policy handed to clients in every response.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy, Constructor)]
pub struct AnnouncePolicy {
    /// Seconds a client should wait between regular announces.
    pub interval: u64,
    /// Seconds a client must at least wait before re-announcing.
    pub interval_min: u64,
}

/// Core tracker behaviour.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct Core {
    /// Whether the first announce for an unknown infohash creates the swarm.
    pub create_on_announce: bool,
    /// Whether every announce and scrape must present a valid passkey.
    pub private_enabled: bool,
    /// Whether download deltas surfaced to the backend are forced to zero.
    pub freeleech_enabled: bool,
    /// Whether the reaper may delete empty, inactive swarms.
    pub purge_inactive_torrents: bool,
    /// Announce interval, in seconds.
    pub announce: u64,
    /// Minimum announce interval, in seconds.
    pub min_announce: u64,
    /// How often the reaper scans the peer store, in seconds.
    pub reap_interval: u64,
    /// The staleness horizon is `reapInterval * reapRatio`.
    pub reap_ratio: f64,
    /// Peer count returned when an announce does not carry `numwant`.
    pub default_num_want: u32,
    /// Number of shards the swarm map is split into.
    pub torrent_map_shards: usize,
    pub client_whitelist_enabled: bool,
    pub client_whitelist: Vec<String>,
    /// Request header carrying the client address when running behind a
    /// reverse proxy.
    pub real_ip_header: Option<String>,
    pub log_level: Option<LogLevel>,
}

impl Default for Core {
    fn default() -> Self {
        Self {
            create_on_announce: true,
            private_enabled: false,
            freeleech_enabled: false,
            purge_inactive_torrents: true,
            announce: 1800,
            min_announce: 900,
            reap_interval: 60,
            reap_ratio: 1.25,
            default_num_want: 50,
            torrent_map_shards: 1,
            client_whitelist_enabled: false,
            client_whitelist: vec![],
            real_ip_header: None,
            log_level: None,
        }
    }
}

impl Core {
    #[must_use]
    pub fn announce_policy(&self) -> AnnouncePolicy {
        AnnouncePolicy::new(self.announce, self.min_announce)
    }
}

/// The announce/scrape HTTP listener.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpTracker {
    /// Address handed to the network transport's `listen`.
    pub bind_address: String,
    /// Per-request deadline, in seconds.
    pub request_timeout: u64,
}

impl Default for HttpTracker {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:6881".to_string(),
            request_timeout: 10,
        }
    }
}

/// The admin JSON API listener. Bound over plain TCP, meant for a private
/// interface.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpApi {
    pub enabled: bool,
    pub bind_address: String,
    /// Per-request deadline, in seconds.
    pub request_timeout: u64,
}

impl Default for HttpApi {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "127.0.0.1:6880".to_string(),
            request_timeout: 10,
        }
    }
}

/// SAM bridge settings for the I2P transport.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct SamConfig {
    /// Address of the SAM bridge.
    pub addr: String,
    /// Tunnel nickname registered with the bridge.
    pub session: String,
    /// Path of the destination key file; created on first start.
    pub keyfile: String,
    /// Extra I2CP options passed verbatim on session creation.
    pub opts: HashMap<String, String>,
}

impl Default for SamConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:7656".to_string(),
            session: "shroud-tracker".to_string(),
            keyfile: "shroud-tracker-privkey.dat".to_string(),
            opts: HashMap::new(),
        }
    }
}

/// Lokinet transport settings.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(default)]
pub struct LokinetConfig {
    /// The Lokinet-aware DNS resolver used for forward and reverse lookups.
    #[serde(rename = "dns")]
    pub resolver_addr: String,
}

impl Default for LokinetConfig {
    fn default() -> Self {
        Self {
            resolver_addr: "127.0.0.1:1153".to_string(),
        }
    }
}

/// Which network transport the tracker runs on.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkConfig {
    /// One of `clearnet`, `i2p`, `lokinet`.
    pub name: String,
    pub i2p: SamConfig,
    pub lokinet: LokinetConfig,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            name: "clearnet".to_string(),
            i2p: SamConfig::default(),
            lokinet: LokinetConfig::default(),
        }
    }
}

/// Backend driver selection.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct DriverConfig {
    /// Driver name; `noop` keeps everything in memory.
    pub name: String,
    /// Driver-specific parameters, e.g. a connection URL.
    pub params: HashMap<String, String>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            name: "noop".to_string(),
            params: HashMap::new(),
        }
    }
}

/// Stats pipeline tuning.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct StatsConfig {
    /// Capacity of each stats channel; producers block when it is full.
    #[serde(rename = "statsBufferSize")]
    pub buffer_size: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self { buffer_size: 4096 }
    }
}

/// The whole tracker configuration.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Configuration {
    pub core: Core,
    pub http_tracker: HttpTracker,
    pub http_api: HttpApi,
    pub network: NetworkConfig,
    pub driver: DriverConfig,
    pub stats: StatsConfig,
}

/// Errors that can occur when loading the configuration.
#[derive(Error, Debug)]
pub enum Error {
    #[error("unable to load configuration: {source}")]
    UnableToLoad {
        #[from]
        source: figment::Error,
    },
}

impl Configuration {
    /// It loads the configuration: built-in defaults, then the TOML file (if
    /// given), then `SHROUD_TRACKER_*` environment overrides, later layers
    /// winning.
    ///
    /// # Errors
    ///
    /// Will return an `Error` if the file or an override cannot be parsed
    /// into the configuration schema.
    pub fn load(config_toml_path: Option<&str>) -> Result<Configuration, Error> {
        let mut figment = Figment::from(Serialized::defaults(Configuration::default()));

        if let Some(path) = config_toml_path {
            figment = figment.merge(Toml::file(path));
        }

        let figment = figment.merge(Env::prefixed(ENV_VAR_PREFIX).split("__"));

        Ok(figment.extract()?)
    }

    /// It loads the configuration from TOML content, on top of the defaults.
    ///
    /// # Errors
    ///
    /// Will return an `Error` if the TOML cannot be parsed into the
    /// configuration schema.
    pub fn load_from_str(toml: &str) -> Result<Configuration, Error> {
        let figment = Figment::from(Serialized::defaults(Configuration::default())).merge(Toml::string(toml));

        Ok(figment.extract()?)
    }
}
