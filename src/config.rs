use std::net::SocketAddr;
use std::path::PathBuf;

use tracing::trace;

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiSection,

    #[serde(default)]
    pub hub: HubConfig,

    #[serde(default)]
    pub actions: ActionConfig,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApiSection {
    /// Bind address for the HTTP/WebSocket server
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct HubConfig {
    /// Milliseconds between broadcast ticks
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Maximum concurrent push-channel subscribers
    #[serde(default = "default_max_subscribers")]
    pub max_subscribers: usize,

    /// Number of recent samples kept in the in-memory ring
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_subscribers: default_max_subscribers(),
            history_capacity: default_history_capacity(),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ActionConfig {
    /// Directory the "cleanup disk" action is allowed to delete from
    #[serde(default = "default_cleanup_dir")]
    pub cleanup_dir: PathBuf,

    /// Services the "restart services" action reports as restarted
    #[serde(default = "default_managed_services")]
    pub managed_services: Vec<String>,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            cleanup_dir: default_cleanup_dir(),
            managed_services: default_managed_services(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::new(crate::util::get_addr().into(), crate::util::get_port())
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_max_subscribers() -> usize {
    15
}

fn default_history_capacity() -> usize {
    300
}

fn default_cleanup_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_managed_services() -> Vec<String> {
    ["nginx", "postgresql", "redis"]
        .map(String::from)
        .to_vec()
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|_| anyhow::anyhow!("Invalid configuration file provided!"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
