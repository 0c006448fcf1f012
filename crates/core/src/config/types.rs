use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub main: MainConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl Config {
    /// Normalize values that have a documented floor.
    pub fn with_defaults(mut self) -> Self {
        if self.main.update_thread_count == 0 {
            self.main.update_thread_count = 1;
        }
        if self.main.request_timeout_secs == 0 {
            self.main.request_timeout_secs = default_request_timeout();
        }
        self
    }
}

/// Update settings shared by every source.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MainConfig {
    /// Outbound proxy address handed to sources. Empty means a direct
    /// connection, `host:port` is treated as SOCKS5.
    #[serde(default)]
    pub proxy_addr: String,
    /// Number of concurrent fetch workers per update run (minimum 1).
    #[serde(default = "default_thread_count", deserialize_with = "thread_count")]
    pub update_thread_count: usize,
    /// Per-request timeout for source HTTP clients, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for MainConfig {
    fn default() -> Self {
        Self {
            proxy_addr: String::new(),
            update_thread_count: default_thread_count(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_thread_count() -> usize {
    1
}

fn default_request_timeout() -> u64 {
    30
}

/// Accepts any integer; zero and negative counts collapse to the minimum of 1.
fn thread_count<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = i64::deserialize(deserializer)?;
    Ok(usize::try_from(raw).unwrap_or(0).max(1))
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("torrentdb.db")
}
