//! Configuration Module
//!
//! Loads service configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::DEFAULT_MAX_CACHE_SIZE;
use crate::edge::DEFAULT_EDGE_VERSION;
use crate::preload::{DEFAULT_BATCH_DELAY, DEFAULT_BATCH_SIZE};

const DEFAULT_START_DELAY_MS: u64 = 100;
const DEFAULT_SERVER_PORT: u16 = 3000;
const DEFAULT_IMAGE_ORIGIN: &str = "http://localhost:5000";
const DEFAULT_EDGE_CACHE_DIR: &str = "./edge-cache";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Capacity of the in-memory cache store
    pub max_cache_size: usize,
    /// Images requested concurrently per batch
    pub batch_size: usize,
    /// Pause between consecutive batches, in milliseconds
    pub batch_delay_ms: u64,
    /// Delay before a scheduled listing preload starts, in milliseconds
    pub start_delay_ms: u64,
    /// Cache local blob copies instead of remote URLs
    pub keep_local_copies: bool,
    /// HTTP server port
    pub server_port: u16,
    /// Origin the edge cache forwards misses to
    pub image_origin: String,
    pub edge_cache_dir: PathBuf,
    /// Suffix of the edge cache generation names
    pub edge_cache_version: String,
    pub fetch_timeout_secs: u64,
    /// Mount the `/debug/cache/*` routes
    pub debug_endpoints: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_CACHE_SIZE` - Memory cache capacity (default: 100)
    /// - `PRELOAD_BATCH_SIZE` - Images per batch (default: 5)
    /// - `PRELOAD_BATCH_DELAY_MS` - Pause between batches (default: 100)
    /// - `PRELOAD_START_DELAY_MS` - Delay before scheduled preloads (default: 100)
    /// - `KEEP_LOCAL_COPIES` - Cache blob references (default: false)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `IMAGE_ORIGIN` - Edge cache origin (default: http://localhost:5000)
    /// - `EDGE_CACHE_DIR` - Edge cache root directory (default: ./edge-cache)
    /// - `EDGE_CACHE_VERSION` - Generation version (default: v1)
    /// - `FETCH_TIMEOUT_SECS` - Outbound request timeout (default: 10)
    /// - `DEBUG_ENDPOINTS` - Debug routes (default: on in debug builds)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a Config from any variable source. Unparseable values fall
    /// back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let flag = |name: &str| lookup(name).and_then(|v| parse_flag(&v));
        let text = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Self {
            max_cache_size: parsed(&lookup, "MAX_CACHE_SIZE").unwrap_or(defaults.max_cache_size),
            batch_size: parsed(&lookup, "PRELOAD_BATCH_SIZE").unwrap_or(defaults.batch_size),
            batch_delay_ms: parsed(&lookup, "PRELOAD_BATCH_DELAY_MS").unwrap_or(defaults.batch_delay_ms),
            start_delay_ms: parsed(&lookup, "PRELOAD_START_DELAY_MS").unwrap_or(defaults.start_delay_ms),
            keep_local_copies: flag("KEEP_LOCAL_COPIES").unwrap_or(defaults.keep_local_copies),
            server_port: parsed(&lookup, "SERVER_PORT").unwrap_or(defaults.server_port),
            image_origin: text("IMAGE_ORIGIN").unwrap_or(defaults.image_origin),
            edge_cache_dir: text("EDGE_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.edge_cache_dir),
            edge_cache_version: text("EDGE_CACHE_VERSION").unwrap_or(defaults.edge_cache_version),
            fetch_timeout_secs: parsed(&lookup, "FETCH_TIMEOUT_SECS").unwrap_or(defaults.fetch_timeout_secs),
            debug_endpoints: flag("DEBUG_ENDPOINTS").unwrap_or(defaults.debug_endpoints),
        }
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay_ms: DEFAULT_BATCH_DELAY.as_millis() as u64,
            start_delay_ms: DEFAULT_START_DELAY_MS,
            keep_local_copies: false,
            server_port: DEFAULT_SERVER_PORT,
            image_origin: DEFAULT_IMAGE_ORIGIN.to_string(),
            edge_cache_dir: PathBuf::from(DEFAULT_EDGE_CACHE_DIR),
            edge_cache_version: DEFAULT_EDGE_VERSION.to_string(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            debug_endpoints: cfg!(debug_assertions),
        }
    }
}

fn parsed<T, F>(lookup: &F, name: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(name).and_then(|v| v.trim().parse().ok())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
