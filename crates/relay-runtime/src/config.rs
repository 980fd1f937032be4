//! # Runtime Configuration
//!
//! Settings of the runtime binary, loaded from `RELAY_*` environment
//! variables on top of defaults. Invalid values are logged and ignored.

use relay_bus::{FileStorage, KeyValueStore, MemoryStorage, RelayConfig};
use relay_types::{DomainName, StorageError};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Name of the storage file inside the data directory.
pub const STORAGE_FILE: &str = "storage.json";

/// Complete runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Host the hub page is served from, with an optional port.
    pub hostname: String,
    /// Path of the hub page.
    pub path: String,
    /// Directory of the durable storage file. In-memory storage when unset.
    pub data_dir: Option<PathBuf>,
    /// How long a cross-domain request waits for its response.
    pub request_timeout_secs: u64,
    /// Embed frames of the other four domains in the hub page.
    pub embed_frames: bool,
    /// Drop messages from origins outside the allow list.
    pub enforce_origin: bool,
    /// `EnvFilter` directive for logging.
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            hostname: "localhost:5000".into(),
            path: "/".into(),
            data_dir: None,
            request_timeout_secs: 30,
            embed_frames: true,
            enforce_origin: true,
            log_level: "info".into(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(hostname) = lookup("RELAY_HOSTNAME").filter(|h| !h.is_empty()) {
            config.hostname = hostname;
        }
        if let Some(path) = lookup("RELAY_PATH") {
            if path.starts_with('/') {
                config.path = path;
            } else {
                warn!(value = %path, "RELAY_PATH must start with '/', ignoring");
            }
        }
        if let Some(dir) = lookup("RELAY_DATA_DIR").filter(|d| !d.is_empty()) {
            config.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(secs) = lookup("RELAY_REQUEST_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(secs) if secs > 0 => config.request_timeout_secs = secs,
                _ => warn!(
                    value = %secs,
                    "RELAY_REQUEST_TIMEOUT_SECS must be a positive integer, ignoring"
                ),
            }
        }
        if let Some(flag) = lookup("RELAY_EMBED_FRAMES") {
            match parse_flag(&flag) {
                Some(embed) => config.embed_frames = embed,
                None => warn!(value = %flag, "RELAY_EMBED_FRAMES must be a boolean, ignoring"),
            }
        }
        if let Some(flag) = lookup("RELAY_ENFORCE_ORIGIN") {
            match parse_flag(&flag) {
                Some(enforce) => config.enforce_origin = enforce,
                None => warn!(value = %flag, "RELAY_ENFORCE_ORIGIN must be a boolean, ignoring"),
            }
        }
        if let Some(level) = lookup("RELAY_LOG_LEVEL").filter(|l| !l.is_empty()) {
            config.log_level = level;
        }

        config
    }

    /// Relay configuration every page of the runtime uses.
    #[must_use]
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            request_timeout_ms: self.request_timeout_secs.saturating_mul(1000),
            enforce_origin: self.enforce_origin,
            ..RelayConfig::default()
        }
    }

    /// URL of the hub page. Development hosts are served over plain HTTP.
    #[must_use]
    pub fn hub_url(&self) -> String {
        let host = self.hostname.split(':').next().unwrap_or_default();
        let scheme = if self.relay_config().is_dev_host(host) {
            "http"
        } else {
            "https"
        };
        format!("{}://{}{}", scheme, self.hostname, self.path)
    }

    /// Domains to embed as frames in the hub page. The browser skips the
    /// hub's own domain.
    #[must_use]
    pub fn frame_domains(&self) -> Vec<DomainName> {
        if self.embed_frames {
            DomainName::ALL.to_vec()
        } else {
            Vec::new()
        }
    }

    /// Open the storage scope shared by every page.
    ///
    /// # Errors
    ///
    /// Fails if the storage file exists but cannot be read.
    pub fn open_storage(&self) -> Result<Arc<dyn KeyValueStore>, StorageError> {
        match &self.data_dir {
            Some(dir) => {
                let storage = FileStorage::open(dir.join(STORAGE_FILE))?;
                Ok(Arc::new(storage))
            }
            None => {
                info!("No data directory configured, using in-memory storage");
                Ok(Arc::new(MemoryStorage::new()))
            }
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
