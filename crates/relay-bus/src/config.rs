//! Relay configuration with validation.

use crate::environment::PageLocation;
use relay_types::DomainRegistry;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Fixed storage key of the persisted session record.
pub const DEFAULT_SESSION_KEY: &str = "bailBondsEmergencySession";

/// Prefix of storage-relay records.
pub const DEFAULT_RELAY_KEY_PREFIX: &str = "relay_message_";

/// Default `request_action` timeout.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Default capacity of the local event bus.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// How long `request_action` waits for a response.
    pub request_timeout_ms: u64,
    /// Hosts on which the URL path, not the hostname, selects the domain.
    /// For domain detection a host matches if it contains one of these
    /// strings; the origin allow-list requires an exact match.
    pub dev_hosts: Vec<String>,
    /// Drop inbound messages from origins outside the allow list.
    pub enforce_origin: bool,
    /// Origins accepted in addition to the registry endpoints and dev hosts.
    pub extra_origins: Vec<String>,
    /// Domains whose subdomains are accepted as development origins.
    pub dev_origin_suffixes: Vec<String>,
    /// Storage key of the session record.
    pub session_key: String,
    /// Storage key prefix of relayed message records.
    pub relay_key_prefix: String,
    /// How long a seen message id is remembered.
    pub dedup_window_secs: u64,
    /// Capacity of the local event bus.
    pub event_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            dev_hosts: vec!["localhost".into(), "127.0.0.1".into(), "replit".into()],
            enforce_origin: true,
            extra_origins: Vec::new(),
            dev_origin_suffixes: vec!["replit.dev".into(), "replit.app".into(), "repl.co".into()],
            session_key: DEFAULT_SESSION_KEY.into(),
            relay_key_prefix: DEFAULT_RELAY_KEY_PREFIX.into(),
            dedup_window_secs: 120,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl RelayConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(
                "request timeout cannot be 0".into(),
            ));
        }
        if self.session_key.is_empty() {
            return Err(ConfigError::InvalidKey("session key cannot be empty".into()));
        }
        if self.relay_key_prefix.is_empty() {
            return Err(ConfigError::InvalidKey(
                "relay key prefix cannot be empty".into(),
            ));
        }
        if self.relay_key_prefix == self.session_key {
            return Err(ConfigError::InvalidKey(
                "relay key prefix must differ from the session key".into(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::InvalidLimit(
                "event capacity cannot be 0".into(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    #[must_use]
    pub fn dedup_window(&self) -> Duration {
        Duration::from_secs(self.dedup_window_secs)
    }

    /// Is `hostname` a development host?
    #[must_use]
    pub fn is_dev_host(&self, hostname: &str) -> bool {
        let hostname = hostname.to_ascii_lowercase();
        self.dev_hosts
            .iter()
            .any(|h| hostname.contains(&h.to_ascii_lowercase()))
    }

    /// Is `host` a development origin host? Dev hosts must match exactly,
    /// dev origin suffixes on a label boundary.
    #[must_use]
    pub fn is_dev_origin_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        if self.dev_hosts.iter().any(|h| h.eq_ignore_ascii_case(&host)) {
            return true;
        }
        self.dev_origin_suffixes.iter().any(|suffix| {
            let suffix = suffix.trim_start_matches('.').to_ascii_lowercase();
            host.strip_suffix(suffix.as_str())
                .is_some_and(|label| label.ends_with('.'))
        })
    }

    /// Is a message from `origin` acceptable?
    ///
    /// Registry endpoints, configured extra origins and origins on a dev
    /// origin host are accepted. Everything is accepted when enforcement is
    /// off.
    #[must_use]
    pub fn is_origin_allowed(&self, registry: &DomainRegistry, origin: &str) -> bool {
        if !self.enforce_origin {
            return true;
        }
        if registry.domain_for_origin(origin).is_some() {
            return true;
        }
        let trimmed = origin.trim_end_matches('/');
        if self
            .extra_origins
            .iter()
            .any(|o| o.trim_end_matches('/').eq_ignore_ascii_case(trimmed))
        {
            return true;
        }
        PageLocation::parse(trimmed)
            .is_ok_and(|location| self.is_dev_origin_host(&location.hostname))
    }
}

/// Configuration errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Invalid limit: {0}")]
    InvalidLimit(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = RelayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = RelayConfig {
            request_timeout_ms: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTimeout(_))
        ));
    }

    #[test]
    fn test_colliding_keys_rejected() {
        let config = RelayConfig {
            relay_key_prefix: DEFAULT_SESSION_KEY.into(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidKey(_))));
    }

    #[test]
    fn test_dev_host_detection() {
        let config = RelayConfig::default();
        assert!(config.is_dev_host("localhost"));
        assert!(config.is_dev_host("bail-bonds.replit.dev"));
        assert!(!config.is_dev_host("nine1eight.crypto"));
    }

    #[test]
    fn test_origin_allow_list() {
        let registry = DomainRegistry::global();
        let config = RelayConfig {
            extra_origins: vec!["https://partner.example".into()],
            ..Default::default()
        };

        assert!(config.is_origin_allowed(registry, "https://Nine1Eight.nft"));
        assert!(config.is_origin_allowed(registry, "https://partner.example/"));
        assert!(config.is_origin_allowed(registry, "http://localhost:5000"));
        assert!(!config.is_origin_allowed(registry, "https://evil.example"));
        assert!(!config.is_origin_allowed(registry, "null"));
    }

    #[test]
    fn test_look_alike_dev_origins_rejected() {
        let registry = DomainRegistry::global();
        let config = RelayConfig::default();

        assert!(config.is_origin_allowed(registry, "http://127.0.0.1:5000"));
        assert!(config.is_origin_allowed(registry, "https://bail-bonds.replit.dev"));
        assert!(config.is_origin_allowed(registry, "https://bail-bonds.user.repl.co"));

        assert!(!config.is_origin_allowed(registry, "https://localhost.evil.example"));
        assert!(!config.is_origin_allowed(registry, "https://evil-replit.attacker.io"));
        assert!(!config.is_origin_allowed(registry, "https://127.0.0.1.attacker.io"));
        assert!(!config.is_origin_allowed(registry, "https://evilreplit.dev"));
        assert!(!config.is_origin_allowed(registry, "https://replit.dev.attacker.io"));
    }

    #[test]
    fn test_enforcement_can_be_disabled() {
        let config = RelayConfig {
            enforce_origin: false,
            ..Default::default()
        };
        assert!(config.is_origin_allowed(DomainRegistry::global(), "https://evil.example"));
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: RelayConfig = serde_json::from_str(r#"{"request_timeout_ms": 500}"#).unwrap();
        assert_eq!(config.request_timeout_ms, 500);
        assert_eq!(config.session_key, DEFAULT_SESSION_KEY);
    }
}
