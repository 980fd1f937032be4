//! # Transports
//!
//! Two ways to reach another domain:
//!
//! - `FrameTransport`: post directly into an embedded frame tagged with the
//!   target domain.
//! - `StorageRelayTransport`: write a uniquely keyed record into shared
//!   storage, then post to a cached window of the target, opening one at the
//!   target's receive-message endpoint when none is live.
//!
//! `TransportTable` picks a transport once per target and caches it until it
//! stops being live.

use crate::environment::PageEnvironment;
use crate::window::WindowHandle;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use relay_types::{DomainName, DomainRegistry, RelayMessage, TransportError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Frame,
    StorageRelay,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Frame => f.write_str("frame"),
            TransportKind::StorageRelay => f.write_str("storage-relay"),
        }
    }
}

/// Delivery path to one target domain.
#[async_trait]
pub trait Transport: Send + Sync {
    fn kind(&self) -> TransportKind;

    fn target(&self) -> DomainName;

    /// Can this transport still deliver? A cached transport that is not live
    /// is replaced on the next send.
    fn is_live(&self) -> bool;

    /// Hand `message` off for delivery. No acknowledgement is awaited.
    async fn deliver(&self, message: &RelayMessage) -> Result<(), TransportError>;
}

/// Direct messaging into an embedded frame.
pub struct FrameTransport {
    frame: WindowHandle,
    origin: String,
}

impl FrameTransport {
    pub fn new(frame: WindowHandle, origin: impl Into<String>) -> Self {
        Self {
            frame,
            origin: origin.into(),
        }
    }
}

#[async_trait]
impl Transport for FrameTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Frame
    }

    fn target(&self) -> DomainName {
        self.frame.domain()
    }

    fn is_live(&self) -> bool {
        !self.frame.is_closed()
    }

    async fn deliver(&self, message: &RelayMessage) -> Result<(), TransportError> {
        let data = serde_json::to_value(message).map_err(|e| TransportError::Encode(e.to_string()))?;
        self.frame.post_message(&self.origin, data)
    }
}

/// Record written to shared storage by the storage relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageRecord {
    pub target_domain: DomainName,
    pub message: Value,
}

/// Storage key for a relayed message: `<prefix><millis>_<messageId>`.
#[must_use]
pub fn relay_record_key(prefix: &str, message: &RelayMessage) -> String {
    format!(
        "{}{}_{}",
        prefix,
        Utc::now().timestamp_millis(),
        message.message_id.simple()
    )
}

/// Storage record plus window opener.
pub struct StorageRelayTransport {
    target: DomainName,
    env: Arc<dyn PageEnvironment>,
    key_prefix: String,
    receive_url: String,
    window_name: String,
    window: Mutex<Option<WindowHandle>>,
}

impl StorageRelayTransport {
    pub fn new(
        target: DomainName,
        env: Arc<dyn PageEnvironment>,
        registry: &DomainRegistry,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            target,
            env,
            key_prefix: key_prefix.into(),
            receive_url: registry.entry(target).receive_url(),
            window_name: format!("domain_{target}"),
            window: Mutex::new(None),
        }
    }

    /// The cached window, if it is still open.
    fn live_window(&self) -> Option<WindowHandle> {
        let mut cached = self.window.lock();
        match cached.as_ref() {
            Some(handle) if !handle.is_closed() => Some(handle.clone()),
            Some(_) => {
                debug!(target_domain = %self.target, "Discarding stale window handle");
                *cached = None;
                None
            }
            None => None,
        }
    }

    fn window(&self) -> Option<WindowHandle> {
        if let Some(handle) = self.live_window() {
            return Some(handle);
        }

        // Opening a window may start the target page, so the lock is not held.
        let handle = self.env.open_window(&self.receive_url, &self.window_name)?;
        info!(
            target_domain = %self.target,
            url = %self.receive_url,
            "Opened relay window"
        );
        *self.window.lock() = Some(handle.clone());
        Some(handle)
    }

    /// Is a window handle currently cached?
    #[must_use]
    pub fn has_cached_window(&self) -> bool {
        self.window.lock().is_some()
    }
}

#[async_trait]
impl Transport for StorageRelayTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::StorageRelay
    }

    fn target(&self) -> DomainName {
        self.target
    }

    fn is_live(&self) -> bool {
        true
    }

    async fn deliver(&self, message: &RelayMessage) -> Result<(), TransportError> {
        let encoded = serde_json::to_value(message).map_err(|e| TransportError::Encode(e.to_string()))?;
        let record = StorageRecord {
            target_domain: self.target,
            message: encoded.clone(),
        };
        let key = relay_record_key(&self.key_prefix, message);
        let raw = serde_json::to_string(&record).map_err(|e| TransportError::Encode(e.to_string()))?;

        let storage = self.env.storage();
        if let Err(e) = storage.set(&key, &raw) {
            warn!(key = %key, error = %e, "Failed to write relay record");
        }

        let Some(window) = self.window() else {
            warn!(
                target_domain = %self.target,
                key = %key,
                "No window could be opened, record left in storage"
            );
            return Err(TransportError::Unavailable(self.target));
        };

        match window.post_message(&self.env.origin(), encoded) {
            Ok(()) => {
                if let Err(e) = storage.remove(&key) {
                    warn!(key = %key, error = %e, "Failed to remove delivered relay record");
                }
                Ok(())
            }
            Err(e) => {
                // The page went away between the liveness check and the post.
                self.window.lock().take();
                Err(e)
            }
        }
    }
}

/// Per-target transport cache.
pub struct TransportTable {
    env: Arc<dyn PageEnvironment>,
    registry: &'static DomainRegistry,
    key_prefix: String,
    transports: RwLock<HashMap<DomainName, Arc<dyn Transport>>>,
}

impl TransportTable {
    pub fn new(
        env: Arc<dyn PageEnvironment>,
        registry: &'static DomainRegistry,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            env,
            registry,
            key_prefix: key_prefix.into(),
            transports: RwLock::new(HashMap::new()),
        }
    }

    /// Transport for `target`, selecting a new one if the cached one is gone.
    pub fn resolve(&self, target: DomainName) -> Arc<dyn Transport> {
        if let Some(transport) = self.transports.read().get(&target) {
            if transport.is_live() {
                return transport.clone();
            }
        }

        let transport = self.select(target);
        debug!(target_domain = %target, kind = %transport.kind(), "Selected transport");
        self.transports.write().insert(target, transport.clone());
        transport
    }

    /// Forget the cached transport for `target`.
    pub fn invalidate(&self, target: DomainName) {
        self.transports.write().remove(&target);
    }

    #[must_use]
    pub fn cached_kind(&self, target: DomainName) -> Option<TransportKind> {
        self.transports.read().get(&target).map(|t| t.kind())
    }

    fn select(&self, target: DomainName) -> Arc<dyn Transport> {
        match self.env.frame(target) {
            Some(frame) if !frame.is_closed() => {
                Arc::new(FrameTransport::new(frame, self.env.origin()))
            }
            _ => Arc::new(StorageRelayTransport::new(
                target,
                self.env.clone(),
                self.registry,
                self.key_prefix.clone(),
            )),
        }
    }
}
