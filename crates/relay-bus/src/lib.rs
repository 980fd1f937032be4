//! # Relay Bus - Cross-Domain Message Relay
//!
//! Lets code running under one logical domain invoke an action handled by
//! another domain and receive its result, with no shared backend.
//!
//! ## Transports
//!
//! ```text
//! ┌──────────────┐   frame post        ┌──────────────┐
//! │  blockchain  │ ──────────────────► │    crypto    │
//! │    relay     │                     │    relay     │
//! │              │   storage record    │              │
//! │              │ ──► [storage] ◄──── │  (drains on  │
//! │              │   + window post     │  initialize) │
//! └──────────────┘ ──────────────────► └──────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - **Session gating:** a message naming another session is never handled
//! - **Correlated requests:** every `request_action` call has its own
//!   correlation id and resolves independently
//! - **At-most-once handling:** copies of a message arriving over both
//!   transports are dropped by `messageId`
//! - **Best effort:** nothing is retried; an unanswered request times out

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod config;
pub mod dedup;
pub mod environment;
pub mod events;
pub mod pending;
pub mod publisher;
pub mod relay;
pub mod storage;
pub mod subscriber;
pub mod transport;
pub mod window;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export main types
pub use config::{
    ConfigError, RelayConfig, DEFAULT_EVENT_CAPACITY, DEFAULT_RELAY_KEY_PREFIX,
    DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_SESSION_KEY,
};
pub use dedup::SeenMessages;
pub use environment::{
    detect_current_domain, LocationError, Notifier, PageEnvironment, PageLocation, Severity,
    TracingNotifier,
};
pub use events::{EventFilter, EventTopic, RelayEvent};
pub use pending::{ActionReply, PendingRequestStore, PendingStats};
pub use publisher::{EventPublisher, LocalEventBus};
pub use relay::{DomainRelay, DomainRelayBuilder};
pub use storage::{FileStorage, KeyValueStore, MemoryStorage, SessionStore};
pub use subscriber::{EventStream, Subscription, SubscriptionError};
pub use transport::{
    relay_record_key, FrameTransport, StorageRecord, StorageRelayTransport, Transport,
    TransportKind, TransportTable,
};
pub use window::{Inbox, PostedMessage, WindowHandle};
