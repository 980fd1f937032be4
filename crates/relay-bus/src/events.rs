//! # Relay Events
//!
//! Same-page notifications published by a relay for UI layers. These never
//! leave the page; cross-domain traffic uses `RelayMessage`.

use relay_types::{CorrelationId, DomainName, ResponseStatus, Session};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Events a relay publishes on its local event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RelayEvent {
    /// An action response arrived.
    ActionComplete {
        action: String,
        correlation_id: CorrelationId,
        status: ResponseStatus,
        result: Value,
    },

    /// The local session was merged with an incoming update.
    SessionUpdated(Session),

    /// The local session entered the emergency state.
    EmergencyActivated { data: Value },

    /// An embedded frame announced it is ready.
    DomainReady { domain: DomainName },
}

impl RelayEvent {
    /// Get the topic for this event.
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            RelayEvent::ActionComplete { .. } => EventTopic::Actions,
            RelayEvent::SessionUpdated(_) => EventTopic::Session,
            RelayEvent::EmergencyActivated { .. } => EventTopic::Emergency,
            RelayEvent::DomainReady { .. } => EventTopic::Lifecycle,
        }
    }
}

/// Event topics for filtering subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    Actions,
    Session,
    Emergency,
    Lifecycle,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to subscribe to (empty = all).
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self { topics: Vec::new() }
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &RelayEvent) -> bool {
        self.topics.is_empty() || self.topics.contains(&event.topic())
    }
}
