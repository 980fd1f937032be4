//! # Local Event Publisher
//!
//! Same-page event bus on which a relay announces completed actions and
//! session changes.

use crate::events::{EventFilter, RelayEvent};
use crate::subscriber::{EventStream, Subscription};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::debug;

/// Trait for publishing events to same-page listeners.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event.
    ///
    /// # Returns
    ///
    /// The number of active subscribers that received the event.
    async fn publish(&self, event: RelayEvent) -> usize;

    /// Get the total number of events published.
    fn events_published(&self) -> u64;
}

/// In-memory local event bus.
///
/// Uses `tokio::sync::broadcast` for multi-consumer semantics. Events
/// published while nobody listens are dropped.
pub struct LocalEventBus {
    /// Broadcast sender for events.
    sender: broadcast::Sender<RelayEvent>,

    /// Total events published.
    events_published: AtomicU64,

    /// Channel capacity.
    capacity: usize,
}

impl LocalEventBus {
    /// Create a new event bus with the specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            events_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to events matching a filter.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(topics = ?filter.topics, "New local subscription created");
        Subscription::new(self.sender.subscribe(), filter)
    }

    /// Get a stream of events matching a filter.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        EventStream::new(self.sender.subscribe(), filter)
    }

    /// Get the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for LocalEventBus {
    fn default() -> Self {
        Self::with_capacity(crate::DEFAULT_EVENT_CAPACITY)
    }
}

#[async_trait]
impl EventPublisher for LocalEventBus {
    async fn publish(&self, event: RelayEvent) -> usize {
        let topic = event.topic();
        self.events_published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(topic = ?topic, receivers = receivers, "Local event published");
                receivers
            }
            Err(_) => {
                debug!(topic = ?topic, "Local event dropped (no listeners)");
                0
            }
        }
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}
