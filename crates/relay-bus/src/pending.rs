//! Pending Request Store - maps correlation IDs to waiting `request_action`
//! callers.
//!
//! Flow:
//! 1. `request_action` calls `register()` and gets a fresh `CorrelationId`
//!    plus a oneshot receiver
//! 2. The request is sent carrying the correlation ID
//! 3. The inbound handler receives the response and calls `complete()`
//! 4. The caller awaits the receiver or times out and calls `expire()`
//!
//! Every call has its own entry, so concurrent requests for the same action
//! resolve independently.

use dashmap::DashMap;
use relay_types::{Action, CorrelationId, DomainName, ResponseStatus};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Response delivered to a waiting caller.
#[derive(Debug, Clone)]
pub struct ActionReply {
    pub correlation_id: CorrelationId,
    pub status: ResponseStatus,
    pub result: Value,
    pub error: Option<String>,
    pub response_time: Duration,
}

/// A pending request waiting for response
struct PendingRequest {
    sender: oneshot::Sender<ActionReply>,
    created_at: Instant,
    target: DomainName,
    action: Action,
}

/// Statistics for pending request store
#[derive(Debug, Default)]
pub struct PendingStats {
    pub total_registered: AtomicU64,
    pub total_completed: AtomicU64,
    pub total_timeouts: AtomicU64,
    /// Requests whose caller went away before a response.
    pub total_cancelled: AtomicU64,
}

/// Why `complete()` did not deliver a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompleteError {
    /// No entry for the correlation ID (never registered, expired, or done).
    Unknown,
    /// The entry exists but was registered for another action.
    ActionMismatch,
    /// The caller dropped its receiver.
    CallerGone,
}

pub struct PendingRequestStore {
    pending: DashMap<CorrelationId, PendingRequest>,
    stats: PendingStats,
}

impl PendingRequestStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
            stats: PendingStats::default(),
        }
    }

    /// Register a pending request and get a receiver for the response.
    pub fn register(
        &self,
        target: DomainName,
        action: Action,
    ) -> (CorrelationId, oneshot::Receiver<ActionReply>) {
        let correlation_id = CorrelationId::new();
        let (tx, rx) = oneshot::channel();

        self.pending.insert(
            correlation_id,
            PendingRequest {
                sender: tx,
                created_at: Instant::now(),
                target,
                action,
            },
        );
        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);

        debug!(
            correlation_id = %correlation_id,
            target = %target,
            action = %action,
            "Registered pending request"
        );

        (correlation_id, rx)
    }

    /// Complete a pending request with a response for `action`.
    pub fn complete(
        &self,
        correlation_id: CorrelationId,
        action: &str,
        status: ResponseStatus,
        result: Value,
        error: Option<String>,
    ) -> Result<(), CompleteError> {
        let Some((_, pending)) = self
            .pending
            .remove_if(&correlation_id, |_, p| p.action.as_str() == action)
        else {
            if self.pending.contains_key(&correlation_id) {
                warn!(
                    correlation_id = %correlation_id,
                    action = action,
                    "Response names a different action than its request"
                );
                return Err(CompleteError::ActionMismatch);
            }
            warn!(
                correlation_id = %correlation_id,
                action = action,
                "Response for unknown or expired correlation ID"
            );
            return Err(CompleteError::Unknown);
        };

        let response_time = pending.created_at.elapsed();
        let reply = ActionReply {
            correlation_id,
            status,
            result,
            error,
            response_time,
        };

        match pending.sender.send(reply) {
            Ok(()) => {
                self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = %correlation_id,
                    target = %pending.target,
                    action = %pending.action,
                    response_time_ms = response_time.as_millis(),
                    "Completed pending request"
                );
                Ok(())
            }
            Err(_) => {
                self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = %correlation_id,
                    action = %pending.action,
                    "Pending request receiver dropped"
                );
                Err(CompleteError::CallerGone)
            }
        }
    }

    /// Remove a request whose timeout fired. Returns `true` if it was pending.
    pub fn expire(&self, correlation_id: &CorrelationId) -> bool {
        if let Some((_, request)) = self.pending.remove(correlation_id) {
            warn!(
                correlation_id = %correlation_id,
                target = %request.target,
                action = %request.action,
                elapsed_ms = request.created_at.elapsed().as_millis(),
                "Pending request timed out"
            );
            self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Remove a request whose caller went away.
    pub fn cancel(&self, correlation_id: &CorrelationId) -> bool {
        if self.pending.remove(correlation_id).is_some() {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_pending(&self, correlation_id: &CorrelationId) -> bool {
        self.pending.contains_key(correlation_id)
    }

    #[must_use]
    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }
}

impl Default for PendingRequestStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Cancels its request on drop unless the request already left the store.
pub(crate) struct PendingGuard<'a> {
    store: &'a PendingRequestStore,
    correlation_id: CorrelationId,
}

impl<'a> PendingGuard<'a> {
    pub(crate) fn new(store: &'a PendingRequestStore, correlation_id: CorrelationId) -> Self {
        Self {
            store,
            correlation_id,
        }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.store.cancel(&self.correlation_id) {
            debug!(correlation_id = %self.correlation_id, "Pending request abandoned");
        }
    }
}
