//! # Time-Bounded Dedup Cache
//!
//! A message can reach a page twice: once posted to its window and once as a
//! storage-relay record drained on initialize. The cache remembers message
//! ids for a bounded window so each message is handled at most once.
//!
//! - Ids are forgotten after the window expires
//! - Expired ids are garbage-collected lazily, at most once per GC interval

use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Time-bounded set of recently handled message ids.
pub struct SeenMessages {
    /// Map of message id -> when it was first seen.
    seen: HashMap<Uuid, Instant>,

    /// How long an id is remembered.
    window: Duration,

    /// Last garbage collection.
    last_gc: Instant,

    /// Garbage collection interval.
    gc_interval: Duration,
}

impl SeenMessages {
    /// Default garbage collection interval.
    pub const DEFAULT_GC_INTERVAL: Duration = Duration::from_secs(10);

    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            seen: HashMap::new(),
            window,
            last_gc: Instant::now(),
            gc_interval: Self::DEFAULT_GC_INTERVAL.min(window),
        }
    }

    /// Record `id`. Returns `true` if it was not seen within the window.
    pub fn first_sighting(&mut self, id: Uuid) -> bool {
        let now = Instant::now();
        self.maybe_gc(now);

        match self.seen.get(&id) {
            Some(at) if now.duration_since(*at) <= self.window => false,
            _ => {
                self.seen.insert(id, now);
                true
            }
        }
    }

    /// Number of remembered ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    fn maybe_gc(&mut self, now: Instant) {
        if now.duration_since(self.last_gc) < self.gc_interval {
            return;
        }
        let window = self.window;
        self.seen.retain(|_, at| now.duration_since(*at) <= window);
        self.last_gc = now;
    }
}
