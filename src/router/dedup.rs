use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, PoisonError};

pub const DEFAULT_DEDUP_CAPACITY: usize = 1024;

#[derive(Debug, Default)]
struct Seen {
    ids: HashSet<String>,
    order: VecDeque<String>,
}

/// Bounded memory of recently handled event ids. Oldest ids are forgotten
/// first once `capacity` is reached.
#[derive(Debug)]
pub struct EventDeduplicator {
    capacity: usize,
    seen: Mutex<Seen>,
}

impl Default for EventDeduplicator {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_CAPACITY)
    }
}

impl EventDeduplicator {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            seen: Mutex::new(Seen::default()),
        }
    }

    /// Records `event_id` and reports whether this is its first delivery.
    /// Events without an id are never treated as duplicates.
    pub fn first_sighting(&self, event_id: &str) -> bool {
        if event_id.is_empty() {
            return true;
        }

        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        if !seen.ids.insert(event_id.to_string()) {
            return false;
        }
        seen.order.push_back(event_id.to_string());
        while seen.order.len() > self.capacity {
            if let Some(oldest) = seen.order.pop_front() {
                seen.ids.remove(&oldest);
            }
        }
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
