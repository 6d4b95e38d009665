// Subscription registry
//
// Records each logical subscription under a unique id and routes change
// events to matching subscribers. Many subscriptions may share one
// category; removal is idempotent so cleanup paths can race safely.
//
// Lock discipline: the internal RwLock is only held across non-suspending
// sections. Methods panic if the lock is poisoned, which cannot happen
// unless a holder panicked.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tokio::sync::mpsc;

use brewmap_core::{ChangeEvent, ChannelName, EventCategory, EventFilter};

/// Unique identifier for a logical subscription.
///
/// Monotonically assigned by [`SubscriptionRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

struct Registered {
    category: EventCategory,
    filter: Option<EventFilter>,
    sender: mpsc::UnboundedSender<ChangeEvent>,
}

/// Outcome counters for one dispatched event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Subscriptions whose category and filter matched.
    pub matched: usize,
    /// Events actually handed to a subscriber queue.
    pub delivered: usize,
    /// Matching subscriptions whose queue was gone (receiver dropped).
    pub dropped: usize,
}

/// Registry of live logical subscriptions.
pub struct SubscriptionRegistry {
    subscriptions: RwLock<HashMap<SubscriptionId, Registered>>,
    next_id: AtomicU64,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Store a subscription and return its id.
    pub fn register(
        &self,
        category: EventCategory,
        filter: Option<EventFilter>,
        sender: mpsc::UnboundedSender<ChangeEvent>,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscriptions.write().unwrap().insert(
            id,
            Registered {
                category,
                filter,
                sender,
            },
        );
        id
    }

    /// Remove a subscription, returning its category if it was present.
    /// Removing an unknown id is a no-op, not an error.
    pub fn remove(&self, id: SubscriptionId) -> Option<EventCategory> {
        self.subscriptions
            .write()
            .unwrap()
            .remove(&id)
            .map(|registered| registered.category)
    }

    /// Whether any live subscription references a category served by the
    /// given channel. This is the recomputed truth channel teardown relies
    /// on; there is no counter to drift.
    pub fn has_live_for_channel(&self, channel: ChannelName) -> bool {
        self.subscriptions
            .read()
            .unwrap()
            .values()
            .any(|registered| registered.category.channel() == channel)
    }

    /// Fan an event out to every matching subscription.
    ///
    /// A subscriber whose queue is gone is logged and skipped; it never
    /// affects delivery to the others. No cross-subscriber ordering is
    /// guaranteed.
    pub fn dispatch(&self, event: &ChangeEvent) -> DispatchOutcome {
        let subscriptions = self.subscriptions.read().unwrap();
        let mut outcome = DispatchOutcome::default();
        for (id, registered) in subscriptions.iter() {
            if registered.category != event.category {
                continue;
            }
            if let Some(filter) = &registered.filter {
                if !filter.matches(event) {
                    continue;
                }
            }
            outcome.matched += 1;
            match registered.sender.send(event.clone()) {
                Ok(()) => outcome.delivered += 1,
                Err(_) => {
                    outcome.dropped += 1;
                    tracing::debug!(
                        subscription = %id,
                        category = ?event.category,
                        "subscriber queue gone, event dropped"
                    );
                }
            }
        }
        outcome
    }

    /// Total live subscriptions.
    pub fn count(&self) -> usize {
        self.subscriptions.read().unwrap().len()
    }

    /// Live subscriptions for one category.
    pub fn count_for(&self, category: EventCategory) -> usize {
        self.subscriptions
            .read()
            .unwrap()
            .values()
            .filter(|registered| registered.category == category)
            .count()
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
