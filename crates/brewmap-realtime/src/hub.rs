// Channel multiplexer
//
// Many logical subscriptions share a small fixed set of physical channels,
// one per domain area. A channel is opened lazily on the first subscriber
// and closed when no subscriber references any category it serves. The
// open/close decision is always recomputed from the live subscription set
// at the moment of the check, so interleaved subscribe/unsubscribe calls
// cannot strand a counter.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Duration;

use brewmap_core::{ChangeEvent, ChannelName, EventCategory, EventFilter};

use crate::error::{RealtimeError, Result};
use crate::registry::{SubscriptionId, SubscriptionRegistry};
use crate::transport::{ChangeStreamTransport, ChannelStatus, RawChange, TransportChannel};

/// Configuration for a [`RealtimeHub`].
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Optional prefix for transport channel names, for sharing one
    /// transport project across environments.
    pub channel_prefix: Option<String>,
    /// How often the health check re-examines channel status.
    pub health_check_interval: Duration,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            channel_prefix: None,
            health_check_interval: Duration::from_secs(30),
        }
    }
}

impl RealtimeConfig {
    fn channel_name(&self, channel: ChannelName) -> String {
        match &self.channel_prefix {
            Some(prefix) => format!("{prefix}:{}", channel.as_str()),
            None => channel.as_str().to_string(),
        }
    }
}

/// A live logical subscription.
///
/// The handle owns the delivery queue; the registry entry lives until
/// [`RealtimeHub::unsubscribe`] is called with [`Subscription::id`].
/// Dropping the handle only stops delivery.
pub struct Subscription {
    id: SubscriptionId,
    category: EventCategory,
    events: mpsc::UnboundedReceiver<ChangeEvent>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn category(&self) -> EventCategory {
        self.category
    }

    /// Receive the next change event. Returns `None` once the subscription
    /// has been removed from the registry and the queue is drained.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    /// Non-blocking receive.
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        self.events.try_recv().ok()
    }
}

struct OpenChannel {
    handle: Box<dyn TransportChannel>,
    status_rx: watch::Receiver<ChannelStatus>,
    status_task: JoinHandle<()>,
}

/// Counters for hub activity.
#[derive(Debug, Default)]
pub struct HubMetrics {
    events_dispatched: AtomicU64,
    events_dropped: AtomicU64,
    channels_opened: AtomicU64,
    channels_closed: AtomicU64,
}

/// Point-in-time snapshot of [`HubMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubMetricsSnapshot {
    pub events_dispatched: u64,
    pub events_dropped: u64,
    pub channels_opened: u64,
    pub channels_closed: u64,
}

impl HubMetrics {
    fn snapshot(&self) -> HubMetricsSnapshot {
        HubMetricsSnapshot {
            events_dispatched: self.events_dispatched.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            channels_opened: self.channels_opened.load(Ordering::Relaxed),
            channels_closed: self.channels_closed.load(Ordering::Relaxed),
        }
    }
}

/// The realtime hub: subscription registry plus channel multiplexer.
///
/// Explicitly constructed and passed by reference; lifecycle is tied to
/// application startup/shutdown, not module load. Must be created inside a
/// Tokio runtime (it spawns its router task on construction).
pub struct RealtimeHub {
    transport: Arc<dyn ChangeStreamTransport>,
    config: RealtimeConfig,
    registry: SubscriptionRegistry,
    channels: Mutex<HashMap<ChannelName, OpenChannel>>,
    raw_tx: mpsc::UnboundedSender<RawChange>,
    metrics: HubMetrics,
    router: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl RealtimeHub {
    pub fn new(transport: Arc<dyn ChangeStreamTransport>, config: RealtimeConfig) -> Arc<Self> {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let hub = Arc::new(Self {
            transport,
            config,
            registry: SubscriptionRegistry::new(),
            channels: Mutex::new(HashMap::new()),
            raw_tx,
            metrics: HubMetrics::default(),
            router: std::sync::Mutex::new(None),
        });
        let router = tokio::spawn(route_events(Arc::downgrade(&hub), raw_rx));
        *hub.router.lock().unwrap() = Some(router);
        hub
    }

    /// Subscribe to a category, optionally filtered.
    ///
    /// Records the logical subscription, then lazily opens the physical
    /// channel for the category's domain area. If the channel cannot be
    /// opened the subscription is rolled back and the error returned; the
    /// hub never retries on its own.
    pub async fn subscribe(
        &self,
        category: EventCategory,
        filter: Option<EventFilter>,
    ) -> Result<Subscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.registry.register(category, filter, tx);
        if let Err(err) = self.ensure_channel(category.channel()).await {
            self.registry.remove(id);
            return Err(err);
        }
        tracing::debug!(subscription = %id, category = ?category, "subscribed");
        Ok(Subscription {
            id,
            category,
            events: rx,
        })
    }

    /// Remove a subscription and close its channel if nothing else needs
    /// it. Unknown ids are a no-op, so cleanup is idempotent.
    pub async fn unsubscribe(&self, id: SubscriptionId) {
        let Some(category) = self.registry.remove(id) else {
            tracing::debug!(subscription = %id, "unsubscribe for unknown subscription");
            return;
        };
        tracing::debug!(subscription = %id, category = ?category, "unsubscribed");
        self.release_if_unused(category.channel()).await;
    }

    /// Close and reopen a channel from scratch. Partial repair is never
    /// attempted; a channel that went bad is torn down whole.
    pub async fn recycle_channel(&self, channel: ChannelName) -> Result<()> {
        let mut channels = self.channels.lock().await;
        if channels.contains_key(&channel) {
            self.close_locked(channel, &mut channels).await;
        }
        // The subscription set may have drained while the lock was awaited;
        // only reopen if the channel is still needed.
        if self.registry.has_live_for_channel(channel) {
            self.open_locked(channel, &mut channels).await?;
        }
        Ok(())
    }

    /// Channels whose last reported status is disconnected or errored.
    pub async fn unhealthy_channels(&self) -> Vec<ChannelName> {
        let channels = self.channels.lock().await;
        channels
            .iter()
            .filter(|(_, open)| {
                matches!(
                    *open.status_rx.borrow(),
                    ChannelStatus::Disconnected | ChannelStatus::Errored
                )
            })
            .map(|(channel, _)| *channel)
            .collect()
    }

    /// Close every channel and stop routing. In-flight dispatches are
    /// dropped; there is no graceful drain.
    pub async fn shutdown(&self) {
        let mut channels = self.channels.lock().await;
        let open: Vec<ChannelName> = channels.keys().copied().collect();
        for channel in open {
            self.close_locked(channel, &mut channels).await;
        }
        drop(channels);
        if let Some(router) = self.router.lock().unwrap().take() {
            router.abort();
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.registry.count()
    }

    pub fn subscription_count_for(&self, category: EventCategory) -> usize {
        self.registry.count_for(category)
    }

    pub async fn open_channel_count(&self) -> usize {
        self.channels.lock().await.len()
    }

    pub fn metrics(&self) -> HubMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub(crate) fn health_check_interval(&self) -> Duration {
        self.config.health_check_interval
    }

    /// Translate a raw transport event and fan it out.
    fn on_transport_event(&self, raw: RawChange) {
        let Some(category) = EventCategory::from_table(&raw.table) else {
            tracing::debug!(table = %raw.table, "change event for unmapped table");
            return;
        };
        let event = ChangeEvent {
            category,
            op: raw.op,
            before: raw.before,
            after: raw.after,
        };
        let outcome = self.registry.dispatch(&event);
        self.metrics
            .events_dispatched
            .fetch_add(outcome.delivered as u64, Ordering::Relaxed);
        self.metrics
            .events_dropped
            .fetch_add(outcome.dropped as u64, Ordering::Relaxed);
    }

    async fn ensure_channel(&self, channel: ChannelName) -> Result<()> {
        let mut channels = self.channels.lock().await;
        if channels.contains_key(&channel) {
            return Ok(());
        }
        self.open_locked(channel, &mut channels).await?;
        // The subscriber that triggered this open may have unsubscribed
        // while the transport call was in flight; re-derive need from the
        // live set rather than trusting the state from before the await.
        if !self.registry.has_live_for_channel(channel) {
            self.close_locked(channel, &mut channels).await;
        }
        Ok(())
    }

    async fn release_if_unused(&self, channel: ChannelName) {
        let mut channels = self.channels.lock().await;
        if self.registry.has_live_for_channel(channel) {
            return;
        }
        self.close_locked(channel, &mut channels).await;
    }

    async fn open_locked(
        &self,
        channel: ChannelName,
        channels: &mut HashMap<ChannelName, OpenChannel>,
    ) -> Result<()> {
        let name = self.config.channel_name(channel);
        let mut handle = self
            .transport
            .open_channel(&name)
            .await
            .map_err(|err| RealtimeError::channel_open(name.as_str(), err.to_string()))?;

        // Attach a listener for every table served by this channel, not
        // just the requesting category: once open, the channel must serve
        // any future sibling subscriber without reopening.
        for category in channel.categories() {
            handle.watch_table(category.table(), self.raw_tx.clone());
        }

        let (status_tx, status_rx) = watch::channel(ChannelStatus::Connecting);
        if let Err(err) = handle.activate(status_tx).await {
            if let Err(close_err) = handle.close().await {
                tracing::warn!(channel = %name, error = %close_err, "error closing unactivated channel");
            }
            return Err(RealtimeError::channel_open(name.as_str(), err.to_string()));
        }

        let status_task = tokio::spawn(watch_channel_status(name.clone(), status_rx.clone()));
        channels.insert(
            channel,
            OpenChannel {
                handle,
                status_rx,
                status_task,
            },
        );
        self.metrics.channels_opened.fetch_add(1, Ordering::Relaxed);
        tracing::info!(channel = %name, "opened realtime channel");
        Ok(())
    }

    async fn close_locked(
        &self,
        channel: ChannelName,
        channels: &mut HashMap<ChannelName, OpenChannel>,
    ) {
        let Some(open) = channels.remove(&channel) else {
            return;
        };
        open.status_task.abort();
        if let Err(err) = open.handle.close().await {
            tracing::warn!(channel = %channel, error = %err, "error closing realtime channel");
        }
        self.metrics.channels_closed.fetch_add(1, Ordering::Relaxed);
        tracing::info!(channel = %channel, "closed realtime channel");
    }
}

async fn route_events(hub: Weak<RealtimeHub>, mut raw_rx: mpsc::UnboundedReceiver<RawChange>) {
    while let Some(raw) = raw_rx.recv().await {
        let Some(hub) = hub.upgrade() else {
            break;
        };
        hub.on_transport_event(raw);
    }
}

async fn watch_channel_status(name: String, mut status_rx: watch::Receiver<ChannelStatus>) {
    loop {
        let status = *status_rx.borrow_and_update();
        match status {
            ChannelStatus::Connected => tracing::debug!(channel = %name, "channel connected"),
            ChannelStatus::Disconnected => {
                tracing::warn!(channel = %name, "channel disconnected")
            }
            ChannelStatus::Errored => tracing::error!(channel = %name, "channel errored"),
            ChannelStatus::Connecting => {}
        }
        if status_rx.changed().await.is_err() {
            break;
        }
    }
}
