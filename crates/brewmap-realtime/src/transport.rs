// Change-stream transport seam
//
// The transport is an external collaborator: a managed publish/subscribe
// service that opens named channels and delivers row-level change events
// for watched tables. This module defines the trait the multiplexer is
// built against, plus an in-memory implementation used by tests.
//
// Delivery contract assumed of implementations: at-least-once per open
// channel, in transport order within a channel, no ordering across
// channels.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};

use brewmap_core::{ChangeOp, Row};

use crate::error::{RealtimeError, Result};

/// A raw change event as delivered by the transport, before category
/// tagging.
#[derive(Debug, Clone)]
pub struct RawChange {
    pub table: String,
    pub op: ChangeOp,
    pub before: Option<Row>,
    pub after: Option<Row>,
}

/// Connection status of a physical channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Connecting,
    Connected,
    Disconnected,
    Errored,
}

/// A managed change-stream transport.
#[async_trait]
pub trait ChangeStreamTransport: Send + Sync {
    /// Open a named channel. The returned handle is inert until
    /// [`TransportChannel::activate`] is called.
    async fn open_channel(&self, name: &str) -> Result<Box<dyn TransportChannel>>;
}

/// One physical channel on the transport.
#[async_trait]
pub trait TransportChannel: Send + Sync {
    /// Watch row-level changes on a table, delivering them to `sink`.
    /// All tables must be registered before [`TransportChannel::activate`].
    fn watch_table(&mut self, table: &'static str, sink: mpsc::UnboundedSender<RawChange>);

    /// Activate the channel. Status transitions are reported through
    /// `status` for the lifetime of the channel.
    async fn activate(&mut self, status: watch::Sender<ChannelStatus>) -> Result<()>;

    /// Close the channel and release the transport-side subscription.
    async fn close(self: Box<Self>) -> Result<()>;
}

// ============================================================================
// InMemoryTransport - Scripted transport for tests
// ============================================================================

#[derive(Debug, Default)]
struct ChannelRecord {
    sinks: HashMap<&'static str, Vec<mpsc::UnboundedSender<RawChange>>>,
    status: Option<watch::Sender<ChannelStatus>>,
}

#[derive(Debug, Default)]
struct TransportState {
    open: HashMap<String, ChannelRecord>,
    opened_total: usize,
    closed_total: usize,
    fail_open: bool,
    fail_activate: bool,
}

/// In-memory transport: channels are plain bookkeeping, and tests inject
/// change events and status transitions by hand.
#[derive(Debug, Default, Clone)]
pub struct InMemoryTransport {
    state: Arc<Mutex<TransportState>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next (and all further) open calls fail.
    pub fn set_fail_open(&self, fail: bool) {
        self.state.lock().unwrap().fail_open = fail;
    }

    /// Make activation fail while open succeeds.
    pub fn set_fail_activate(&self, fail: bool) {
        self.state.lock().unwrap().fail_activate = fail;
    }

    /// Names of currently open channels.
    pub fn open_channels(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.lock().unwrap().open.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn open_count(&self) -> usize {
        self.state.lock().unwrap().open.len()
    }

    pub fn opened_total(&self) -> usize {
        self.state.lock().unwrap().opened_total
    }

    pub fn closed_total(&self) -> usize {
        self.state.lock().unwrap().closed_total
    }

    /// Tables watched on an open channel.
    pub fn tables_watched(&self, channel: &str) -> Vec<&'static str> {
        let state = self.state.lock().unwrap();
        let mut tables: Vec<&'static str> = state
            .open
            .get(channel)
            .map(|record| record.sinks.keys().copied().collect())
            .unwrap_or_default();
        tables.sort_unstable();
        tables
    }

    /// Deliver a change event to every open channel watching its table.
    pub fn emit(&self, change: RawChange) {
        let state = self.state.lock().unwrap();
        for record in state.open.values() {
            if let Some(sinks) = record.sinks.get(change.table.as_str()) {
                for sink in sinks {
                    let _ = sink.send(change.clone());
                }
            }
        }
    }

    /// Report a status transition on an open channel.
    pub fn set_status(&self, channel: &str, status: ChannelStatus) {
        let state = self.state.lock().unwrap();
        if let Some(sender) = state.open.get(channel).and_then(|r| r.status.as_ref()) {
            let _ = sender.send(status);
        }
    }
}

#[async_trait]
impl ChangeStreamTransport for InMemoryTransport {
    async fn open_channel(&self, name: &str) -> Result<Box<dyn TransportChannel>> {
        let mut state = self.state.lock().unwrap();
        if state.fail_open {
            return Err(RealtimeError::transport("open refused"));
        }
        state.opened_total += 1;
        state.open.insert(name.to_string(), ChannelRecord::default());
        Ok(Box::new(InMemoryChannel {
            name: name.to_string(),
            state: Arc::clone(&self.state),
        }))
    }
}

struct InMemoryChannel {
    name: String,
    state: Arc<Mutex<TransportState>>,
}

#[async_trait]
impl TransportChannel for InMemoryChannel {
    fn watch_table(&mut self, table: &'static str, sink: mpsc::UnboundedSender<RawChange>) {
        let mut state = self.state.lock().unwrap();
        if let Some(record) = state.open.get_mut(&self.name) {
            record.sinks.entry(table).or_default().push(sink);
        }
    }

    async fn activate(&mut self, status: watch::Sender<ChannelStatus>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_activate {
            // The channel stays reserved until the caller closes it.
            return Err(RealtimeError::transport("activate refused"));
        }
        if let Some(record) = state.open.get_mut(&self.name) {
            let _ = status.send(ChannelStatus::Connected);
            record.status = Some(status);
        }
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.open.remove(&self.name).is_some() {
            state.closed_total += 1;
        }
        Ok(())
    }
}
