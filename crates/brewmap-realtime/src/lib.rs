// Realtime change multiplexing
//
// This crate gives every logical subscriber the illusion of a private
// change stream while keeping the number of physical transport channels
// fixed: one per domain area. It provides:
// - RealtimeHub: subscription registry + channel multiplexer
// - ChangeStreamTransport: the seam for the managed pub/sub service
// - InMemoryTransport: scripted transport for tests
// - spawn_health_check: periodic recreate-from-scratch for bad channels

pub mod error;
pub mod health;
pub mod hub;
pub mod registry;
pub mod transport;

pub use error::{RealtimeError, Result};
pub use health::spawn_health_check;
pub use hub::{HubMetricsSnapshot, RealtimeConfig, RealtimeHub, Subscription};
pub use registry::{DispatchOutcome, SubscriptionId, SubscriptionRegistry};
pub use transport::{
    ChangeStreamTransport, ChannelStatus, InMemoryTransport, RawChange, TransportChannel,
};
