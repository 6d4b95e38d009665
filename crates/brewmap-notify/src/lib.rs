// Notification fan-out
//
// This crate decides, for every domain trigger, exactly which users
// receive a notification: candidates come from the relationship sources,
// per-user preference flags gate delivery, duplicates collapse to one
// record per trigger, and all surviving records are written in one batch.
// The change-event-driven trigger handlers wire the engine onto
// brewmap-realtime subscriptions.

pub mod engine;
pub mod error;
pub mod handlers;

pub use engine::{
    ClaimStatus, EventChangeKind, FanoutReport, NotificationEngine, VenueUpdateKind,
};
pub use error::{NotifyError, Result};
pub use handlers::{
    handle_daily_special_change, handle_happy_hour_change, handle_venue_event_change,
    handle_venue_hours_change, spawn_change_handlers, ChangeHandlerSet,
};
