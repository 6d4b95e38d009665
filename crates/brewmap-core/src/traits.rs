// Store traits for pluggable backends
//
// These traits keep the fan-out engine store-agnostic:
// - In-memory implementations for examples and testing
// - Postgres implementations for production (brewmap-storage)

use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::Result;
use crate::notification::{NewNotification, NotificationPrefs};

// ============================================================================
// RelationshipStore - Who cares about an entity
// ============================================================================

/// Resolves recipient candidates from relationship tables.
#[async_trait]
pub trait RelationshipStore: Send + Sync {
    /// Users who favorited the given venue.
    async fn venue_favoriters(&self, venue_id: Uuid) -> Result<Vec<Uuid>>;

    /// Users who expressed interest in the given event.
    async fn event_interested_users(&self, event_id: Uuid) -> Result<Vec<Uuid>>;
}

// ============================================================================
// PreferenceStore - Per-user notification opt-ins
// ============================================================================

/// Fetches per-user notification preference flags.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Preference rows for the given users, in one batched call.
    ///
    /// Users without a preference row are absent from the returned map; the
    /// caller treats absence as opted out.
    async fn preferences_for(&self, user_ids: &[Uuid]) -> Result<HashMap<Uuid, NotificationPrefs>>;
}

// ============================================================================
// DisplayNameStore - Human-readable names for content composition
// ============================================================================

/// Looks up display names used when composing notification content.
#[async_trait]
pub trait DisplayNameStore: Send + Sync {
    async fn venue_name(&self, venue_id: Uuid) -> Result<Option<String>>;

    async fn event_title(&self, event_id: Uuid) -> Result<Option<String>>;
}

// ============================================================================
// NotificationStore - Batched notification writes
// ============================================================================

/// Writes notification records.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Insert all records in one batched write, returning how many were
    /// written. Implementations may assume the batch belongs to a single
    /// trigger instance; an empty batch must be a no-op.
    async fn insert_notifications(&self, notifications: Vec<NewNotification>) -> Result<usize>;
}
