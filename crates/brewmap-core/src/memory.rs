// In-memory store implementations for examples and testing
//
// These implementations keep all data in memory, making them perfect for:
// - Unit tests that exercise the fan-out pipeline without Postgres
// - Quick prototyping

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::Result;
use crate::notification::{NewNotification, NotificationPrefs};
use crate::traits::{DisplayNameStore, NotificationStore, PreferenceStore, RelationshipStore};

// ============================================================================
// InMemoryRelationshipStore
// ============================================================================

/// In-memory favorite/interest relations, keyed by venue and event id.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRelationshipStore {
    favorites: Arc<RwLock<HashMap<Uuid, Vec<Uuid>>>>,
    interests: Arc<RwLock<HashMap<Uuid, Vec<Uuid>>>>,
}

impl InMemoryRelationshipStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `user_id` favorited `venue_id`.
    pub async fn add_favorite(&self, venue_id: Uuid, user_id: Uuid) {
        self.favorites
            .write()
            .await
            .entry(venue_id)
            .or_default()
            .push(user_id);
    }

    /// Record that `user_id` is interested in `event_id`.
    pub async fn add_interest(&self, event_id: Uuid, user_id: Uuid) {
        self.interests
            .write()
            .await
            .entry(event_id)
            .or_default()
            .push(user_id);
    }
}

#[async_trait]
impl RelationshipStore for InMemoryRelationshipStore {
    async fn venue_favoriters(&self, venue_id: Uuid) -> Result<Vec<Uuid>> {
        Ok(self
            .favorites
            .read()
            .await
            .get(&venue_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn event_interested_users(&self, event_id: Uuid) -> Result<Vec<Uuid>> {
        Ok(self
            .interests
            .read()
            .await
            .get(&event_id)
            .cloned()
            .unwrap_or_default())
    }
}

// ============================================================================
// InMemoryPreferenceStore
// ============================================================================

/// In-memory preference rows keyed by user id. Users without an entry have
/// no preference row, mirroring the datastore.
#[derive(Debug, Default, Clone)]
pub struct InMemoryPreferenceStore {
    prefs: Arc<RwLock<HashMap<Uuid, NotificationPrefs>>>,
}

impl InMemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, user_id: Uuid, prefs: NotificationPrefs) {
        self.prefs.write().await.insert(user_id, prefs);
    }
}

#[async_trait]
impl PreferenceStore for InMemoryPreferenceStore {
    async fn preferences_for(&self, user_ids: &[Uuid]) -> Result<HashMap<Uuid, NotificationPrefs>> {
        let prefs = self.prefs.read().await;
        Ok(user_ids
            .iter()
            .filter_map(|id| prefs.get(id).map(|p| (*id, *p)))
            .collect())
    }
}

// ============================================================================
// InMemoryDisplayNameStore
// ============================================================================

/// In-memory venue/event display names.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDisplayNameStore {
    venues: Arc<RwLock<HashMap<Uuid, String>>>,
    events: Arc<RwLock<HashMap<Uuid, String>>>,
}

impl InMemoryDisplayNameStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_venue_name(&self, venue_id: Uuid, name: impl Into<String>) {
        self.venues.write().await.insert(venue_id, name.into());
    }

    pub async fn set_event_title(&self, event_id: Uuid, title: impl Into<String>) {
        self.events.write().await.insert(event_id, title.into());
    }
}

#[async_trait]
impl DisplayNameStore for InMemoryDisplayNameStore {
    async fn venue_name(&self, venue_id: Uuid) -> Result<Option<String>> {
        Ok(self.venues.read().await.get(&venue_id).cloned())
    }

    async fn event_title(&self, event_id: Uuid) -> Result<Option<String>> {
        Ok(self.events.read().await.get(&event_id).cloned())
    }
}

// ============================================================================
// InMemoryNotificationStore
// ============================================================================

/// Collects written notifications in memory for assertions.
#[derive(Debug, Default, Clone)]
pub struct InMemoryNotificationStore {
    written: Arc<RwLock<Vec<NewNotification>>>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All notifications written so far, in write order.
    pub async fn written(&self) -> Vec<NewNotification> {
        self.written.read().await.clone()
    }

    pub async fn clear(&self) {
        self.written.write().await.clear();
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn insert_notifications(&self, notifications: Vec<NewNotification>) -> Result<usize> {
        let count = notifications.len();
        self.written.write().await.extend(notifications);
        Ok(count)
    }
}
