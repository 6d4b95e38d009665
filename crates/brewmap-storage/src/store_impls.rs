// Database-backed implementations of the core store traits
//
// Errors are mapped into the core error type at the trait boundary so the
// fan-out engine stays storage-agnostic.

use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

use brewmap_core::{
    CoreError, DisplayNameStore, NewNotification, NotificationPrefs, NotificationStore,
    PreferenceStore, RelationshipStore, Result,
};

use crate::repositories::Database;

#[async_trait]
impl RelationshipStore for Database {
    async fn venue_favoriters(&self, venue_id: Uuid) -> Result<Vec<Uuid>> {
        Database::venue_favoriters(self, venue_id)
            .await
            .map_err(|e| CoreError::store(e.to_string()))
    }

    async fn event_interested_users(&self, event_id: Uuid) -> Result<Vec<Uuid>> {
        Database::event_interested_users(self, event_id)
            .await
            .map_err(|e| CoreError::store(e.to_string()))
    }
}

#[async_trait]
impl PreferenceStore for Database {
    async fn preferences_for(&self, user_ids: &[Uuid]) -> Result<HashMap<Uuid, NotificationPrefs>> {
        let rows = Database::preferences_for(self, user_ids)
            .await
            .map_err(|e| CoreError::store(e.to_string()))?;
        Ok(rows.into_iter().map(|row| row.into_prefs()).collect())
    }
}

#[async_trait]
impl DisplayNameStore for Database {
    async fn venue_name(&self, venue_id: Uuid) -> Result<Option<String>> {
        Database::venue_name(self, venue_id)
            .await
            .map_err(|e| CoreError::store(e.to_string()))
    }

    async fn event_title(&self, event_id: Uuid) -> Result<Option<String>> {
        Database::event_title(self, event_id)
            .await
            .map_err(|e| CoreError::store(e.to_string()))
    }
}

#[async_trait]
impl NotificationStore for Database {
    async fn insert_notifications(&self, notifications: Vec<NewNotification>) -> Result<usize> {
        Database::insert_notifications(self, &notifications)
            .await
            .map_err(|e| CoreError::store(e.to_string()))
    }
}
