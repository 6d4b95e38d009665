// Database models (internal, may differ from public DTOs)

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use brewmap_core::NotificationPrefs;

// ============================================
// Preference models
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct NotificationPrefsRow {
    pub user_id: Uuid,
    pub venue_hours: bool,
    pub kitchen_hours: bool,
    pub happy_hours: bool,
    pub daily_specials: bool,
    pub event_created: bool,
    pub event_updated: bool,
    pub claim_decisions: bool,
}

impl NotificationPrefsRow {
    pub fn into_prefs(self) -> (Uuid, NotificationPrefs) {
        (
            self.user_id,
            NotificationPrefs {
                venue_hours: self.venue_hours,
                kitchen_hours: self.kitchen_hours,
                happy_hours: self.happy_hours,
                daily_specials: self.daily_specials,
                event_created: self.event_created,
                event_updated: self.event_updated,
                claim_decisions: self.claim_decisions,
            },
        )
    }
}

// ============================================
// Notification models
// ============================================

#[derive(Debug, Clone, FromRow)]
pub struct NotificationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(rename = "type")]
    pub notification_type: String,
    pub content: String,
    pub related_entity_id: Uuid,
    pub related_entity_type: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}
