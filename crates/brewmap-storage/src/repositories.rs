// Repository layer for database operations

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use brewmap_core::{NewNotification, NotificationPrefs};

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::models::{NotificationPrefsRow, NotificationRow};

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create database connection from URL
    pub async fn from_url(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    /// Create database connection from environment configuration
    pub async fn from_env() -> Result<Self> {
        let config = DatabaseConfig::from_env()?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ============================================
    // Relationships (read side used by fan-out)
    // ============================================

    /// Users who favorited a venue.
    pub async fn venue_favoriters(&self, venue_id: Uuid) -> Result<Vec<Uuid>> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT user_id
            FROM venue_favorites
            WHERE venue_id = $1
            "#,
        )
        .bind(venue_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(user_id,)| user_id).collect())
    }

    /// Users who expressed interest in an event.
    pub async fn event_interested_users(&self, event_id: Uuid) -> Result<Vec<Uuid>> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT user_id
            FROM event_interests
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(user_id,)| user_id).collect())
    }

    // ============================================
    // Notification preferences
    // ============================================

    /// Preference rows for a batch of users. Users without a row are
    /// simply absent from the result.
    pub async fn preferences_for(&self, user_ids: &[Uuid]) -> Result<Vec<NotificationPrefsRow>> {
        let rows = sqlx::query_as::<_, NotificationPrefsRow>(
            r#"
            SELECT user_id, venue_hours, kitchen_hours, happy_hours, daily_specials,
                   event_created, event_updated, claim_decisions
            FROM notification_preferences
            WHERE user_id = ANY($1)
            "#,
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Create or replace a user's preference row.
    pub async fn upsert_preferences(&self, user_id: Uuid, prefs: NotificationPrefs) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notification_preferences
                (user_id, venue_hours, kitchen_hours, happy_hours, daily_specials,
                 event_created, event_updated, claim_decisions)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id) DO UPDATE SET
                venue_hours = EXCLUDED.venue_hours,
                kitchen_hours = EXCLUDED.kitchen_hours,
                happy_hours = EXCLUDED.happy_hours,
                daily_specials = EXCLUDED.daily_specials,
                event_created = EXCLUDED.event_created,
                event_updated = EXCLUDED.event_updated,
                claim_decisions = EXCLUDED.claim_decisions,
                updated_at = now()
            "#,
        )
        .bind(user_id)
        .bind(prefs.venue_hours)
        .bind(prefs.kitchen_hours)
        .bind(prefs.happy_hours)
        .bind(prefs.daily_specials)
        .bind(prefs.event_created)
        .bind(prefs.event_updated)
        .bind(prefs.claim_decisions)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ============================================
    // Display names
    // ============================================

    pub async fn venue_name(&self, venue_id: Uuid) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT name
            FROM venues
            WHERE id = $1
            "#,
        )
        .bind(venue_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(name,)| name))
    }

    pub async fn event_title(&self, event_id: Uuid) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT title
            FROM venue_events
            WHERE id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(title,)| title))
    }

    // ============================================
    // Notifications
    // ============================================

    /// Insert a batch of notification records in one statement.
    ///
    /// Returns the number of rows written. An empty batch writes nothing.
    pub async fn insert_notifications(
        &self,
        notifications: &[NewNotification],
    ) -> Result<usize> {
        if notifications.is_empty() {
            return Ok(0);
        }

        let ids: Vec<Uuid> = notifications.iter().map(|_| Uuid::now_v7()).collect();
        let user_ids: Vec<Uuid> = notifications.iter().map(|n| n.user_id).collect();
        let types: Vec<String> = notifications
            .iter()
            .map(|n| n.category.as_str().to_string())
            .collect();
        let contents: Vec<String> = notifications.iter().map(|n| n.content.clone()).collect();
        let related_ids: Vec<Uuid> = notifications.iter().map(|n| n.related_entity_id).collect();
        let related_types: Vec<String> = notifications
            .iter()
            .map(|n| n.related_entity_type.as_str().to_string())
            .collect();

        let result = sqlx::query(
            r#"
            INSERT INTO notifications
                (id, user_id, type, content, related_entity_id, related_entity_type)
            SELECT * FROM UNNEST($1::uuid[], $2::uuid[], $3::text[], $4::text[], $5::uuid[], $6::text[])
            "#,
        )
        .bind(&ids)
        .bind(&user_ids)
        .bind(&types)
        .bind(&contents)
        .bind(&related_ids)
        .bind(&related_types)
        .execute(&self.pool)
        .await?;

        let written = result.rows_affected() as usize;
        tracing::debug!(written, "inserted notification batch");
        Ok(written)
    }

    /// A user's notification feed, newest first.
    pub async fn list_notifications_for_user(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<NotificationRow>> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT id, user_id, type, content, related_entity_id, related_entity_type,
                   read, created_at
            FROM notifications
            WHERE user_id = $1 AND (NOT $2 OR read = FALSE)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Mark one notification read. Returns false when the id is unknown.
    pub async fn mark_notification_read(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET read = TRUE
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM notifications
            WHERE user_id = $1 AND read = FALSE
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }
}
