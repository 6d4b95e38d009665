// Trigger handlers: change events in, fan-out calls out
//
// Each handler is a thin adapter from a ChangeEvent to the right engine
// call: extract the entity id, read the before/after fields that decide
// wording, and tolerate a missing `after` snapshot on deletes by reading
// display data from `before`. The wired tasks log and drop fan-out errors
// so a failed notification never disturbs dispatch.

use std::sync::Arc;
use tokio::task::JoinHandle;

use brewmap_core::{ChangeEvent, ChangeOp, EventCategory};
use brewmap_realtime::{RealtimeError, RealtimeHub, SubscriptionId};

use crate::engine::{EventChangeKind, FanoutReport, NotificationEngine, VenueUpdateKind};
use crate::error::{NotifyError, Result};

const KITCHEN_COLUMNS: [&str; 2] = ["kitchen_open_time", "kitchen_close_time"];

/// Venue hours row changed. Kitchen wording applies when an update touched
/// only the kitchen columns; inserts and deletes read as regular hours
/// changes.
pub async fn handle_venue_hours_change(
    engine: &NotificationEngine,
    event: &ChangeEvent,
) -> Result<FanoutReport> {
    let venue_id = event
        .uuid_field("venue_id")
        .ok_or_else(|| NotifyError::malformed("venue_hours", "venue_id"))?;
    let kind = if kitchen_columns_changed(event) {
        VenueUpdateKind::KitchenHours
    } else {
        VenueUpdateKind::Hours
    };
    let content = match kind {
        VenueUpdateKind::Hours => "updated their hours",
        VenueUpdateKind::KitchenHours => "updated their kitchen hours",
    };
    engine.notify_venue_update(venue_id, kind, content).await
}

fn kitchen_columns_changed(event: &ChangeEvent) -> bool {
    match (&event.before, &event.after) {
        (Some(before), Some(after)) => KITCHEN_COLUMNS
            .iter()
            .any(|column| before.get(*column) != after.get(*column)),
        _ => false,
    }
}

/// Happy hour row changed.
pub async fn handle_happy_hour_change(
    engine: &NotificationEngine,
    event: &ChangeEvent,
) -> Result<FanoutReport> {
    let venue_id = event
        .uuid_field("venue_id")
        .ok_or_else(|| NotifyError::malformed("happy_hours", "venue_id"))?;
    let content = match event.op {
        ChangeOp::Insert => "added a new happy hour",
        ChangeOp::Update => "updated their happy hour",
        ChangeOp::Delete => "removed a happy hour",
    };
    engine.notify_happy_hour_update(venue_id, content).await
}

/// Daily special row changed.
pub async fn handle_daily_special_change(
    engine: &NotificationEngine,
    event: &ChangeEvent,
) -> Result<FanoutReport> {
    let venue_id = event
        .uuid_field("venue_id")
        .ok_or_else(|| NotifyError::malformed("daily_specials", "venue_id"))?;
    let content = match event.op {
        ChangeOp::Insert => "added a new daily special",
        ChangeOp::Update => "updated their daily special",
        ChangeOp::Delete => "removed a daily special",
    };
    engine.notify_daily_special_update(venue_id, content).await
}

/// Venue event row changed. Inserts notify favoriters as a created event;
/// updates and deletes notify favoriters plus interested users.
pub async fn handle_venue_event_change(
    engine: &NotificationEngine,
    event: &ChangeEvent,
) -> Result<FanoutReport> {
    let event_id = event
        .uuid_field("id")
        .ok_or_else(|| NotifyError::malformed("venue_events", "id"))?;
    let venue_id = event
        .uuid_field("venue_id")
        .ok_or_else(|| NotifyError::malformed("venue_events", "venue_id"))?;
    let (kind, verb) = match event.op {
        ChangeOp::Insert => (EventChangeKind::Created, "added a new event"),
        ChangeOp::Update => (EventChangeKind::Updated, "updated an event"),
        ChangeOp::Delete => (EventChangeKind::Updated, "canceled an event"),
    };
    let content = match event.str_field("title") {
        Some(title) => format!("{verb}: {title}"),
        None => verb.to_string(),
    };
    engine
        .notify_event_update(event_id, venue_id, kind, &content)
        .await
}

/// Subscriptions and tasks created by [`spawn_change_handlers`].
pub struct ChangeHandlerSet {
    subscriptions: Vec<SubscriptionId>,
    tasks: Vec<JoinHandle<()>>,
}

impl ChangeHandlerSet {
    pub fn subscription_ids(&self) -> &[SubscriptionId] {
        &self.subscriptions
    }

    /// Unsubscribe everything and stop the handler tasks.
    pub async fn shutdown(self, hub: &RealtimeHub) {
        for id in self.subscriptions {
            hub.unsubscribe(id).await;
        }
        for task in self.tasks {
            task.abort();
        }
    }
}

/// Wire the change-event-driven triggers onto a hub.
///
/// One subscription and one consumer task per category. Claim decisions
/// have no change-stream wiring; the moderation flow calls
/// [`NotificationEngine::notify_claim_status_update`] directly after its
/// write.
pub async fn spawn_change_handlers(
    hub: &RealtimeHub,
    engine: Arc<NotificationEngine>,
) -> std::result::Result<ChangeHandlerSet, RealtimeError> {
    let mut subscriptions = Vec::new();
    let mut tasks = Vec::new();

    {
        let engine = Arc::clone(&engine);
        let mut sub = hub.subscribe(EventCategory::VenueHoursUpdated, None).await?;
        subscriptions.push(sub.id());
        tasks.push(tokio::spawn(async move {
            while let Some(event) = sub.recv().await {
                if let Err(err) = handle_venue_hours_change(&engine, &event).await {
                    tracing::warn!(error = %err, "venue hours fan-out failed");
                }
            }
        }));
    }

    {
        let engine = Arc::clone(&engine);
        let mut sub = hub.subscribe(EventCategory::HappyHourUpdated, None).await?;
        subscriptions.push(sub.id());
        tasks.push(tokio::spawn(async move {
            while let Some(event) = sub.recv().await {
                if let Err(err) = handle_happy_hour_change(&engine, &event).await {
                    tracing::warn!(error = %err, "happy hour fan-out failed");
                }
            }
        }));
    }

    {
        let engine = Arc::clone(&engine);
        let mut sub = hub
            .subscribe(EventCategory::DailySpecialUpdated, None)
            .await?;
        subscriptions.push(sub.id());
        tasks.push(tokio::spawn(async move {
            while let Some(event) = sub.recv().await {
                if let Err(err) = handle_daily_special_change(&engine, &event).await {
                    tracing::warn!(error = %err, "daily special fan-out failed");
                }
            }
        }));
    }

    {
        let engine = Arc::clone(&engine);
        let mut sub = hub
            .subscribe(EventCategory::VenueEventsUpdated, None)
            .await?;
        subscriptions.push(sub.id());
        tasks.push(tokio::spawn(async move {
            while let Some(event) = sub.recv().await {
                if let Err(err) = handle_venue_event_change(&engine, &event).await {
                    tracing::warn!(error = %err, "venue event fan-out failed");
                }
            }
        }));
    }

    Ok(ChangeHandlerSet {
        subscriptions,
        tasks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use brewmap_core::memory::{
        InMemoryDisplayNameStore, InMemoryNotificationStore, InMemoryPreferenceStore,
        InMemoryRelationshipStore,
    };
    use brewmap_core::{NotificationCategory, NotificationPrefs, Row};
    use serde_json::json;
    use uuid::Uuid;

    struct Fixture {
        engine: NotificationEngine,
        relationships: Arc<InMemoryRelationshipStore>,
        preferences: Arc<InMemoryPreferenceStore>,
        notifications: Arc<InMemoryNotificationStore>,
    }

    fn fixture() -> Fixture {
        let relationships = Arc::new(InMemoryRelationshipStore::new());
        let preferences = Arc::new(InMemoryPreferenceStore::new());
        let notifications = Arc::new(InMemoryNotificationStore::new());
        let engine = NotificationEngine::new(
            relationships.clone(),
            preferences.clone(),
            Arc::new(InMemoryDisplayNameStore::new()),
            notifications.clone(),
        );
        Fixture {
            engine,
            relationships,
            preferences,
            notifications,
        }
    }

    fn row(value: serde_json::Value) -> Row {
        value.as_object().cloned().expect("object")
    }

    #[tokio::test]
    async fn test_kitchen_column_update_uses_kitchen_category() {
        let fx = fixture();
        let venue = Uuid::now_v7();
        let user = Uuid::now_v7();
        fx.relationships.add_favorite(venue, user).await;
        fx.preferences
            .set(user, NotificationPrefs::all_enabled())
            .await;

        let event = ChangeEvent {
            category: EventCategory::VenueHoursUpdated,
            op: ChangeOp::Update,
            before: Some(row(json!({
                "venue_id": venue.to_string(),
                "open_time": "11:00",
                "kitchen_close_time": "21:00",
            }))),
            after: Some(row(json!({
                "venue_id": venue.to_string(),
                "open_time": "11:00",
                "kitchen_close_time": "22:00",
            }))),
        };

        handle_venue_hours_change(&fx.engine, &event).await.unwrap();

        let written = fx.notifications.written().await;
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].category, NotificationCategory::KitchenHoursUpdate);
        assert!(written[0].content.contains("kitchen hours"));
    }

    #[tokio::test]
    async fn test_regular_hours_update_uses_hours_category() {
        let fx = fixture();
        let venue = Uuid::now_v7();
        let user = Uuid::now_v7();
        fx.relationships.add_favorite(venue, user).await;
        fx.preferences
            .set(user, NotificationPrefs::all_enabled())
            .await;

        let event = ChangeEvent {
            category: EventCategory::VenueHoursUpdated,
            op: ChangeOp::Update,
            before: Some(row(json!({
                "venue_id": venue.to_string(),
                "open_time": "11:00",
                "kitchen_close_time": "21:00",
            }))),
            after: Some(row(json!({
                "venue_id": venue.to_string(),
                "open_time": "10:00",
                "kitchen_close_time": "21:00",
            }))),
        };

        handle_venue_hours_change(&fx.engine, &event).await.unwrap();

        let written = fx.notifications.written().await;
        assert_eq!(written[0].category, NotificationCategory::VenueHoursUpdate);
    }

    #[tokio::test]
    async fn test_happy_hour_delete_reads_before_snapshot() {
        let fx = fixture();
        let venue = Uuid::now_v7();
        let user = Uuid::now_v7();
        fx.relationships.add_favorite(venue, user).await;
        fx.preferences
            .set(user, NotificationPrefs::all_enabled())
            .await;

        let event = ChangeEvent {
            category: EventCategory::HappyHourUpdated,
            op: ChangeOp::Delete,
            before: Some(row(json!({"id": "hh1", "venue_id": venue.to_string()}))),
            after: None,
        };

        let report = handle_happy_hour_change(&fx.engine, &event).await.unwrap();
        assert_eq!(report.written, 1);

        let written = fx.notifications.written().await;
        assert!(written[0].content.contains("removed a happy hour"));
    }

    #[tokio::test]
    async fn test_event_insert_notifies_as_created() {
        let fx = fixture();
        let venue = Uuid::now_v7();
        let event_id = Uuid::now_v7();
        let user = Uuid::now_v7();
        fx.relationships.add_favorite(venue, user).await;
        fx.preferences
            .set(user, NotificationPrefs::all_enabled())
            .await;

        let event = ChangeEvent {
            category: EventCategory::VenueEventsUpdated,
            op: ChangeOp::Insert,
            before: None,
            after: Some(row(json!({
                "id": event_id.to_string(),
                "venue_id": venue.to_string(),
                "title": "Trivia Night",
            }))),
        };

        handle_venue_event_change(&fx.engine, &event).await.unwrap();

        let written = fx.notifications.written().await;
        assert_eq!(written[0].category, NotificationCategory::EventCreated);
        assert!(written[0].content.contains("added a new event: Trivia Night"));
        assert_eq!(written[0].related_entity_id, event_id);
    }

    #[tokio::test]
    async fn test_missing_entity_id_is_an_error() {
        let fx = fixture();
        let event = ChangeEvent {
            category: EventCategory::HappyHourUpdated,
            op: ChangeOp::Insert,
            before: None,
            after: Some(row(json!({"id": "hh1"}))),
        };

        let result = handle_happy_hour_change(&fx.engine, &event).await;
        assert!(matches!(
            result,
            Err(NotifyError::MalformedEvent { table: "happy_hours", .. })
        ));
    }
}
