// End-to-end: a change event on the transport flows through the
// multiplexer, a trigger handler, and the fan-out engine into a written
// notification record, gated by preferences.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use uuid::Uuid;

use brewmap_core::memory::{
    InMemoryDisplayNameStore, InMemoryNotificationStore, InMemoryPreferenceStore,
    InMemoryRelationshipStore,
};
use brewmap_core::{ChangeOp, NotificationCategory, NotificationPrefs, Row};
use brewmap_notify::{spawn_change_handlers, NotificationEngine};
use brewmap_realtime::{
    ChangeStreamTransport, InMemoryTransport, RawChange, RealtimeConfig, RealtimeHub,
};

fn row(value: serde_json::Value) -> Row {
    value.as_object().cloned().expect("object")
}

async fn wait_for_written(store: &InMemoryNotificationStore, count: usize) {
    for _ in 0..200 {
        if store.written().await.len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "expected {count} written notifications, got {}",
        store.written().await.len()
    );
}

#[tokio::test]
async fn test_transport_change_becomes_notification() {
    let transport = InMemoryTransport::new();
    let hub = RealtimeHub::new(
        Arc::new(transport.clone()) as Arc<dyn ChangeStreamTransport>,
        RealtimeConfig::default(),
    );

    let relationships = Arc::new(InMemoryRelationshipStore::new());
    let preferences = Arc::new(InMemoryPreferenceStore::new());
    let display_names = Arc::new(InMemoryDisplayNameStore::new());
    let notifications = Arc::new(InMemoryNotificationStore::new());
    let engine = Arc::new(NotificationEngine::new(
        relationships.clone(),
        preferences.clone(),
        display_names.clone(),
        notifications.clone(),
    ));

    let venue = Uuid::now_v7();
    let opted_in = Uuid::now_v7();
    let opted_out = Uuid::now_v7();
    relationships.add_favorite(venue, opted_in).await;
    relationships.add_favorite(venue, opted_out).await;
    preferences
        .set(
            opted_in,
            NotificationPrefs {
                happy_hours: true,
                ..Default::default()
            },
        )
        .await;
    preferences
        .set(opted_out, NotificationPrefs::default())
        .await;
    display_names.set_venue_name(venue, "Barrel & Sprocket").await;

    let handlers = spawn_change_handlers(&hub, engine).await.unwrap();
    // All four venue-area triggers share one physical channel.
    assert_eq!(transport.open_count(), 1);

    transport.emit(RawChange {
        table: "happy_hours".to_string(),
        op: ChangeOp::Insert,
        before: None,
        after: Some(row(json!({
            "id": Uuid::now_v7().to_string(),
            "venue_id": venue.to_string(),
        }))),
    });

    wait_for_written(&notifications, 1).await;
    let written = notifications.written().await;
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].user_id, opted_in);
    assert_eq!(written[0].category, NotificationCategory::HappyHoursUpdate);
    assert_eq!(
        written[0].content,
        "Barrel & Sprocket added a new happy hour"
    );

    handlers.shutdown(&hub).await;
    assert_eq!(transport.open_count(), 0);
    hub.shutdown().await;
}

#[tokio::test]
async fn test_event_delete_flows_with_before_snapshot_only() {
    let transport = InMemoryTransport::new();
    let hub = RealtimeHub::new(
        Arc::new(transport.clone()) as Arc<dyn ChangeStreamTransport>,
        RealtimeConfig::default(),
    );

    let relationships = Arc::new(InMemoryRelationshipStore::new());
    let preferences = Arc::new(InMemoryPreferenceStore::new());
    let notifications = Arc::new(InMemoryNotificationStore::new());
    let engine = Arc::new(NotificationEngine::new(
        relationships.clone(),
        preferences.clone(),
        Arc::new(InMemoryDisplayNameStore::new()),
        notifications.clone(),
    ));

    let venue = Uuid::now_v7();
    let event_id = Uuid::now_v7();
    let interested = Uuid::now_v7();
    relationships.add_interest(event_id, interested).await;
    preferences
        .set(
            interested,
            NotificationPrefs {
                event_updated: true,
                ..Default::default()
            },
        )
        .await;

    let handlers = spawn_change_handlers(&hub, engine).await.unwrap();

    transport.emit(RawChange {
        table: "venue_events".to_string(),
        op: ChangeOp::Delete,
        before: Some(row(json!({
            "id": event_id.to_string(),
            "venue_id": venue.to_string(),
            "title": "Vinyl Night",
        }))),
        after: None,
    });

    wait_for_written(&notifications, 1).await;
    let written = notifications.written().await;
    assert_eq!(written[0].user_id, interested);
    assert_eq!(written[0].category, NotificationCategory::EventUpdated);
    assert!(written[0].content.contains("canceled an event: Vinyl Night"));

    handlers.shutdown(&hub).await;
    hub.shutdown().await;
}
