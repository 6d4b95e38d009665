// Hub lifecycle tests: lazy channel open, sibling-table attachment,
// recompute-based teardown, filter routing, and health-check recreation,
// all against the in-memory transport.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::time::timeout;

use brewmap_core::{ChangeOp, EventCategory, EventFilter, FilterKey, Row};
use brewmap_realtime::{
    spawn_health_check, ChangeStreamTransport, ChannelStatus, InMemoryTransport, RawChange,
    RealtimeConfig, RealtimeHub,
};

fn hub_with_transport() -> (Arc<RealtimeHub>, InMemoryTransport) {
    let transport = InMemoryTransport::new();
    let hub = RealtimeHub::new(
        Arc::new(transport.clone()) as Arc<dyn ChangeStreamTransport>,
        RealtimeConfig::default(),
    );
    (hub, transport)
}

fn hours_change(venue_id: &str) -> RawChange {
    let row: Row = json!({"id": "h1", "venue_id": venue_id})
        .as_object()
        .cloned()
        .unwrap();
    RawChange {
        table: "venue_hours".to_string(),
        op: ChangeOp::Update,
        before: None,
        after: Some(row),
    }
}

#[tokio::test]
async fn test_channel_opens_lazily_on_first_subscriber() {
    let (hub, transport) = hub_with_transport();
    assert_eq!(transport.open_count(), 0);

    let sub = hub
        .subscribe(EventCategory::VenueHoursUpdated, None)
        .await
        .unwrap();
    assert_eq!(transport.open_channels(), vec!["venue-changes".to_string()]);

    // Every sibling category's table is attached up front, so a future
    // subscriber to e.g. happy hours needs no reopen.
    assert_eq!(
        transport.tables_watched("venue-changes"),
        vec![
            "checkins",
            "daily_specials",
            "happy_hours",
            "venue_events",
            "venue_hours",
            "venues",
        ]
    );

    hub.unsubscribe(sub.id()).await;
    assert_eq!(transport.open_count(), 0);
}

#[tokio::test]
async fn test_sibling_category_reuses_channel() {
    let (hub, transport) = hub_with_transport();

    let hours = hub
        .subscribe(EventCategory::VenueHoursUpdated, None)
        .await
        .unwrap();
    let happy = hub
        .subscribe(EventCategory::HappyHourUpdated, None)
        .await
        .unwrap();
    assert_eq!(transport.opened_total(), 1);
    assert_eq!(transport.open_count(), 1);

    // The channel survives while any sibling subscription remains.
    hub.unsubscribe(hours.id()).await;
    assert_eq!(transport.open_count(), 1);

    hub.unsubscribe(happy.id()).await;
    assert_eq!(transport.open_count(), 0);
}

#[tokio::test]
async fn test_n_subscribes_n_unsubscribes_closes_channel() {
    let (hub, transport) = hub_with_transport();

    let mut ids = Vec::new();
    for _ in 0..5 {
        let sub = hub
            .subscribe(EventCategory::VenueEventsUpdated, None)
            .await
            .unwrap();
        ids.push(sub.id());
    }
    assert_eq!(transport.opened_total(), 1);

    // Remove out of order; the teardown check recomputes from the live
    // set, so ordering must not matter.
    ids.swap(0, 3);
    ids.swap(1, 4);
    for id in &ids[..4] {
        hub.unsubscribe(*id).await;
        assert_eq!(transport.open_count(), 1, "channel closed too early");
    }
    hub.unsubscribe(ids[4]).await;
    assert_eq!(transport.open_count(), 0);
}

#[tokio::test]
async fn test_two_subscribes_one_unsubscribe_scenario() {
    let (hub, transport) = hub_with_transport();

    let (first, second) = tokio::join!(
        hub.subscribe(EventCategory::VenueEventsUpdated, None),
        hub.subscribe(EventCategory::VenueEventsUpdated, None),
    );
    let first = first.unwrap();
    let second = second.unwrap();

    hub.unsubscribe(first.id()).await;

    assert_eq!(
        hub.subscription_count_for(EventCategory::VenueEventsUpdated),
        1
    );
    assert_eq!(transport.open_count(), 1);
    drop(second);
}

#[tokio::test]
async fn test_unsubscribe_twice_is_noop() {
    let (hub, transport) = hub_with_transport();
    let sub = hub
        .subscribe(EventCategory::BreweryUpdated, None)
        .await
        .unwrap();

    hub.unsubscribe(sub.id()).await;
    hub.unsubscribe(sub.id()).await;
    assert_eq!(hub.subscription_count(), 0);
    assert_eq!(transport.open_count(), 0);
}

#[tokio::test]
async fn test_events_routed_to_matching_subscriber() {
    let (hub, transport) = hub_with_transport();

    let mut filtered = hub
        .subscribe(
            EventCategory::VenueHoursUpdated,
            Some(EventFilter::new().eq(FilterKey::VenueId, "v1")),
        )
        .await
        .unwrap();
    let mut other_venue = hub
        .subscribe(
            EventCategory::VenueHoursUpdated,
            Some(EventFilter::new().eq(FilterKey::VenueId, "v2")),
        )
        .await
        .unwrap();

    transport.emit(hours_change("v1"));

    let event = timeout(Duration::from_secs(1), filtered.recv())
        .await
        .expect("event delivery timed out")
        .expect("hub gone");
    assert_eq!(event.category, EventCategory::VenueHoursUpdated);
    assert_eq!(event.str_field("venue_id"), Some("v1"));

    // The v2 subscriber saw nothing.
    assert!(other_venue.try_recv().is_none());

    let metrics = hub.metrics();
    assert_eq!(metrics.events_dispatched, 1);
}

#[tokio::test]
async fn test_unrelated_table_event_ignored() {
    let (hub, transport) = hub_with_transport();
    let mut sub = hub
        .subscribe(EventCategory::VenueHoursUpdated, None)
        .await
        .unwrap();

    transport.emit(RawChange {
        table: "venues".to_string(),
        op: ChangeOp::Update,
        before: None,
        after: json!({"id": "v1"}).as_object().cloned(),
    });
    transport.emit(hours_change("v1"));

    // Only the venue_hours event arrives.
    let event = timeout(Duration::from_secs(1), sub.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.category, EventCategory::VenueHoursUpdated);
    assert!(sub.try_recv().is_none());
}

#[tokio::test]
async fn test_open_failure_rolls_back_subscription() {
    let (hub, transport) = hub_with_transport();
    transport.set_fail_open(true);

    let result = hub.subscribe(EventCategory::VenueUpdated, None).await;
    assert!(result.is_err());
    assert_eq!(hub.subscription_count(), 0);
    assert_eq!(transport.open_count(), 0);

    // A later attempt succeeds once the transport recovers; no retry
    // happened in between.
    transport.set_fail_open(false);
    let sub = hub.subscribe(EventCategory::VenueUpdated, None).await;
    assert!(sub.is_ok());
    assert_eq!(transport.opened_total(), 1);
}

#[tokio::test]
async fn test_activate_failure_rolls_back_and_closes() {
    let (hub, transport) = hub_with_transport();
    transport.set_fail_activate(true);

    let result = hub.subscribe(EventCategory::VenueUpdated, None).await;
    assert!(result.is_err());
    assert_eq!(hub.subscription_count(), 0);
    // The reserved channel was released.
    assert_eq!(transport.open_count(), 0);
}

#[tokio::test]
async fn test_recycle_channel_reopens_for_live_subscribers() {
    let (hub, transport) = hub_with_transport();
    let _sub = hub
        .subscribe(EventCategory::VenueHoursUpdated, None)
        .await
        .unwrap();
    assert_eq!(transport.opened_total(), 1);

    hub.recycle_channel(brewmap_core::ChannelName::Venue)
        .await
        .unwrap();
    assert_eq!(transport.opened_total(), 2);
    assert_eq!(transport.closed_total(), 1);
    assert_eq!(transport.open_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_health_check_recreates_disconnected_channel() {
    let transport = InMemoryTransport::new();
    let hub = RealtimeHub::new(
        Arc::new(transport.clone()) as Arc<dyn ChangeStreamTransport>,
        RealtimeConfig {
            channel_prefix: None,
            health_check_interval: Duration::from_secs(5),
        },
    );
    let _sub = hub
        .subscribe(EventCategory::VenueHoursUpdated, None)
        .await
        .unwrap();

    let health = spawn_health_check(Arc::clone(&hub));
    transport.set_status("venue-changes", ChannelStatus::Disconnected);

    // Give the health check two intervals to notice and recreate.
    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(transport.opened_total(), 2);
    assert_eq!(transport.open_count(), 1);

    health.abort();
    hub.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_closes_everything() {
    let (hub, transport) = hub_with_transport();
    let _venue = hub
        .subscribe(EventCategory::VenueUpdated, None)
        .await
        .unwrap();
    let _brewery = hub
        .subscribe(EventCategory::BreweryClaimsUpdated, None)
        .await
        .unwrap();
    assert_eq!(transport.open_count(), 2);

    hub.shutdown().await;
    assert_eq!(transport.open_count(), 0);
}
