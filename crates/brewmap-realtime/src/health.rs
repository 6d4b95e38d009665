// Periodic channel health check
//
// The multiplexer never repairs a live channel in place. When the
// transport reports a channel as disconnected or errored, the health check
// recreates it from scratch: full close, full reopen with the same table
// set.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::hub::RealtimeHub;

/// Spawn the periodic health check for a hub. The interval comes from the
/// hub's [`RealtimeConfig`](crate::hub::RealtimeConfig). Abort the returned
/// handle on shutdown.
pub fn spawn_health_check(hub: Arc<RealtimeHub>) -> JoinHandle<()> {
    let interval = hub.health_check_interval();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so a freshly started
        // hub is not churned before the transport settles.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            for channel in hub.unhealthy_channels().await {
                tracing::warn!(channel = %channel, "recreating unhealthy realtime channel");
                if let Err(err) = hub.recycle_channel(channel).await {
                    tracing::error!(
                        channel = %channel,
                        error = %err,
                        "failed to recreate realtime channel"
                    );
                }
            }
        }
    })
}
