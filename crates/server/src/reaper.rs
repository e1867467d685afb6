use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::info;

use atende_core::config::SessionConfig;
use atende_core::SessionStore;

/// Background task that evicts idle sessions on a fixed cadence. In-flight
/// sessions are skipped by the sweep and picked up on a later pass.
pub fn spawn(store: Arc<SessionStore>, config: &SessionConfig) -> tokio::task::JoinHandle<()> {
    let idle_ttl = ChronoDuration::seconds(config.idle_ttl_secs as i64);
    let sweep_interval = Duration::from_secs(config.sweep_interval_secs);

    tokio::spawn(async move {
        let mut ticker = interval(sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick fires immediately; skip it so a fresh boot does
        // not log an empty sweep.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let removed = store.sweep(idle_ttl);
            if removed > 0 {
                info!(
                    event_name = "session.sweep_completed",
                    removed,
                    remaining = store.len(),
                    "idle sessions evicted"
                );
            }
        }
    })
}
