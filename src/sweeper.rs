use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::engine::Engine;

/// Background task that re-scans waitlists and promotes entries whose slot
/// is currently free. This recovers the promotion a crash can lose between
/// a cancellation's status flip and its `promote_next` call — the cancel
/// itself is never rolled back.
pub async fn run_sweeper(engine: Arc<Engine>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        for key in engine.promotable_slots() {
            let window = key.window();
            if !engine.court_available(key.court_id, &window, None).await {
                continue;
            }
            match engine.promote_next(key.court_id, &window).await {
                Ok(Some(entry)) => info!("sweeper promoted waitlist entry {}", entry.id),
                Ok(None) => {}
                Err(e) => debug!("sweeper skip {}: {e}", window),
            }
        }
    }
}

/// Background task that compacts the WAL once enough appends accumulate.
pub async fn run_compactor(engine: Arc<Engine>, threshold: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    loop {
        interval.tick().await;
        let appends = engine.wal_appends_since_compact().await;
        if appends < threshold {
            continue;
        }
        match engine.compact_wal().await {
            Ok(()) => info!("compacted WAL after {appends} appends"),
            Err(e) => debug!("compaction skipped: {e}"),
        }
    }
}
