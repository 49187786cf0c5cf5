//! Background expiry sweeper for the queue store
//!
//! Passive expiry: every entry is evicted at or shortly after its expiry,
//! independent of any read. Eviction lag is bounded by the sweep interval,
//! which is why every read path must still tolerate expired-but-unswept
//! entries.

use crate::metrics::MetricsCollector;
use crate::queue::store::QueueStore;
use crate::utils::current_timestamp;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Periodic task evicting expired entries from the queue store
pub struct QueueSweeper {
    store: Arc<dyn QueueStore>,
    interval: Duration,
    metrics: Arc<MetricsCollector>,
    shutdown_tx: broadcast::Sender<()>,
}

impl QueueSweeper {
    pub fn new(
        store: Arc<dyn QueueStore>,
        interval: Duration,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            store,
            interval,
            metrics,
            shutdown_tx,
        }
    }

    /// Spawn the sweep loop. The returned handle completes after `stop`.
    pub fn spawn(&self) -> JoinHandle<()> {
        let store = self.store.clone();
        let metrics = self.metrics.clone();
        let interval = self.interval;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so a fresh start
            // does not race service initialization.
            ticker.tick().await;

            info!("Queue sweeper started (interval: {:?})", interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match store.remove_expired(current_timestamp()).await {
                            Ok(0) => debug!("Sweep pass: no expired entries"),
                            Ok(removed) => {
                                info!("Sweep pass evicted {} expired entries", removed);
                                metrics.queue().entries_expired_total.inc_by(removed as u64);
                            }
                            Err(e) => warn!("Sweep pass failed: {}", e),
                        }

                        if let Ok(depth) = store.waiting_count().await {
                            metrics.queue().queue_depth.set(depth as i64);
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Queue sweeper shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Signal the sweep loop to stop
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::store::InMemoryQueueStore;
    use crate::types::{Complexity, QueueEntry};
    use chrono::Duration as ChronoDuration;

    #[tokio::test]
    async fn test_sweeper_evicts_expired_entries() {
        let store = Arc::new(InMemoryQueueStore::new());
        let metrics = Arc::new(MetricsCollector::new().unwrap());

        let now = current_timestamp();
        store
            .insert(QueueEntry {
                user_id: "1".to_string(),
                complexity: Complexity::Easy,
                categories: vec!["Array".to_string()],
                language: "python3".to_string(),
                enqueued_at: now,
                expires_at: now + ChronoDuration::milliseconds(50),
            })
            .await
            .unwrap();

        let sweeper = QueueSweeper::new(store.clone(), Duration::from_millis(20), metrics.clone());
        let handle = sweeper.spawn();

        tokio::time::sleep(Duration::from_millis(150)).await;
        sweeper.stop();
        handle.await.unwrap();

        assert_eq!(store.waiting_count().await.unwrap(), 0);
        assert_eq!(metrics.queue().entries_expired_total.get(), 1);
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_signal() {
        let store = Arc::new(InMemoryQueueStore::new());
        let metrics = Arc::new(MetricsCollector::new().unwrap());
        let sweeper = QueueSweeper::new(store, Duration::from_secs(60), metrics);

        let handle = sweeper.spawn();
        sweeper.stop();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }
}
