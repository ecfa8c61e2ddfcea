//! Periodic eviction of expired cache entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::store::ResponseCache;

/// Background task that sweeps a [`ResponseCache`] on a fixed interval.
///
/// The task runs until [`CacheSweeper::stop`] is awaited or the sweeper is dropped.
pub struct CacheSweeper {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl CacheSweeper {
    pub fn start(cache: Arc<ResponseCache>, interval: Duration) -> Self {
        let (shutdown, mut stop) = oneshot::channel();
        let period = interval.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await; // first tick fires immediately
            loop {
                tokio::select! {
                    _ = &mut stop => break,
                    _ = ticker.tick() => {
                        let removed = cache.sweep_expired();
                        if removed > 0 {
                            debug!(
                                target = "fortview::cache",
                                removed,
                                remaining = cache.len(),
                                "Swept expired cache entries"
                            );
                        }
                    }
                }
            }
        });

        info!(
            target = "fortview::cache",
            interval_ms = period.as_millis() as u64,
            "Cache sweeper started"
        );
        Self {
            shutdown: Some(shutdown),
            handle,
        }
    }

    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Err(err) = (&mut self.handle).await {
            warn!(target = "fortview::cache", error = %err, "Cache sweeper ended abnormally");
        }
    }
}

impl Drop for CacheSweeper {
    fn drop(&mut self) {
        if self.shutdown.is_some() {
            self.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::cache::clock::ManualClock;

    #[tokio::test]
    async fn sweeper_evicts_expired_entries_until_stopped() {
        let clock = Arc::new(ManualClock::default());
        let cache = Arc::new(ResponseCache::new(clock.clone()));
        cache.set("stale", json!(1), 1);
        cache.set("fresh", json!(2), 3600);
        clock.advance(Duration::from_secs(5));

        let sweeper = CacheSweeper::start(cache.clone(), Duration::from_millis(10));
        for _ in 0..100 {
            if cache.len() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(cache.len(), 1);

        sweeper.stop().await;
        cache.set("late", json!(3), 1);
        clock.advance(Duration::from_secs(5));
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.len(), 2, "stopped sweeper no longer evicts");
    }
}
