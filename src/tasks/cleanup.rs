//! Expiry Sweep Task
//!
//! Reads already drop expired entries lazily; the sweep also frees entries
//! that are never read again.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::cache::CacheManager;
use crate::config::Config;

/// Spawns a task that removes expired entries every `period`.
///
/// The returned handle is aborted on shutdown.
pub fn spawn_cleanup_task(cache: Arc<CacheManager>, period: Duration) -> JoinHandle<()> {
    let store = cache.store();

    tokio::spawn(async move {
        info!("Starting expiry sweep every {:?}", period);

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let removed = store.write().await.cleanup_expired();
            if removed > 0 {
                info!("Expiry sweep removed {} entries", removed);
            } else {
                debug!("Expiry sweep found nothing to remove");
            }
        }
    })
}

/// Starts the sweep at the configured interval, or not at all when the
/// interval is zero.
pub fn spawn_from_config(cache: Arc<CacheManager>, config: &Config) -> Option<JoinHandle<()>> {
    if config.cleanup_interval == 0 {
        info!("Expiry sweep disabled");
        return None;
    }
    Some(spawn_cleanup_task(
        cache,
        Duration::from_secs(config.cleanup_interval),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sweep_removes_expired_entries() {
        let cache = Arc::new(CacheManager::default());
        cache.set("expire_now", &"value", Some(0)).await;
        cache.set("long_lived", &"value", Some(3600)).await;

        let handle = spawn_cleanup_task(cache.clone(), Duration::from_millis(50));
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.abort();

        let store = cache.store();
        let store = store.read().await;
        assert_eq!(store.len(), 1);
        assert_eq!(store.stats().expired, 1);
        assert!(store.entry("long_lived").is_some());
    }

    #[tokio::test]
    async fn test_zero_interval_disables_sweep() {
        let config = Config {
            cleanup_interval: 0,
            ..Config::default()
        };

        assert!(spawn_from_config(Arc::new(CacheManager::default()), &config).is_none());
    }

    #[tokio::test]
    async fn test_sweep_can_be_aborted() {
        let handle = spawn_cleanup_task(Arc::new(CacheManager::default()), Duration::from_secs(1));

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
