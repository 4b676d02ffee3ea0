//! Periodic eviction of idle cache entries.

use crate::Provider;
use std::{sync::Arc, time::Duration};
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Spawn a task purging cached matches and entities idle for longer than
/// `max_idle`, once every `interval`.
///
/// The task runs until `cancel` is cancelled. Purging takes the same locks
/// as lookups, so it runs alongside matches in progress without blocking
/// them for longer than a list splice.
pub fn spawn_cache_maintenance(
    provider: Arc<Provider>,
    interval: Duration,
    max_idle: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    tracing::debug!("cache maintenance: cancelled");
                    break;
                }

                _ = ticker.tick() => {
                    let purged = provider.purge_idle(max_idle);
                    let entities = provider.data_set().cache_stats();
                    match provider.cache_stats() {
                        Some(matches) => tracing::debug!(
                            "cache maintenance: purged {purged} idle entries; \
                             matches: {matches:?}; entities: {entities:?}"
                        ),
                        None => tracing::debug!(
                            "cache maintenance: purged {purged} idle entries; entities: {entities:?}"
                        ),
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ProviderConfig,
        test_data::{self, ANDROID},
    };

    #[tokio::test]
    async fn purges_idle_matches_until_cancelled() {
        let provider = Arc::new(test_data::provider(ProviderConfig::default()));
        provider.match_str(ANDROID).unwrap();

        let cancel = CancellationToken::new();
        let handle = spawn_cache_maintenance(
            provider.clone(),
            Duration::from_millis(5),
            Duration::ZERO,
            cancel.clone(),
        );
        tokio::time::sleep(Duration::from_millis(50)).await;

        // the cached match got purged, so this is a second miss
        provider.match_str(ANDROID).unwrap();
        assert_eq!(provider.cache_stats().unwrap().misses, 2);

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn stops_when_cancelled_before_first_tick() {
        let provider = Arc::new(test_data::provider(ProviderConfig::default()));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let handle = spawn_cache_maintenance(
            provider,
            Duration::from_secs(3600),
            Duration::from_secs(60),
            cancel,
        );
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
