//! Rate lifecycle orchestration: scheduled polling, online/offline branching,
//! cache fallback and the audit trail around every attempt.

use crate::cache::PersistentCache;
use crate::core::analytics::RateEvent;
use crate::core::connectivity::Connectivity;
use crate::core::network::RateSource;
use crate::feed::{RateFeed, RateOrigin, RateUpdate};
use crate::telemetry::EventLog;
use futures::Stream;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};
use tokio::time::{Instant, interval_at};
use tracing::{debug, info, warn};

pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(120);

/// Everything the repository needs, assembled once by the caller.
pub struct RateRepositoryDeps {
    pub source: Arc<dyn RateSource>,
    pub cache: PersistentCache,
    pub connectivity: Arc<dyn Connectivity>,
    pub events: EventLog,
    pub feed: RateFeed,
    pub interval: Duration,
}

struct Shared {
    source: Arc<dyn RateSource>,
    cache: PersistentCache,
    connectivity: Arc<dyn Connectivity>,
    events: EventLog,
    feed: RateFeed,
}

impl Shared {
    async fn refresh(&self) {
        if self.connectivity.is_connected() {
            self.events.record_event(&RateEvent::OnlineAttempt);
            match self.source.fetch_rate().await {
                Ok(rate) => {
                    self.events.record_event(&RateEvent::OnlineSuccess);
                    self.cache.put_rate(&rate);
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "Online rate fetch failed, falling back to cache");
                    self.events.record_event(&RateEvent::OnlineFailure {
                        error: e.to_string(),
                    });
                }
            }
        } else {
            debug!("Offline, using cached rate");
        }
        self.use_cached_rate();
    }

    fn use_cached_rate(&self) {
        match self.cache.latest_rate() {
            Some(rate) => {
                self.events.record_event(&RateEvent::OfflineSuccess {
                    cached_date: rate.observed_at(),
                });
                self.feed.publish(RateUpdate {
                    value: rate.value(),
                    origin: RateOrigin::Cached,
                    observed_at: rate.observed_at(),
                });
            }
            None => {
                info!("No cached rate available");
                self.events.record_event(&RateEvent::OfflineFailure);
            }
        }
    }
}

/// A running poll schedule. Dropping it ends the timer task.
struct PollTimer {
    cancelled: Arc<AtomicBool>,
    _stop: oneshot::Sender<()>,
}

impl PollTimer {
    fn cancel(self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

/// Owns the polling schedule for the BTC/USD rate.
///
/// States: idle until `start`, polling until `stop`. Refreshes are not serialised:
/// a forced update racing a scheduled tick runs concurrently.
pub struct RateRepository {
    shared: Arc<Shared>,
    interval: Duration,
    timer: Mutex<Option<PollTimer>>,
}

impl RateRepository {
    pub fn new(deps: RateRepositoryDeps) -> Self {
        Self {
            shared: Arc::new(Shared {
                source: deps.source,
                cache: deps.cache,
                connectivity: deps.connectivity,
                events: deps.events,
                feed: deps.feed,
            }),
            interval: deps.interval,
            timer: Mutex::new(None),
        }
    }

    fn timer(&self) -> MutexGuard<'_, Option<PollTimer>> {
        // the guarded value is a plain Option, valid even after a panic
        self.timer.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// (Re)starts polling: refreshes immediately, then every interval.
    ///
    /// Calling it while already polling resets the schedule.
    pub async fn start(&self) {
        self.stop();

        self.shared
            .events
            .record_event(&RateEvent::PeriodicUpdatesStarted {
                interval: self.interval,
            });
        self.arm_timer();
        info!(interval = ?self.interval, "Periodic rate updates started");

        self.shared.refresh().await;
    }

    fn arm_timer(&self) {
        let cancelled = Arc::new(AtomicBool::new(false));
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let state: Weak<Shared> = Arc::downgrade(&self.shared);
        let flag = Arc::clone(&cancelled);
        let period = self.interval;

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    // resolves on drop of the sender as well
                    _ = &mut stop_rx => break,
                }
                if flag.load(Ordering::SeqCst) {
                    break;
                }
                let Some(shared) = state.upgrade() else {
                    break;
                };
                debug!("Scheduled rate refresh");
                shared.refresh().await;
            }
            debug!("Rate poll timer finished");
        });

        let previous = self.timer().replace(PollTimer {
            cancelled,
            _stop: stop_tx,
        });
        if let Some(previous) = previous {
            previous.cancel();
        }
    }

    /// Stops polling. A no-op without an active schedule.
    pub fn stop(&self) {
        let active = self.timer().take();
        if let Some(timer) = active {
            self.shared
                .events
                .record_event(&RateEvent::PeriodicUpdatesStopped);
            timer.cancel();
            info!("Periodic rate updates stopped");
        }
    }

    /// Refreshes once, outside the schedule.
    pub async fn force_update(&self) {
        self.shared.events.record_event(&RateEvent::ForceUpdate);
        self.shared.refresh().await;
    }

    /// Refreshes from the internet when reachable, otherwise (or on failure) from the cache.
    pub async fn refresh(&self) {
        self.shared.refresh().await;
    }

    pub fn is_polling(&self) -> bool {
        self.timer().is_some()
    }

    /// Latest persisted rate.
    pub fn current_rate(&self) -> Option<Decimal> {
        self.shared.cache.latest_rate().map(|rate| rate.value())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RateUpdate> {
        self.shared.feed.subscribe()
    }

    pub fn updates(&self) -> impl Stream<Item = RateUpdate> + use<> {
        self.shared.feed.stream()
    }

    pub fn events(&self) -> &EventLog {
        &self.shared.events
    }
}

impl Drop for RateRepository {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tests::BrokenStore;
    use crate::connectivity::ManualConnectivity;
    use crate::core::analytics::*;
    use crate::core::models::Rate;
    use crate::core::network::NetworkError;
    use crate::store::memory::MemoryStore;
    use async_trait::async_trait;
    use broadcast::error::TryRecvError;
    use rust_decimal_macros::dec;
    use std::sync::atomic::AtomicUsize;

    /// Publishes on success the way the real fetcher does.
    struct MockSource {
        result: Mutex<Result<Decimal, NetworkError>>,
        calls: AtomicUsize,
        feed: RateFeed,
    }

    impl MockSource {
        fn new(result: Result<Decimal, NetworkError>, feed: RateFeed) -> Arc<Self> {
            Arc::new(Self {
                result: Mutex::new(result),
                calls: AtomicUsize::new(0),
                feed,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RateSource for MockSource {
        async fn fetch_rate(&self) -> Result<Rate, NetworkError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let value = self.result.lock().unwrap().clone()?;
            let rate = Rate::new(value).unwrap();
            self.feed.publish(RateUpdate {
                value: rate.value(),
                origin: RateOrigin::Internet,
                observed_at: rate.observed_at(),
            });
            Ok(rate)
        }
    }

    struct Fixture {
        repository: RateRepository,
        source: Arc<MockSource>,
        connectivity: ManualConnectivity,
        cache: PersistentCache,
        events: EventLog,
        updates: broadcast::Receiver<RateUpdate>,
    }

    fn fixture(result: Result<Decimal, NetworkError>, online: bool) -> Fixture {
        let events = EventLog::default();
        let feed = RateFeed::new();
        let updates = feed.subscribe();
        let source = MockSource::new(result, feed.clone());
        let connectivity = ManualConnectivity::new(online);
        let cache = PersistentCache::new(Arc::new(MemoryStore::new()), events.clone());
        let repository = RateRepository::new(RateRepositoryDeps {
            source: source.clone(),
            cache: cache.clone(),
            connectivity: Arc::new(connectivity.clone()),
            events: events.clone(),
            feed,
            interval: DEFAULT_UPDATE_INTERVAL,
        });
        Fixture {
            repository,
            source,
            connectivity,
            cache,
            events,
            updates,
        }
    }

    fn count(events: &EventLog, name: &str) -> usize {
        events.query(&EventQuery::named(name)).len()
    }

    #[tokio::test]
    async fn test_online_success_notifies_and_caches() {
        let mut f = fixture(Ok(dec!(50000.5)), true);

        f.repository.refresh().await;

        let update = f.updates.try_recv().unwrap();
        assert_eq!(update.value, dec!(50000.5));
        assert_eq!(update.origin, RateOrigin::Internet);
        assert_eq!(f.updates.try_recv(), Err(TryRecvError::Empty));

        assert_eq!(count(&f.events, ONLINE_ATTEMPT), 1);
        let success = f.events.query(&EventQuery::named(ONLINE_SUCCESS));
        assert_eq!(success.len(), 1);
        assert_eq!(success[0].parameters["source"], "internet");
        assert_eq!(count(&f.events, OFFLINE_SUCCESS), 0);

        assert_eq!(f.repository.current_rate(), Some(dec!(50000.5)));
    }

    #[tokio::test]
    async fn test_cached_rate_matches_published_update() {
        let mut f = fixture(Ok(dec!(64000)), true);

        f.repository.refresh().await;

        let update = f.updates.try_recv().unwrap();
        let stored = f.cache.rates();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].value(), update.value);
        assert_eq!(stored[0].observed_at(), update.observed_at);
    }

    #[tokio::test]
    async fn test_server_error_falls_back_to_cached_rate() {
        let mut f = fixture(Err(NetworkError::Server(500)), true);
        let cached = Rate::new(dec!(42000)).unwrap();
        f.cache.put_rate(&cached);

        f.repository.refresh().await;

        let failure = f.events.query(&EventQuery::named(ONLINE_FAILURE));
        assert_eq!(failure.len(), 1);
        assert!(failure[0].parameters["error"].contains("500"));
        assert_eq!(failure[0].parameters["source"], "internet");

        let success = f.events.query(&EventQuery::named(OFFLINE_SUCCESS));
        assert_eq!(success.len(), 1);
        assert_eq!(success[0].parameters["source"], "cached");
        assert_eq!(
            success[0].parameters["cached_date"],
            epoch_seconds(cached.observed_at())
        );
        assert_eq!(count(&f.events, OFFLINE_FAILURE), 0);

        let update = f.updates.try_recv().unwrap();
        assert_eq!(update.value, dec!(42000));
        assert_eq!(update.origin, RateOrigin::Cached);
        assert_eq!(f.updates.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn test_fetch_failure_without_cache() {
        let mut f = fixture(Err(NetworkError::Network("timed out".into())), true);

        f.repository.refresh().await;

        assert_eq!(count(&f.events, ONLINE_FAILURE), 1);
        assert_eq!(count(&f.events, OFFLINE_SUCCESS), 0);
        let failure = f.events.query(&EventQuery::named(OFFLINE_FAILURE));
        assert_eq!(failure.len(), 1);
        assert_eq!(failure[0].parameters["error"], "no_cached_rate_available");
        assert_eq!(f.updates.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn test_offline_without_cache_on_start() {
        let mut f = fixture(Ok(dec!(1)), false);

        f.repository.start().await;

        assert_eq!(f.source.calls(), 0);
        assert_eq!(count(&f.events, ONLINE_ATTEMPT), 0);
        assert_eq!(count(&f.events, OFFLINE_FAILURE), 1);
        assert_eq!(f.updates.try_recv(), Err(TryRecvError::Empty));
        f.repository.stop();
    }

    #[tokio::test]
    async fn test_offline_uses_cache_without_fetching() {
        let mut f = fixture(Ok(dec!(1)), false);
        f.cache.put_rate(&Rate::new(dec!(61000)).unwrap());

        f.repository.refresh().await;

        assert_eq!(f.source.calls(), 0);
        assert_eq!(f.updates.try_recv().unwrap().value, dec!(61000));
        assert_eq!(count(&f.events, OFFLINE_SUCCESS), 1);

        f.connectivity.set_connected(true);
        f.repository.refresh().await;
        assert_eq!(f.source.calls(), 1);
    }

    #[tokio::test]
    async fn test_stop_without_start_is_silent() {
        let f = fixture(Ok(dec!(1)), true);

        f.repository.stop();
        f.repository.stop();

        assert_eq!(f.events.event_count(), 0);
        assert!(!f.repository.is_polling());
    }

    #[tokio::test]
    async fn test_stop_after_start_records_once() {
        let f = fixture(Ok(dec!(1)), true);

        f.repository.start().await;
        assert!(f.repository.is_polling());
        f.repository.stop();
        f.repository.stop();
        f.repository.stop();

        assert_eq!(count(&f.events, PERIODIC_UPDATES_STOPPED), 1);
        assert!(!f.repository.is_polling());
    }

    #[tokio::test]
    async fn test_restart_resets_schedule() {
        let f = fixture(Ok(dec!(1)), true);

        f.repository.start().await;
        f.repository.start().await;

        let started = f.events.query(&EventQuery::named(PERIODIC_UPDATES_STARTED));
        assert_eq!(started.len(), 2);
        assert_eq!(started[0].parameters["interval_seconds"], "120.0");
        assert_eq!(count(&f.events, PERIODIC_UPDATES_STOPPED), 1);
        assert_eq!(f.source.calls(), 2);
        assert!(f.repository.is_polling());
    }

    #[tokio::test]
    async fn test_force_update() {
        let f = fixture(Ok(dec!(3)), true);

        f.repository.force_update().await;

        let names: Vec<_> = f
            .events
            .events()
            .into_iter()
            .rev()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec![FORCE_UPDATE, ONLINE_ATTEMPT, ONLINE_SUCCESS]);
        assert!(!f.repository.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_ticks_until_stopped() {
        let f = fixture(Ok(dec!(1)), true);

        f.repository.start().await;
        assert_eq!(f.source.calls(), 1);

        tokio::time::sleep(Duration::from_secs(121)).await;
        assert_eq!(f.source.calls(), 2);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(f.source.calls(), 3);

        f.repository.stop();
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(f.source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_timer() {
        let f = fixture(Ok(dec!(1)), true);
        let source = f.source.clone();
        let events = f.events.clone();

        f.repository.start().await;
        drop(f);

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(source.calls(), 1);
        assert_eq!(count(&events, PERIODIC_UPDATES_STOPPED), 1);
    }

    #[tokio::test]
    async fn test_multiple_listeners() {
        let f = fixture(Ok(dec!(7)), true);
        let mut second = f.repository.subscribe();

        f.repository.refresh().await;

        assert_eq!(second.recv().await.unwrap().value, dec!(7));
    }

    #[tokio::test]
    async fn test_storage_failure_is_absorbed() {
        let events = EventLog::default();
        let feed = RateFeed::new();
        let mut updates = feed.subscribe();
        let repository = RateRepository::new(RateRepositoryDeps {
            source: MockSource::new(Err(NetworkError::Unknown), feed.clone()),
            cache: PersistentCache::new(Arc::new(BrokenStore), events.clone()),
            connectivity: Arc::new(ManualConnectivity::new(true)),
            events: events.clone(),
            feed,
            interval: DEFAULT_UPDATE_INTERVAL,
        });

        repository.refresh().await;

        assert_eq!(count(&events, STORAGE_ERROR), 1);
        assert_eq!(count(&events, OFFLINE_FAILURE), 1);
        assert_eq!(updates.try_recv(), Err(TryRecvError::Empty));
    }
}
