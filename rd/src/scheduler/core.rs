//! Scheduler implementation

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use eyre::Result;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use keywordstore::{KeywordStore, TrackedKeyword};

use crate::extract;
use crate::fetcher::PageFetcher;

use super::config::{MIN_INTERVAL_MS, SchedulerConfig};
use super::rotation::{Rotation, SchedulerState};

/// Internal state protected by mutex.
///
/// The timer handle doubles as the state machine: `Some` = Running,
/// `None` = Stopped. There is never more than one timer task because every
/// transition takes the old handle out and aborts it before arming a new one.
struct SchedulerInner {
    interval: Duration,
    rotation: Rotation,
    timer: Option<JoinHandle<()>>,
}

/// Drives repeated rank checks: one keyword per tick, round-robin over the
/// rotation, at most one check in flight.
///
/// Control operations (`start`, `stop`, `set_interval`, `refresh`, `state`,
/// `queue`) are synchronous and touch only the config and rotation snapshot
/// under a mutex that is never held across an await, so they are safe to
/// call from any task while a check is executing.
pub struct Scheduler {
    store: Arc<KeywordStore>,
    fetcher: Arc<dyn PageFetcher>,
    inner: Arc<Mutex<SchedulerInner>>,
}

impl Scheduler {
    pub fn new(store: Arc<KeywordStore>, fetcher: Arc<dyn PageFetcher>, config: SchedulerConfig) -> Self {
        Self {
            store,
            fetcher,
            inner: Arc::new(Mutex::new(SchedulerInner {
                interval: config.interval(),
                rotation: Rotation::default(),
                timer: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerInner> {
        self.inner.lock().expect("scheduler mutex poisoned")
    }

    /// Start ticking. No-op when already running.
    ///
    /// Without an explicit interval the previously configured one applies.
    /// The first check runs immediately - operators expect feedback on start
    /// rather than a full interval of silence - and the repeating timer is
    /// armed behind it.
    pub fn start(&self, interval: Option<Duration>) {
        let mut inner = self.lock();
        if inner.timer.is_some() {
            debug!("Scheduler::start: already running, ignoring");
            return;
        }

        if let Some(interval) = interval {
            inner.interval = clamp_interval(interval);
        }
        let interval = inner.interval;

        inner.timer = Some(self.spawn_timer(interval, true));
        info!(interval_ms = interval.as_millis() as u64, "Scheduler started");
    }

    /// Stop ticking. No-op when already stopped.
    ///
    /// Aborts the timer task; abort lands on an await point, so the
    /// synchronous persist step of a tick cannot be torn. The configured
    /// interval survives for the next `start`.
    pub fn stop(&self) {
        let mut inner = self.lock();
        match inner.timer.take() {
            Some(handle) => {
                handle.abort();
                info!("Scheduler stopped");
            }
            None => debug!("Scheduler::stop: not running, ignoring"),
        }
    }

    /// Change the polling interval, clamping below the floor.
    ///
    /// When running, the old timer is cancelled and a new one armed so the
    /// change takes effect now rather than after the current period. The
    /// replacement timer does not run an immediate check - the in-progress
    /// cycle's bookkeeping already happened - its first tick is a full new
    /// interval from now.
    pub fn set_interval(&self, interval_ms: u64) {
        let interval = clamp_interval(Duration::from_millis(interval_ms));

        let mut inner = self.lock();
        inner.interval = interval;
        if let Some(handle) = inner.timer.take() {
            handle.abort();
            inner.timer = Some(self.spawn_timer(interval, false));
        }
        info!(interval_ms = interval.as_millis() as u64, "Scheduler interval updated");
    }

    /// Re-read the tracked keyword set and replace the rotation snapshot.
    ///
    /// Callers should invoke this after adding or removing keywords; the
    /// per-tick re-read means a missed call delays, but never permanently
    /// skips, picking up the change. Store failures propagate to the caller.
    pub fn refresh(&self) -> Result<()> {
        let keywords = self.store.list()?;
        let mut inner = self.lock();
        debug!(count = keywords.len(), "Scheduler::refresh: replacing rotation snapshot");
        inner.rotation.replace(keywords);
        Ok(())
    }

    /// Current interval and running flag. Pure read.
    pub fn state(&self) -> SchedulerState {
        let inner = self.lock();
        SchedulerState {
            interval: inner.interval,
            running: inner.timer.is_some(),
        }
    }

    /// Pending work order: the rotation reordered so the next keyword to be
    /// checked comes first. Pure read; does not move the cursor.
    pub fn queue(&self) -> Vec<TrackedKeyword> {
        self.lock().rotation.queue()
    }

    fn spawn_timer(&self, interval: Duration, immediate: bool) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let fetcher = Arc::clone(&self.fetcher);
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            if immediate {
                Self::run_tick(&store, &fetcher, &inner).await;
            }

            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            // A check that overruns the interval delays the next tick instead
            // of bursting; ticks stay serialized, one check in flight.
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                Self::run_tick(&store, &fetcher, &inner).await;
            }
        })
    }

    /// One tick: refresh the rotation, check the keyword at the cursor,
    /// persist the observation, advance.
    ///
    /// Every failure in here is tick-local: logged, the cycle's observation
    /// skipped, the timer untouched. The mutex is held only around the
    /// synchronous select and advance steps, never across the fetch.
    async fn run_tick(store: &Arc<KeywordStore>, fetcher: &Arc<dyn PageFetcher>, inner: &Arc<Mutex<SchedulerInner>>) {
        // Re-read the keyword set every tick so additions and removals are
        // picked up even when no refresh() notification arrived.
        let keywords = match store.list() {
            Ok(keywords) => keywords,
            Err(e) => {
                warn!(error = %e, "Tick skipped: failed to read keywords");
                return;
            }
        };

        let (target, len_at_selection) = {
            let mut inner = inner.lock().expect("scheduler mutex poisoned");
            inner.rotation.replace(keywords);
            let len = inner.rotation.len();
            match inner.rotation.current() {
                Some(keyword) => (keyword.clone(), len),
                None => {
                    debug!("No keywords to monitor");
                    return;
                }
            }
        };

        info!(
            keyword_id = target.id,
            keyword = %target.keyword,
            target_url = %target.target_url,
            "Checking ranking"
        );

        match fetcher.fetch(&target.keyword).await {
            Ok(page) => {
                let rank = extract::rank_of(&page, &target.target_url);
                match rank {
                    Some(rank) => info!(keyword_id = target.id, rank, "Rank found in ads"),
                    None => info!(keyword_id = target.id, "Not found in ads"),
                }

                // Absence is itself signal: the observation is persisted
                // either way. A persist failure is logged, not fatal.
                if let Err(e) = store.record_observation(target.id, rank) {
                    warn!(keyword_id = target.id, error = %e, "Failed to record observation");
                }
            }
            Err(e) => {
                warn!(
                    keyword_id = target.id,
                    keyword = %target.keyword,
                    error = %e,
                    "Fetch failed, skipping observation for this cycle"
                );
            }
        }

        // Advance with the length captured at selection so a concurrent
        // shrink cannot leave the cursor referencing a stale slot.
        let mut inner = inner.lock().expect("scheduler mutex poisoned");
        inner.rotation.advance(len_at_selection);
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.lock()
            && let Some(handle) = inner.timer.take()
        {
            handle.abort();
        }
    }
}

fn clamp_interval(interval: Duration) -> Duration {
    let floor = Duration::from_millis(MIN_INTERVAL_MS);
    if interval < floor {
        warn!(
            requested_ms = interval.as_millis() as u64,
            floor_ms = MIN_INTERVAL_MS,
            "Interval below floor, clamping"
        );
        floor
    } else {
        interval
    }
}
