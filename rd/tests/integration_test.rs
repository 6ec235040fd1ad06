//! Integration tests for RankDaemon
//!
//! These tests wire the real store and scheduler together with a scripted
//! page fetcher and verify end-to-end behavior of a check cycle.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use keywordstore::KeywordStore;
use rankdaemon::extract::{ExtractedPage, rank_of};
use rankdaemon::fetcher::{FetchError, PageFetcher, parse_results};
use rankdaemon::scheduler::{Scheduler, SchedulerConfig};

/// A results page with two ads, as the rendering service would return it
const RESULTS_PAGE: &str = r#"
    <html><body>
      <div id="power_link_body">
        <ul>
          <li class="lst">
            <a class="lnk_head" href="https://competitor.example.com/landing">
              <span class="lnk_tit">Competitor store</span>
            </a>
            <span class="lnk_url">competitor.example.com</span>
          </li>
          <li class="lst">
            <a class="lnk_head" href="https://myshop.example.com/landing">
              <span class="lnk_tit">My shop</span>
            </a>
            <span class="lnk_url">myshop.example.com</span>
          </li>
        </ul>
      </div>
    </body></html>
"#;

/// Fetcher that parses a canned HTML page, or fails, per query
struct ScriptedFetcher {
    html: Option<&'static str>,
    queries: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    fn returning(html: &'static str) -> Arc<Self> {
        Arc::new(Self {
            html: Some(html),
            queries: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            html: None,
            queries: Mutex::new(Vec::new()),
        })
    }

    fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, query: &str) -> Result<ExtractedPage, FetchError> {
        self.queries.lock().unwrap().push(query.to_string());
        match self.html {
            Some(html) => Ok(parse_results(html)),
            None => Err(FetchError::Network("scripted failure".to_string())),
        }
    }
}

// =============================================================================
// Extraction Pipeline Tests
// =============================================================================

#[test]
fn test_parse_and_rank_pipeline() {
    let page = parse_results(RESULTS_PAGE);

    assert_eq!(page.ads.len(), 2);
    assert_eq!(rank_of(&page, "myshop.example.com"), Some(2));
    assert_eq!(rank_of(&page, "competitor.example.com"), Some(1));
    assert_eq!(rank_of(&page, "absent.example.com"), None);
}

// =============================================================================
// Scheduler + Store Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_full_check_cycle_persists_observation() {
    let store = Arc::new(KeywordStore::open_in_memory().expect("Failed to open store"));
    let keyword = store.add("my shop keyword", "myshop.example.com").unwrap();

    let fetcher = ScriptedFetcher::returning(RESULTS_PAGE);
    let scheduler = Scheduler::new(Arc::clone(&store), fetcher.clone(), SchedulerConfig::default());

    scheduler.refresh().expect("Failed to refresh");
    scheduler.start(Some(Duration::from_secs(60)));

    // The first check runs immediately on start
    tokio::time::sleep(Duration::from_millis(50)).await;

    let keywords = store.list().unwrap();
    assert_eq!(keywords[0].last_rank, Some(2));
    assert!(keywords[0].last_checked_at.is_some());

    let observations = store.observations_for(keyword.id).unwrap();
    assert_eq!(observations.len(), 1);
    assert_eq!(observations[0].rank, Some(2));

    scheduler.stop();
}

#[tokio::test(start_paused = true)]
async fn test_round_robin_over_timer_ticks() {
    let store = Arc::new(KeywordStore::open_in_memory().expect("Failed to open store"));
    store.add("first", "a.example.com").unwrap();
    store.add("second", "b.example.com").unwrap();
    store.add("third", "c.example.com").unwrap();

    let fetcher = ScriptedFetcher::returning(RESULTS_PAGE);
    let scheduler = Scheduler::new(Arc::clone(&store), fetcher.clone(), SchedulerConfig::default());

    scheduler.start(Some(Duration::from_millis(1_000)));

    // Immediate check plus three interval ticks: every keyword exactly once
    // before any repeats
    tokio::time::sleep(Duration::from_millis(3_100)).await;
    assert_eq!(fetcher.queries(), vec!["first", "second", "third", "first"]);

    scheduler.stop();
}

#[tokio::test(start_paused = true)]
async fn test_fetch_failures_do_not_stop_the_scheduler() {
    let store = Arc::new(KeywordStore::open_in_memory().expect("Failed to open store"));
    let a = store.add("alpha", "a.example.com").unwrap();
    let b = store.add("beta", "b.example.com").unwrap();

    let fetcher = ScriptedFetcher::failing();
    let scheduler = Scheduler::new(Arc::clone(&store), fetcher.clone(), SchedulerConfig::default());

    scheduler.start(Some(Duration::from_millis(1_000)));
    tokio::time::sleep(Duration::from_millis(2_100)).await;

    // Three failed checks: rotation kept moving, nothing was persisted
    assert_eq!(fetcher.queries(), vec!["alpha", "beta", "alpha"]);
    assert!(store.observations_for(a.id).unwrap().is_empty());
    assert!(store.observations_for(b.id).unwrap().is_empty());
    assert_eq!(store.list().unwrap()[0].last_checked_at, None);

    // The scheduler is still running and reconfigurable
    assert!(scheduler.state().running);
    scheduler.stop();
    assert!(!scheduler.state().running);
}

#[tokio::test(start_paused = true)]
async fn test_keyword_added_mid_run_joins_rotation() {
    let store = Arc::new(KeywordStore::open_in_memory().expect("Failed to open store"));
    store.add("original", "a.example.com").unwrap();

    let fetcher = ScriptedFetcher::returning(RESULTS_PAGE);
    let scheduler = Scheduler::new(Arc::clone(&store), fetcher.clone(), SchedulerConfig::default());

    scheduler.start(Some(Duration::from_millis(1_000)));
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Added while running, without an explicit refresh(): the per-tick
    // re-read picks it up on the next cycle
    store.add("added later", "b.example.com").unwrap();
    tokio::time::sleep(Duration::from_millis(2_000)).await;

    let queries = fetcher.queries();
    assert!(queries.contains(&"added later".to_string()), "queries: {queries:?}");

    scheduler.stop();
}

#[tokio::test(start_paused = true)]
async fn test_reconfigure_interval_while_running() {
    let store = Arc::new(KeywordStore::open_in_memory().expect("Failed to open store"));
    store.add("only", "a.example.com").unwrap();

    let fetcher = ScriptedFetcher::returning(RESULTS_PAGE);
    let scheduler = Scheduler::new(Arc::clone(&store), fetcher.clone(), SchedulerConfig::default());

    // Default interval is a minute; tighten it to a second mid-run
    scheduler.start(None);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(fetcher.queries().len(), 1);

    scheduler.set_interval(1_000);
    tokio::time::sleep(Duration::from_millis(1_100)).await;

    // The new cadence applied from "now", not after the old minute elapsed
    assert_eq!(fetcher.queries().len(), 2);

    scheduler.stop();

    // Restart without an interval resumes the reconfigured one
    scheduler.start(None);
    assert_eq!(scheduler.state().interval, Duration::from_millis(1_000));
    scheduler.stop();
}

#[tokio::test]
async fn test_queue_reflects_pending_order() {
    let store = Arc::new(KeywordStore::open_in_memory().expect("Failed to open store"));
    store.add("first", "a.example.com").unwrap();
    store.add("second", "b.example.com").unwrap();

    let fetcher = ScriptedFetcher::returning(RESULTS_PAGE);
    let scheduler = Scheduler::new(Arc::clone(&store), fetcher, SchedulerConfig::default());

    scheduler.refresh().expect("Failed to refresh");
    let queue: Vec<String> = scheduler.queue().iter().map(|k| k.keyword.clone()).collect();
    assert_eq!(queue, vec!["first", "second"]);
}
