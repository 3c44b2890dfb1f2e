//! Integration tests for the scheduler
//!
//! These drive the public scheduler API against real SQLite storage with the
//! tokio clock paused, so pacing delays elapse instantly and deterministically.

use spider_scheduler::queue::{
    FetchQueue, MemoryQueue, MemoryQueueFactory, QueueError, QueueFactory, QueueResult,
    SqliteQueueFactory,
};
use spider_scheduler::state::{DomainPolicy, PageState};
use spider_scheduler::storage::{Page, PageStore, SqliteStorage, StorageError, StorageResult};
use spider_scheduler::{Scheduler, SchedulerError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::Instant;

/// Creates an in-memory store holding the given `(url, delay_ms, start_points)` domains
fn create_test_store(domains: &[(&str, u64, &[&str])]) -> Arc<SqliteStorage> {
    let storage = SqliteStorage::new_in_memory().expect("Failed to open storage");
    let policies: Vec<DomainPolicy> = domains
        .iter()
        .map(|(url, delay, points)| {
            DomainPolicy::new(
                *url,
                Duration::from_millis(*delay),
                points.iter().map(|s| s.to_string()).collect(),
            )
            .expect("Invalid test domain")
        })
        .collect();
    storage
        .save_domains(&policies)
        .expect("Failed to save domains");
    Arc::new(storage)
}

/// Queue whose backend always fails to dequeue
struct BrokenQueue;

impl FetchQueue for BrokenQueue {
    fn enqueue(&self, _url: &str) -> QueueResult<()> {
        Ok(())
    }

    fn dequeue(&self) -> QueueResult<Option<String>> {
        Err(QueueError::Backend("connection reset".to_string()))
    }

    fn len(&self) -> QueueResult<usize> {
        Ok(0)
    }
}

struct BrokenQueueFactory;

impl QueueFactory for BrokenQueueFactory {
    fn queue_for(&self, _domain: &str) -> QueueResult<Arc<dyn FetchQueue>> {
        Ok(Arc::new(BrokenQueue))
    }
}

/// Queue that accepts a fixed number of enqueues, then rejects the rest
struct FullQueue {
    inner: MemoryQueue,
    room: AtomicUsize,
}

impl FetchQueue for FullQueue {
    fn enqueue(&self, url: &str) -> QueueResult<()> {
        self.room
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .map_err(|_| QueueError::Backend("full".to_string()))?;
        self.inner.enqueue(url)
    }

    fn dequeue(&self) -> QueueResult<Option<String>> {
        self.inner.dequeue()
    }

    fn len(&self) -> QueueResult<usize> {
        self.inner.len()
    }
}

struct FullQueueFactory(usize);

impl QueueFactory for FullQueueFactory {
    fn queue_for(&self, domain: &str) -> QueueResult<Arc<dyn FetchQueue>> {
        Ok(Arc::new(FullQueue {
            inner: MemoryQueue::new(domain),
            room: AtomicUsize::new(self.0),
        }))
    }
}

/// Store serving a fixed domain list, or failing to load when there is none
struct FixedDomains(Option<Vec<DomainPolicy>>);

impl FixedDomains {
    fn of(urls: &[&str]) -> Self {
        Self(Some(
            urls.iter()
                .map(|url| DomainPolicy::new(*url, Duration::from_millis(10), vec![]).unwrap())
                .collect(),
        ))
    }
}

impl PageStore for FixedDomains {
    fn load_domains(&self) -> StorageResult<Vec<DomainPolicy>> {
        self.0
            .clone()
            .ok_or_else(|| StorageError::Database("no such table: domains".to_string()))
    }

    fn save_domains(&self, _domains: &[DomainPolicy]) -> StorageResult<()> {
        Ok(())
    }

    fn get_page(&self, url: &str) -> StorageResult<Page> {
        Err(StorageError::PageNotFound(url.to_string()))
    }

    fn save_page(&self, _page: &Page) -> StorageResult<()> {
        Ok(())
    }

    fn count_pages(&self) -> StorageResult<u64> {
        Ok(0)
    }

    fn count_pages_by_state(&self, _state: PageState) -> StorageResult<u64> {
        Ok(0)
    }

    fn count_pages_by_domain(&self) -> StorageResult<HashMap<String, u64>> {
        Ok(HashMap::new())
    }
}

/// Store whose page lookups fail while domain loading works
struct BrokenPages(SqliteStorage);

impl PageStore for BrokenPages {
    fn load_domains(&self) -> StorageResult<Vec<DomainPolicy>> {
        self.0.load_domains()
    }

    fn save_domains(&self, domains: &[DomainPolicy]) -> StorageResult<()> {
        self.0.save_domains(domains)
    }

    fn get_page(&self, _url: &str) -> StorageResult<Page> {
        Err(StorageError::Database("disk I/O error".to_string()))
    }

    fn save_page(&self, page: &Page) -> StorageResult<()> {
        self.0.save_page(page)
    }

    fn count_pages(&self) -> StorageResult<u64> {
        self.0.count_pages()
    }

    fn count_pages_by_state(&self, state: PageState) -> StorageResult<u64> {
        self.0.count_pages_by_state(state)
    }

    fn count_pages_by_domain(&self) -> StorageResult<HashMap<String, u64>> {
        self.0.count_pages_by_domain()
    }
}

#[tokio::test(start_paused = true)]
async fn test_claim_update_and_reclaim_after_reseed() {
    let store = create_test_store(&[("https://example.com/", 10, &[])]);
    let mut scheduler = Scheduler::new(&MemoryQueueFactory, store.clone()).unwrap();

    let start = Instant::now();
    assert!(scheduler.next().await);
    assert!(start.elapsed() >= Duration::from_millis(10));

    let claim = scheduler.cur().unwrap();
    assert_eq!(claim.domain.key(), "example.com");
    assert_eq!(claim.page, Page::new("https://example.com/"));

    let mut page = claim.page;
    page.status_code = Some(200);
    page.state = PageState::from_status(200);
    page.title = Some("Example Domain".to_string());
    scheduler.update(&page).unwrap();

    // The queue is now empty: one signal reseeds, the next claims the base URL again.
    assert!(scheduler.next().await);
    let again = scheduler.cur().unwrap();
    assert_eq!(again.page.url, "https://example.com/");
    assert_eq!(again.page.state, PageState::Processed);
    assert_eq!(again.page.title.as_deref(), Some("Example Domain"));
    assert_eq!(store.count_pages().unwrap(), 1);

    assert_eq!(scheduler.shutdown().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_once_stops_on_first_exhausted_queue() {
    let store = create_test_store(&[(
        "https://example.com/",
        10,
        &["https://example.com/a", "https://example.com/b"],
    )]);
    let mut scheduler = Scheduler::new(&MemoryQueueFactory, store).unwrap();
    scheduler.once();

    let mut claimed = Vec::new();
    while scheduler.next().await {
        claimed.push(scheduler.cur().unwrap().page.url);
    }

    assert_eq!(claimed, vec!["https://example.com/a", "https://example.com/b"]);
    assert!(scheduler.err().is_none());
    assert!(scheduler.is_stopped());
    assert!(!scheduler.next().await);
    assert_eq!(scheduler.shutdown().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_without_run_once_reseeding_continues() {
    let store = create_test_store(&[("https://example.com/", 10, &["https://example.com/a"])]);
    let mut scheduler = Scheduler::new(&MemoryQueueFactory, store).unwrap();

    for _ in 0..5 {
        assert!(scheduler.next().await);
        assert_eq!(scheduler.cur().unwrap().page.url, "https://example.com/a");
    }

    assert!(!scheduler.is_stopped());
    scheduler.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_claim_rate_follows_domain_delay() {
    let store = create_test_store(&[
        ("https://fast.example/", 5, &[]),
        ("https://slow.example/", 50, &[]),
    ]);
    let mut scheduler = Scheduler::new(&MemoryQueueFactory, store).unwrap();

    let start = Instant::now();
    let mut claims: HashMap<String, Vec<Instant>> = HashMap::new();
    while start.elapsed() < Duration::from_millis(500) {
        assert!(scheduler.next().await);
        let claim = scheduler.cur().unwrap();
        claims
            .entry(claim.domain.key().to_string())
            .or_default()
            .push(Instant::now());
    }

    let fast = &claims["fast.example"];
    let slow = &claims["slow.example"];
    assert!(slow.len() >= 3);
    assert!(fast.len() > slow.len() * 3);

    // Never faster than the configured delay
    for gaps in fast.windows(2) {
        assert!(gaps[1] - gaps[0] >= Duration::from_millis(5));
    }
    for gaps in slow.windows(2) {
        assert!(gaps[1] - gaps[0] >= Duration::from_millis(50));
    }

    scheduler.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_from_handle_ends_next() {
    let store = create_test_store(&[("https://example.com/", 10, &[])]);
    let mut scheduler = Scheduler::new(&MemoryQueueFactory, store).unwrap();
    let handle = scheduler.stop_handle();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(3)).await;
        handle.stop();
    });

    assert!(!scheduler.next().await);
    assert!(scheduler.err().is_none());
    assert!(matches!(scheduler.cur(), Err(SchedulerError::NoClaim)));
}

#[tokio::test(start_paused = true)]
async fn test_idle_consumer_then_shutdown_joins_every_pacer() {
    let store = create_test_store(&[
        ("https://a.example/", 5, &[]),
        ("https://b.example/", 5, &[]),
        ("https://c.example/", 5, &[]),
    ]);
    let mut scheduler = Scheduler::new(&MemoryQueueFactory, store).unwrap();

    // Pacers fill the channel and then block on their sends.
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(scheduler.shutdown().await, 3);
}

#[tokio::test(start_paused = true)]
async fn test_queue_failure_is_terminal_and_sticky() {
    let store = create_test_store(&[("https://example.com/", 10, &[])]);
    let mut scheduler = Scheduler::new(&BrokenQueueFactory, store).unwrap();

    assert!(!scheduler.next().await);
    assert!(matches!(scheduler.err(), Some(SchedulerError::Queue(_))));
    assert!(scheduler.is_stopped());

    assert!(!scheduler.next().await);
    assert!(matches!(scheduler.err(), Some(SchedulerError::Queue(_))));
    assert!(matches!(scheduler.cur(), Err(SchedulerError::NoClaim)));

    assert_eq!(scheduler.shutdown().await, 1);
    assert!(matches!(scheduler.into_err(), Some(SchedulerError::Queue(_))));
}

#[tokio::test(start_paused = true)]
async fn test_store_failure_on_cur_propagates() {
    let inner = SqliteStorage::new_in_memory().unwrap();
    let policy =
        DomainPolicy::new("https://example.com/", Duration::from_millis(10), vec![]).unwrap();
    inner.save_domains(&[policy]).unwrap();
    let mut scheduler = Scheduler::new(&MemoryQueueFactory, Arc::new(BrokenPages(inner))).unwrap();

    assert!(scheduler.next().await);
    assert!(matches!(
        scheduler.cur(),
        Err(SchedulerError::Storage(StorageError::Database(_)))
    ));
    assert!(scheduler.err().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_sqlite_queue_backend_routes_discovered_links() {
    let store = create_test_store(&[
        ("https://example.com/", 10, &["https://example.com/a"]),
        ("https://other.org/", 1000, &[]),
    ]);
    let queues = SqliteQueueFactory::open_in_memory().unwrap();
    let mut scheduler = Scheduler::new(&queues, store).unwrap();

    assert!(scheduler.next().await);
    assert_eq!(scheduler.cur().unwrap().page.url, "https://example.com/a");

    scheduler.add("https://www.example.com/found").unwrap();
    assert_eq!(scheduler.queued("example.com").unwrap(), 1);
    assert!(matches!(
        scheduler.add("https://unknown.net/"),
        Err(SchedulerError::QueueNotFound(domain)) if domain == "unknown.net"
    ));

    assert!(scheduler.next().await);
    assert_eq!(
        scheduler.cur().unwrap().page.url,
        "https://www.example.com/found"
    );

    // Empty again: reseeded from the start point
    assert!(scheduler.next().await);
    assert_eq!(scheduler.cur().unwrap().page.url, "https://example.com/a");
    assert_eq!(scheduler.queued("other.org").unwrap(), 1);

    scheduler.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_domain_identity_rejected() {
    let store = FixedDomains::of(&["https://a.com/", "https://www.a.com/"]);

    let result = Scheduler::new(&MemoryQueueFactory, Arc::new(store));

    assert!(matches!(
        result,
        Err(SchedulerError::DuplicateDomain(domain)) if domain == "a.com"
    ));
}

#[tokio::test(start_paused = true)]
async fn test_domain_load_failure_fails_construction() {
    let result = Scheduler::new(&MemoryQueueFactory, Arc::new(FixedDomains(None)));

    assert!(matches!(
        result,
        Err(SchedulerError::Storage(StorageError::Database(_)))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_initial_seed_failure_fails_construction() {
    let store = FixedDomains::of(&["https://a.com/"]);

    let result = Scheduler::new(&FullQueueFactory(0), Arc::new(store));

    assert!(matches!(result, Err(SchedulerError::Queue(QueueError::Backend(_)))));
}

#[tokio::test(start_paused = true)]
async fn test_reseed_failure_in_next_is_terminal() {
    let store = FixedDomains::of(&["https://a.com/"]);
    let mut scheduler = Scheduler::new(&FullQueueFactory(1), Arc::new(store)).unwrap();

    assert!(scheduler.next().await);
    assert_eq!(scheduler.cur().unwrap().page.url, "https://a.com/");

    // Queue is empty now and refuses the reseed
    assert!(!scheduler.next().await);
    assert!(matches!(scheduler.err(), Some(SchedulerError::Queue(_))));
    assert!(scheduler.is_stopped());
    assert!(!scheduler.next().await);
    assert_eq!(scheduler.shutdown().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_leftover_sqlite_queue_is_resumed_not_reseeded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("queue.db");
    let domains = [(
        "https://example.com/",
        10_u64,
        &["https://example.com/a", "https://example.com/b"][..],
    )];

    let mut first = Scheduler::new(
        &SqliteQueueFactory::open(&path).unwrap(),
        create_test_store(&domains),
    )
    .unwrap();
    assert_eq!(first.queued("example.com").unwrap(), 2);
    assert!(first.next().await);
    assert_eq!(first.cur().unwrap().page.url, "https://example.com/a");
    first.shutdown().await;
    drop(first);

    let mut second = Scheduler::new(
        &SqliteQueueFactory::open(&path).unwrap(),
        create_test_store(&domains),
    )
    .unwrap();
    assert_eq!(second.queued("example.com").unwrap(), 1);
    second.once();
    assert!(second.next().await);
    assert_eq!(second.cur().unwrap().page.url, "https://example.com/b");
    assert!(!second.next().await);
    assert!(second.err().is_none());
}
