//! Integration tests for the coordinator driver loop

use spider_scheduler::config::parse_config;
use spider_scheduler::crawler::{run_schedule, Coordinator};
use spider_scheduler::queue::{FetchQueue, QueueError, QueueFactory, QueueResult};
use spider_scheduler::state::{DomainPolicy, PageState};
use spider_scheduler::storage::{PageStore, SqliteStorage};
use spider_scheduler::{Scheduler, SchedulerError, SpiderError};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Builds a TOML configuration rooted in `dir`
fn create_test_config_toml(dir: &TempDir, extra: &str) -> String {
    let db_path = dir.path().join("spider.db");
    format!(
        r#"
[storage]
database-path = "{}"

{}

[[domain]]
url = "https://example.com/"
delay = 20
start-points = ["https://example.com/news", "https://example.com/blog"]

[[domain]]
url = "https://www.rust-lang.org/"
delay = 50
"#,
        db_path.display(),
        extra
    )
}

#[tokio::test(start_paused = true)]
async fn test_single_pass_from_toml_config() {
    let dir = TempDir::new().unwrap();
    let toml = create_test_config_toml(&dir, "[scheduler]\nonce = true");
    let config = parse_config(&toml).unwrap();

    let mut claimed = Vec::new();
    let summary = run_schedule(&config, |claim| claimed.push(claim.page.url.clone()))
        .await
        .unwrap();

    // rust-lang.org is claimed at 50ms; example.com runs dry at 60ms.
    assert_eq!(
        claimed,
        vec![
            "https://example.com/news",
            "https://example.com/blog",
            "https://www.rust-lang.org/",
        ]
    );
    assert_eq!(summary.claims, 3);
    assert_eq!(summary.claims_by_domain.get("example.com"), Some(&2));
    assert_eq!(summary.claims_by_domain.get("rust-lang.org"), Some(&1));

    let storage = SqliteStorage::new(Path::new(&config.storage.database_path)).unwrap();
    assert_eq!(storage.load_domains().unwrap().len(), 2);
    assert_eq!(storage.count_pages().unwrap(), 3);
    assert_eq!(storage.count_pages_by_state(PageState::Queued).unwrap(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_sqlite_backend_with_claim_limit() {
    let dir = TempDir::new().unwrap();
    let toml = create_test_config_toml(
        &dir,
        "[scheduler]\nclaim-limit = 7\n\n[queue]\nbackend = \"sqlite\"\nfresh = true",
    );
    let config = parse_config(&toml).unwrap();

    let summary = run_schedule(&config, |_| {}).await.unwrap();

    assert_eq!(summary.claims, 7);
    let per_domain: u64 = summary.claims_by_domain.values().sum();
    assert_eq!(per_domain, 7);
}

struct FailingQueue;

impl FetchQueue for FailingQueue {
    fn enqueue(&self, _url: &str) -> QueueResult<()> {
        Ok(())
    }

    fn dequeue(&self) -> QueueResult<Option<String>> {
        Err(QueueError::Backend("queue unavailable".to_string()))
    }

    fn len(&self) -> QueueResult<usize> {
        Ok(0)
    }
}

struct FailingQueueFactory;

impl QueueFactory for FailingQueueFactory {
    fn queue_for(&self, _domain: &str) -> QueueResult<Arc<dyn FetchQueue>> {
        Ok(Arc::new(FailingQueue))
    }
}

#[tokio::test(start_paused = true)]
async fn test_terminal_scheduler_error_fails_run() {
    let storage = SqliteStorage::new_in_memory().unwrap();
    let policy =
        DomainPolicy::new("https://example.com/", Duration::from_millis(10), vec![]).unwrap();
    storage.save_domains(&[policy]).unwrap();

    let scheduler = Scheduler::new(&FailingQueueFactory, Arc::new(storage)).unwrap();
    let result = Coordinator::with_scheduler(scheduler, 0).run(|_| {}).await;

    assert!(matches!(
        result,
        Err(SpiderError::Scheduler(SchedulerError::Queue(_)))
    ));
}
