//! Crawler coordinator - the driver loop around the scheduler
//!
//! This module wires configuration, storage, and queue backends into a
//! [`Scheduler`] and drives it:
//! - Importing the configured domain policies into the store
//! - Choosing the queue backend
//! - Claiming URLs until the scheduler stops, a claim limit is hit, or a
//!   single pass completes
//! - Recording each claim as a visit in the page store

use crate::config::{Config, QueueBackend};
use crate::crawler::scheduler::{Claim, Scheduler, StopHandle};
use crate::queue::{MemoryQueueFactory, SqliteQueueFactory};
use crate::state::PageState;
use crate::storage::{PageStore, SqliteStorage};
use crate::SpiderError;
use chrono::Utc;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of a completed run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Total URLs claimed
    pub claims: u64,

    /// URLs claimed per domain identity
    pub claims_by_domain: HashMap<String, u64>,

    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

/// Main coordinator structure
pub struct Coordinator {
    scheduler: Scheduler,
    claim_limit: u64,
}

impl Coordinator {
    /// Creates a new coordinator
    ///
    /// Opens the database named in the configuration, replaces its domain
    /// table with the configured domains, and starts the scheduler.
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Running coordinator
    /// * `Err(SpiderError)` - Storage, queue, or scheduler setup failed
    pub fn new(config: &Config) -> Result<Self, SpiderError> {
        let database_path = Path::new(&config.storage.database_path);
        let storage = SqliteStorage::new(database_path)?;

        let policies = config.domain_policies()?;
        storage.save_domains(&policies)?;
        tracing::info!(
            "Imported {} domains into {}",
            policies.len(),
            database_path.display()
        );

        let store: Arc<dyn PageStore> = Arc::new(storage);

        let mut scheduler = match config.queue.backend {
            QueueBackend::Memory => Scheduler::new(&MemoryQueueFactory, store)?,
            QueueBackend::Sqlite => {
                let queues = SqliteQueueFactory::open(database_path)?;
                if config.queue.fresh {
                    let cleared = queues.clear()?;
                    tracing::info!("Cleared {} leftover queued URLs", cleared);
                }
                Scheduler::new(&queues, store)?
            }
        };

        if config.scheduler.once {
            scheduler.once();
        }

        Ok(Self {
            scheduler,
            claim_limit: config.scheduler.claim_limit,
        })
    }

    /// Wraps an already constructed scheduler
    pub fn with_scheduler(scheduler: Scheduler, claim_limit: u64) -> Self {
        Self {
            scheduler,
            claim_limit,
        }
    }

    /// Returns a handle that stops the run from another task
    pub fn stop_handle(&self) -> StopHandle {
        self.scheduler.stop_handle()
    }

    /// Runs the claim loop to completion
    ///
    /// Every claimed URL is recorded as one visit (a never-seen page moves
    /// from `Discovered` to `Queued`) and then passed to `on_claim`.
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` - The scheduler stopped cleanly
    /// * `Err(SpiderError)` - The scheduler hit a terminal error, or a claim
    ///   could not be read or recorded
    pub async fn run<F>(mut self, mut on_claim: F) -> Result<RunSummary, SpiderError>
    where
        F: FnMut(&Claim),
    {
        let start = Instant::now();
        let mut summary = RunSummary::default();

        while self.scheduler.next().await {
            let mut claim = self.scheduler.cur()?;

            claim.page.record_visit(Utc::now());
            if claim.page.state == PageState::Discovered {
                claim.page.state = PageState::Queued;
            }
            self.scheduler.update(&claim.page)?;

            on_claim(&claim);

            summary.claims += 1;
            *summary
                .claims_by_domain
                .entry(claim.domain.key().to_string())
                .or_insert(0) += 1;

            if summary.claims % 10 == 0 {
                let rate = summary.claims as f64 / start.elapsed().as_secs_f64();
                tracing::info!(
                    "Progress: {} URLs claimed, {:.2} claims/sec",
                    summary.claims,
                    rate
                );
            }

            if self.claim_limit > 0 && summary.claims >= self.claim_limit {
                tracing::info!("Claim limit of {} reached", self.claim_limit);
                self.scheduler.stop();
            }
        }

        let pacers = self.scheduler.shutdown().await;
        tracing::debug!("Joined {} pacers", pacers);

        summary.elapsed = start.elapsed();

        if let Some(err) = self.scheduler.into_err() {
            tracing::error!("Run aborted after {} claims: {}", summary.claims, err);
            return Err(err.into());
        }

        tracing::info!(
            "Run finished: {} URLs claimed in {:?}",
            summary.claims,
            summary.elapsed
        );

        Ok(summary)
    }
}

/// Runs the scheduler described by `config` until it stops
///
/// # Example
///
/// ```no_run
/// use spider_scheduler::config::load_config;
/// use spider_scheduler::crawler::run_schedule;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("spider.toml"))?;
/// let summary = run_schedule(&config, |claim| println!("{}", claim.page.url)).await?;
/// println!("{} URLs claimed", summary.claims);
/// # Ok(())
/// # }
/// ```
pub async fn run_schedule<F>(config: &Config, on_claim: F) -> Result<RunSummary, SpiderError>
where
    F: FnMut(&Claim),
{
    Coordinator::new(config)?.run(on_claim).await
}
