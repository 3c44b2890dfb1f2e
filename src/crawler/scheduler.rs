//! Scheduler: serves one URL at a time across independently paced domains
//!
//! This module handles:
//! - One queue and one pacer task per configured domain, created together
//! - Turning readiness signals into claimed URLs (the cursor)
//! - Reseeding a domain whose queue has run dry, or ending a run-once crawl
//! - Routing discovered links to the queue of their domain
//! - Cooperative shutdown and a sticky terminal error

use crate::crawler::pacer::{reseed, Pacer};
use crate::queue::{FetchQueue, QueueError, QueueFactory};
use crate::state::DomainPolicy;
use crate::storage::{Page, PageStore, StorageError};
use crate::url::domain_key;
use crate::UrlError;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Errors surfaced by the scheduler
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Queue not found for domain {0}")]
    QueueNotFound(String),

    #[error("Domain {0} is configured more than once")]
    DuplicateDomain(String),

    #[error("No URL is currently claimed")]
    NoClaim,

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),
}

/// The claim handed to the consumer by [`Scheduler::cur`]
#[derive(Debug, Clone)]
pub struct Claim {
    /// Policy of the domain the URL belongs to
    pub domain: Arc<DomainPolicy>,

    /// Best-known record for the claimed URL
    pub page: Page,
}

/// Cloneable handle that stops a scheduler from another task
#[derive(Debug, Clone)]
pub struct StopHandle(CancellationToken);

impl StopHandle {
    /// Stops the scheduler; calling it again has no further effect
    pub fn stop(&self) {
        self.0.cancel();
    }

    /// Returns true once the scheduler has been stopped
    pub fn is_stopped(&self) -> bool {
        self.0.is_cancelled()
    }
}

/// A configured domain: its policy and the queue it owns
struct DomainSlot {
    policy: Arc<DomainPolicy>,
    queue: Arc<dyn FetchQueue>,
}

/// The single in-flight claim
struct Cursor {
    domain: Arc<DomainPolicy>,
    url: String,
}

/// Scheduler owns the domain table and its pacer tasks
///
/// Intended for a single consumer: call [`next`](Self::next) in a loop and,
/// after each `true`, read the claim with [`cur`](Self::cur), report
/// discovered links with [`add`](Self::add) and persist the result with
/// [`update`](Self::update). When `next` returns `false`, [`err`](Self::err)
/// tells a clean stop apart from a backend failure.
pub struct Scheduler {
    /// Domain table, keyed by identity; never resized after construction
    domains: HashMap<String, DomainSlot>,

    /// One pacer task per domain
    pacers: JoinSet<()>,

    /// Readiness signals from every pacer
    ready: mpsc::Receiver<Arc<DomainPolicy>>,

    /// Observed by every wait point
    cancel: CancellationToken,

    cursor: Option<Cursor>,

    once: bool,

    err: Option<SchedulerError>,

    store: Arc<dyn PageStore>,
}

impl Scheduler {
    /// Creates a scheduler for every domain policy in the store
    ///
    /// For each domain this creates its queue, seeds it unless it already
    /// holds URLs, and spawns its pacer. Must be called from within a Tokio
    /// runtime.
    ///
    /// # Arguments
    ///
    /// * `queues` - Factory producing one queue per domain
    /// * `store` - Page store holding the domain policies and page records
    ///
    /// # Returns
    ///
    /// * `Ok(Scheduler)` - Running scheduler
    /// * `Err(SchedulerError::DuplicateDomain)` - Two policies share an identity
    /// * `Err(SchedulerError)` - The domain policies could not be loaded or a
    ///   queue could not be created or seeded
    pub fn new(
        queues: &dyn QueueFactory,
        store: Arc<dyn PageStore>,
    ) -> Result<Self, SchedulerError> {
        let policies = store.load_domains()?;

        // tokio rejects zero-capacity channels
        let (ready_tx, ready) = mpsc::channel(policies.len().max(1));
        let cancel = CancellationToken::new();
        let mut pacers = JoinSet::new();
        let mut domains: HashMap<String, DomainSlot> = HashMap::with_capacity(policies.len());

        for policy in policies {
            if domains.contains_key(policy.key()) {
                return Err(SchedulerError::DuplicateDomain(policy.key().to_string()));
            }

            let policy = Arc::new(policy);
            let queue = queues.queue_for(policy.key())?;

            // A persistent queue may still hold the previous run's URLs
            let pending = queue.len()?;
            if pending > 0 {
                tracing::info!("Resuming {} with {} queued URLs", policy.key(), pending);
            } else {
                let seeded = reseed(&policy, queue.as_ref())?;
                tracing::debug!(
                    "Seeded {} with {} URLs (delay {:?})",
                    policy.key(),
                    seeded,
                    policy.delay()
                );
            }

            pacers.spawn(
                Pacer::new(Arc::clone(&policy), ready_tx.clone(), cancel.clone()).run(),
            );
            domains.insert(policy.key().to_string(), DomainSlot { policy, queue });
        }

        tracing::info!("Scheduler started with {} domains", domains.len());

        Ok(Self {
            domains,
            pacers,
            ready,
            cancel,
            cursor: None,
            once: false,
            err: None,
            store,
        })
    }

    /// Waits for the next URL to fetch
    ///
    /// Blocks until some domain's pacer signals readiness, then claims one URL
    /// from that domain's queue. A domain whose queue has run dry is reseeded
    /// and skipped for this signal, unless run-once mode is on, in which case
    /// the whole scheduler stops.
    ///
    /// # Returns
    ///
    /// * `true` - A URL is claimed; read it with [`cur`](Self::cur)
    /// * `false` - The scheduler stopped, finished its single pass, has no
    ///   domains, or failed (see [`err`](Self::err))
    pub async fn next(&mut self) -> bool {
        self.cursor = None;

        if self.domains.is_empty() || self.err.is_some() {
            return false;
        }

        loop {
            let domain = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return false,
                ready = self.ready.recv() => match ready {
                    Some(domain) => domain,
                    None => return false,
                },
            };

            let queue = match self.domains.get(domain.key()) {
                Some(slot) => Arc::clone(&slot.queue),
                None => continue,
            };

            match queue.dequeue() {
                Ok(Some(url)) => {
                    tracing::debug!("Claimed {}", url);
                    self.cursor = Some(Cursor { domain, url });
                    return true;
                }
                Ok(None) if self.once => {
                    tracing::info!(
                        "Queue for {} exhausted, single pass complete",
                        domain.key()
                    );
                    self.stop();
                    return false;
                }
                Ok(None) => match reseed(&domain, queue.as_ref()) {
                    Ok(count) => {
                        tracing::info!(
                            "Queue for {} exhausted, reseeded with {} URLs",
                            domain.key(),
                            count
                        );
                    }
                    Err(e) => {
                        self.fail(e.into());
                        return false;
                    }
                },
                Err(e) => {
                    self.fail(e.into());
                    return false;
                }
            }
        }
    }

    /// Routes a URL to the queue of the domain it belongs to
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The URL was appended to its domain's queue
    /// * `Err(SchedulerError::QueueNotFound)` - The domain is not configured;
    ///   no queue was touched
    /// * `Err(SchedulerError)` - The URL has no domain or the queue failed
    pub fn add(&self, url: &str) -> Result<(), SchedulerError> {
        let key = domain_key(url)?;
        let slot = self
            .domains
            .get(&key)
            .ok_or(SchedulerError::QueueNotFound(key))?;

        slot.queue.enqueue(url)?;
        Ok(())
    }

    /// Returns the current claim
    ///
    /// A URL the store has never recorded comes back as a placeholder page
    /// carrying only the URL.
    ///
    /// # Returns
    ///
    /// * `Ok(Claim)` - Domain policy and page for the claimed URL
    /// * `Err(SchedulerError::NoClaim)` - The last `next` did not return true
    /// * `Err(SchedulerError::Storage)` - The store failed
    pub fn cur(&self) -> Result<Claim, SchedulerError> {
        let cursor = self.cursor.as_ref().ok_or(SchedulerError::NoClaim)?;

        let page = match self.store.get_page(&cursor.url) {
            Ok(page) => page,
            Err(StorageError::PageNotFound(_)) => Page::new(cursor.url.as_str()),
            Err(e) => return Err(e.into()),
        };

        Ok(Claim {
            domain: Arc::clone(&cursor.domain),
            page,
        })
    }

    /// Persists a page record keyed by its URL
    ///
    /// Does not advance the cursor.
    pub fn update(&self, page: &Page) -> Result<(), SchedulerError> {
        self.store.save_page(page)?;
        Ok(())
    }

    /// Switches to single-pass mode
    ///
    /// From now on the first domain whose queue runs dry stops the scheduler
    /// instead of being reseeded.
    pub fn once(&mut self) {
        self.once = true;
    }

    /// Stops every pacer and the `next` loop
    pub fn stop(&self) {
        if !self.cancel.is_cancelled() {
            tracing::info!("Stopping scheduler");
        }
        self.cancel.cancel();
    }

    /// Returns a handle that can stop this scheduler from another task
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.cancel.clone())
    }

    /// Returns true once the scheduler has been stopped or has failed
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Returns the terminal error, if the scheduler failed
    pub fn err(&self) -> Option<&SchedulerError> {
        self.err.as_ref()
    }

    /// Consumes the scheduler, returning its terminal error
    pub fn into_err(self) -> Option<SchedulerError> {
        self.err
    }

    /// Stops the scheduler and waits for every pacer task to exit
    ///
    /// # Returns
    ///
    /// The number of pacer tasks joined
    pub async fn shutdown(&mut self) -> usize {
        self.stop();

        let mut joined = 0;
        while let Some(result) = self.pacers.join_next().await {
            if let Err(e) = result {
                tracing::warn!("Pacer task ended abnormally: {}", e);
            }
            joined += 1;
        }
        joined
    }

    /// Returns the configured domain policies
    pub fn domains(&self) -> impl Iterator<Item = &DomainPolicy> {
        self.domains.values().map(|slot| slot.policy.as_ref())
    }

    /// Returns the number of URLs pending for `domain`
    pub fn queued(&self, domain: &str) -> Result<usize, SchedulerError> {
        let slot = self
            .domains
            .get(domain)
            .ok_or_else(|| SchedulerError::QueueNotFound(domain.to_string()))?;
        Ok(slot.queue.len()?)
    }

    /// Records the terminal error and halts every pacer
    fn fail(&mut self, err: SchedulerError) {
        tracing::error!("Scheduler failed: {}", err);
        if self.err.is_none() {
            self.err = Some(err);
        }
        self.cancel.cancel();
    }
}
