use crate::state::DomainPolicy;
use crate::UrlResult;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default, rename = "domain")]
    pub domains: Vec<DomainEntry>,
}

impl Config {
    /// Builds the domain policies described by this configuration
    pub fn domain_policies(&self) -> UrlResult<Vec<DomainPolicy>> {
        self.domains.iter().map(DomainEntry::to_policy).collect()
    }
}

/// Scheduling behavior configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchedulerConfig {
    /// Stop the whole crawl the first time any domain queue runs dry
    #[serde(default)]
    pub once: bool,

    /// Stop after this many claims (0 = unlimited)
    #[serde(default, rename = "claim-limit")]
    pub claim_limit: u64,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Queue backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueBackend {
    /// Per-process in-memory queues
    #[default]
    Memory,
    /// Queues persisted in the storage database
    Sqlite,
}

/// Queue configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueueConfig {
    #[serde(default)]
    pub backend: QueueBackend,

    /// Clear leftover queued URLs before starting (sqlite backend only)
    ///
    /// Without it, a domain whose queue still holds URLs from the previous
    /// run resumes from them and is not reseeded until it runs dry, so a
    /// run-once pass finishes the old URLs first.
    #[serde(default)]
    pub fresh: bool,
}

/// A crawl target
#[derive(Debug, Clone, Deserialize)]
pub struct DomainEntry {
    /// Base URL; its host is the domain identity
    pub url: String,

    /// Minimum time between two URLs yielded for this domain (milliseconds)
    pub delay: u64,

    /// Seed URLs re-enqueued whenever the domain's queue runs dry
    #[serde(default, rename = "start-points")]
    pub start_points: Vec<String>,
}

impl DomainEntry {
    /// Converts this entry into a domain policy
    pub fn to_policy(&self) -> UrlResult<DomainPolicy> {
        DomainPolicy::new(
            self.url.clone(),
            Duration::from_millis(self.delay),
            self.start_points.clone(),
        )
    }
}
