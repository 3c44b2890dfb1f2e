use crate::url::domain_key;
use crate::UrlResult;
use std::time::Duration;

/// Pacing policy for a single crawl target
///
/// A policy is immutable once loaded. Its identity is derived from the base
/// URL, and it is the key under which the scheduler registers the domain's
/// queue and pacer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainPolicy {
    key: String,
    url: String,
    delay: Duration,
    start_points: Vec<String>,
}

impl DomainPolicy {
    /// Creates a new policy, deriving its identity from `url`
    ///
    /// # Arguments
    ///
    /// * `url` - Base URL of the domain
    /// * `delay` - Minimum interval between two URLs yielded for this domain
    /// * `start_points` - Seed URLs, in the order they are re-enqueued
    ///
    /// # Returns
    ///
    /// * `Ok(DomainPolicy)` - The policy
    /// * `Err(UrlError)` - The base URL has no usable domain
    pub fn new(
        url: impl Into<String>,
        delay: Duration,
        start_points: Vec<String>,
    ) -> UrlResult<Self> {
        let url = url.into();
        let key = domain_key(&url)?;

        Ok(Self {
            key,
            url,
            delay,
            start_points,
        })
    }

    /// Domain identity (lowercased host without `www.`)
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Base URL of the domain
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch delay for the domain
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Configured start points (may be empty)
    pub fn start_points(&self) -> &[String] {
        &self.start_points
    }

    /// URLs enqueued when the domain's queue is (re)seeded
    ///
    /// This is the list of start points, or the base URL alone when no start
    /// points are configured, so a reseed never leaves the queue empty.
    pub fn reseed_urls(&self) -> &[String] {
        if self.start_points.is_empty() {
            std::slice::from_ref(&self.url)
        } else {
            &self.start_points
        }
    }
}
