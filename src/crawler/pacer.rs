//! Per-domain pacing
//!
//! Each configured domain runs one pacer task. Every `delay` the pacer puts
//! its domain on the shared readiness channel; the scheduler answers each
//! signal by dequeuing at most one URL from that domain's queue. Pacing the
//! signal rather than the fetch is what bounds the request rate per domain.
//!
//! The readiness channel is bounded to the number of domains. When more
//! domains are ready than the consumer drains, a pacer waits on the send
//! instead of dropping its signal. That wait still races cancellation, so a
//! stopped scheduler never leaves a pacer parked on a full channel.

use crate::queue::{FetchQueue, QueueResult};
use crate::state::DomainPolicy;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Background unit signalling readiness for one domain
pub(crate) struct Pacer {
    policy: Arc<DomainPolicy>,
    ready: mpsc::Sender<Arc<DomainPolicy>>,
    cancel: CancellationToken,
}

impl Pacer {
    pub(crate) fn new(
        policy: Arc<DomainPolicy>,
        ready: mpsc::Sender<Arc<DomainPolicy>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            policy,
            ready,
            cancel,
        }
    }

    /// Runs until cancelled or until the scheduler drops the receiver
    pub(crate) async fn run(self) {
        let delay = self.policy.delay();

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }

            tracing::trace!("Domain {} ready", self.policy.key());

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                sent = self.ready.send(Arc::clone(&self.policy)) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::debug!("Pacer for {} stopped", self.policy.key());
    }
}

/// Re-populates a domain's queue from its start points
///
/// Enqueues every start point in order, or the base URL when the domain has
/// none.
///
/// # Returns
///
/// * `Ok(usize)` - Number of URLs enqueued
/// * `Err(QueueError)` - The queue rejected a URL
pub(crate) fn reseed(policy: &DomainPolicy, queue: &dyn FetchQueue) -> QueueResult<usize> {
    let urls = policy.reseed_urls();
    for url in urls {
        queue.enqueue(url)?;
    }
    Ok(urls.len())
}
