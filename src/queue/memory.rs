//! In-memory queue backend

use crate::queue::{FetchQueue, QueueError, QueueFactory, QueueResult};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// Mutex-guarded in-memory FIFO
#[derive(Debug, Default)]
pub struct MemoryQueue {
    domain: String,
    urls: Mutex<VecDeque<String>>,
}

impl MemoryQueue {
    /// Creates an empty queue for `domain`
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            urls: Mutex::new(VecDeque::new()),
        }
    }

    fn urls(&self) -> QueueResult<MutexGuard<'_, VecDeque<String>>> {
        self.urls
            .lock()
            .map_err(|_| QueueError::Poisoned(self.domain.clone()))
    }
}

impl FetchQueue for MemoryQueue {
    fn enqueue(&self, url: &str) -> QueueResult<()> {
        self.urls()?.push_back(url.to_string());
        Ok(())
    }

    fn dequeue(&self) -> QueueResult<Option<String>> {
        Ok(self.urls()?.pop_front())
    }

    fn len(&self) -> QueueResult<usize> {
        Ok(self.urls()?.len())
    }
}

/// Factory handing out a fresh [`MemoryQueue`] per domain
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryQueueFactory;

impl QueueFactory for MemoryQueueFactory {
    fn queue_for(&self, domain: &str) -> QueueResult<Arc<dyn FetchQueue>> {
        Ok(Arc::new(MemoryQueue::new(domain)))
    }
}
