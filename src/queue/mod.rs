//! Queue module for per-domain fetch queues
//!
//! Every configured domain owns one FIFO of pending URLs. The scheduler only
//! depends on the [`FetchQueue`] and [`QueueFactory`] traits; two backends are
//! provided:
//! - `MemoryQueue`: a mutex-guarded `VecDeque`
//! - `SqliteQueue`: rows in a shared SQLite `queue` table, surviving restarts

mod memory;
mod sqlite;

pub use memory::{MemoryQueue, MemoryQueueFactory};
pub use sqlite::{SqliteQueue, SqliteQueueFactory};

use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during queue operations
///
/// An empty queue is not an error; see [`FetchQueue::dequeue`].
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue backend error: {0}")]
    Backend(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Queue lock poisoned for domain {0}")]
    Poisoned(String),
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// FIFO of pending URLs for a single domain
///
/// Implementations are shared behind `Arc` and may be called from any task.
pub trait FetchQueue: Send + Sync {
    /// Appends a URL to the tail of the queue
    fn enqueue(&self, url: &str) -> QueueResult<()>;

    /// Removes and returns the head of the queue
    ///
    /// # Returns
    ///
    /// * `Ok(Some(url))` - The next URL
    /// * `Ok(None)` - The queue is empty
    /// * `Err(QueueError)` - The backend failed
    fn dequeue(&self) -> QueueResult<Option<String>>;

    /// Number of pending URLs
    fn len(&self) -> QueueResult<usize>;

    /// Returns true if no URLs are pending
    fn is_empty(&self) -> QueueResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// Produces an independent queue for each domain
pub trait QueueFactory {
    /// Creates the queue for `domain`
    fn queue_for(&self, domain: &str) -> QueueResult<Arc<dyn FetchQueue>>;
}
