//! SQLite queue backend
//!
//! All domain queues share one connection and one `queue` table; a queue is
//! the set of rows for its domain ordered by row id.

use crate::queue::{FetchQueue, QueueError, QueueFactory, QueueResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// SQL schema for the queue table
const QUEUE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS queue (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    domain TEXT NOT NULL,
    url TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_queue_domain ON queue(domain, id);
"#;

type SharedConnection = Arc<Mutex<Connection>>;

fn lock<'a>(conn: &'a SharedConnection, domain: &str) -> QueueResult<MutexGuard<'a, Connection>> {
    conn.lock()
        .map_err(|_| QueueError::Poisoned(domain.to_string()))
}

/// Factory for SQLite-backed queues sharing a single connection
#[derive(Debug, Clone)]
pub struct SqliteQueueFactory {
    conn: SharedConnection,
}

impl SqliteQueueFactory {
    /// Opens (or creates) the queue table in the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteQueueFactory)` - Ready factory
    /// * `Err(QueueError)` - Failed to open the database
    pub fn open(path: &Path) -> QueueResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
        ",
        )?;
        Self::with_connection(conn)
    }

    /// Creates a factory backed by an in-memory database
    pub fn open_in_memory() -> QueueResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> QueueResult<Self> {
        conn.execute_batch(QUEUE_SQL)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Deletes every pending URL, for every domain
    ///
    /// # Returns
    ///
    /// The number of rows removed
    pub fn clear(&self) -> QueueResult<usize> {
        let conn = lock(&self.conn, "*")?;
        Ok(conn.execute("DELETE FROM queue", [])?)
    }
}

impl QueueFactory for SqliteQueueFactory {
    fn queue_for(&self, domain: &str) -> QueueResult<Arc<dyn FetchQueue>> {
        Ok(Arc::new(SqliteQueue {
            domain: domain.to_string(),
            conn: Arc::clone(&self.conn),
        }))
    }
}

/// One domain's view over the shared `queue` table
#[derive(Debug)]
pub struct SqliteQueue {
    domain: String,
    conn: SharedConnection,
}

impl FetchQueue for SqliteQueue {
    fn enqueue(&self, url: &str) -> QueueResult<()> {
        let conn = lock(&self.conn, &self.domain)?;
        conn.execute(
            "INSERT INTO queue (domain, url) VALUES (?1, ?2)",
            params![self.domain, url],
        )?;
        Ok(())
    }

    fn dequeue(&self) -> QueueResult<Option<String>> {
        let conn = lock(&self.conn, &self.domain)?;

        let head: Option<(i64, String)> = conn
            .query_row(
                "SELECT id, url FROM queue WHERE domain = ?1 ORDER BY id ASC LIMIT 1",
                params![self.domain],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match head {
            Some((id, url)) => {
                conn.execute("DELETE FROM queue WHERE id = ?1", params![id])?;
                Ok(Some(url))
            }
            None => Ok(None),
        }
    }

    fn len(&self) -> QueueResult<usize> {
        let conn = lock(&self.conn, &self.domain)?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM queue WHERE domain = ?1",
            params![self.domain],
            |row| row.get(0),
        )?;
        usize::try_from(count).map_err(|e| QueueError::Backend(e.to_string()))
    }
}
