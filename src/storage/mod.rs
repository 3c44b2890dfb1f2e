//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the scheduler, including:
//! - SQLite database initialization and schema management
//! - Loading and saving the configured domain policies
//! - Page record persistence keyed by URL
//! - Page statistics

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{PageStore, StorageError, StorageResult};

use crate::state::PageState;
use chrono::{DateTime, Utc};
use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// A page record, keyed by URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub url: String,
    pub state: PageState,
    pub title: Option<String>,
    pub status_code: Option<u16>,
    pub content_type: Option<String>,
    pub error_message: Option<String>,
    pub visit_count: u32,
    pub last_visited: Option<DateTime<Utc>>,
}

impl Page {
    /// Creates a placeholder page carrying only its URL
    ///
    /// This is what a consumer sees for a URL the store has never recorded.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state: PageState::Discovered,
            title: None,
            status_code: None,
            content_type: None,
            error_message: None,
            visit_count: 0,
            last_visited: None,
        }
    }

    /// Records one visit at `now`
    pub fn record_visit(&mut self, now: DateTime<Utc>) {
        self.visit_count += 1;
        self.last_visited = Some(now);
    }
}
