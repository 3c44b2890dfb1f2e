//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::state::{DomainPolicy, PageState};
use crate::storage::Page;
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Page not found: {0}")]
    PageNotFound(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for page store implementations
///
/// The scheduler shares its store with the consumer, so implementations
/// provide their own interior locking.
pub trait PageStore: Send + Sync {
    // ===== Domain Policies =====

    /// Loads every configured domain policy, in configuration order
    fn load_domains(&self) -> StorageResult<Vec<DomainPolicy>>;

    /// Replaces the stored domain policies with `domains`
    fn save_domains(&self, domains: &[DomainPolicy]) -> StorageResult<()>;

    // ===== Page Management =====

    /// Gets a page by URL
    ///
    /// # Returns
    ///
    /// * `Ok(Page)` - The stored page
    /// * `Err(StorageError::PageNotFound)` - No record exists for this URL
    /// * `Err(StorageError)` - The backend failed
    fn get_page(&self, url: &str) -> StorageResult<Page>;

    /// Inserts or replaces the record for `page.url`
    fn save_page(&self, page: &Page) -> StorageResult<()>;

    // ===== Statistics =====

    /// Gets total page count
    fn count_pages(&self) -> StorageResult<u64>;

    /// Counts pages by state
    fn count_pages_by_state(&self, state: PageState) -> StorageResult<u64>;

    /// Counts pages per domain identity
    fn count_pages_by_domain(&self) -> StorageResult<HashMap<String, u64>>;
}
