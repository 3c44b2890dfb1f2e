//! spider-scheduler: the scheduling core of a polite web crawler
//!
//! This crate decides, across many independently paced domains, which single
//! URL should be fetched next. Every configured domain gets a queue and a
//! background pacer; a single consumer claims URLs through [`Scheduler::next`],
//! fetches them elsewhere, and reports results back.

pub mod config;
pub mod crawler;
pub mod output;
pub mod queue;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for spider-scheduler operations
#[derive(Debug, Error)]
pub enum SpiderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Queue error: {0}")]
    Queue(#[from] queue::QueueError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] crawler::SchedulerError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for spider-scheduler operations
pub type Result<T> = std::result::Result<T, SpiderError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Claim, Scheduler, SchedulerError, StopHandle};
pub use state::{DomainPolicy, PageState};
pub use storage::Page;
pub use url::domain_key;
