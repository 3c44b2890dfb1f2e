//! Configuration module
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use spider_scheduler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("spider.toml")).unwrap();
//! println!("Configured domains: {}", config.domains.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, DomainEntry, QueueBackend, QueueConfig, SchedulerConfig, StorageConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
