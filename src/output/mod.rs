//! Output module for reporting on stored crawl state
//!
//! This module handles:
//! - Loading page statistics from the page store
//! - Printing them for the `--stats` mode

pub mod stats;

pub use stats::{load_statistics, print_statistics, PageStatistics};
