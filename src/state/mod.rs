//! State module for crawl targets and crawl progress
//!
//! # Components
//!
//! - `DomainPolicy`: Per-domain pacing policy (base URL, fetch delay, start points)
//! - `PageState`: Tracks the state of individual pages (discovered, fetching, processed, etc.)

mod domain_policy;
mod page_state;

// Re-export main types
pub use domain_policy::DomainPolicy;
pub use page_state::PageState;
