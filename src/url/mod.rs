//! URL handling module
//!
//! This module derives domain identities from URLs. The identity is what the
//! scheduler uses to route a URL to the queue of the domain it belongs to.

mod domain;

// Re-export main functions
pub use domain::{domain_key, extract_domain};
