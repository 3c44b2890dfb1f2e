//! Statistics generation from the page store
//!
//! This module provides functionality for extracting and displaying
//! page statistics from the storage layer.

use crate::state::PageState;
use crate::storage::PageStore;
use crate::SpiderError;
use std::collections::HashMap;

/// Page statistics summary
#[derive(Debug, Clone)]
pub struct PageStatistics {
    /// Total number of page records
    pub total_pages: u64,

    /// Count of pages by state
    pub pages_by_state: HashMap<PageState, u64>,

    /// Count of pages by domain identity
    pub pages_by_domain: HashMap<String, u64>,

    /// Number of configured domains
    pub configured_domains: u64,
}

impl PageStatistics {
    /// Total pages in an error state
    pub fn error_count(&self) -> u64 {
        self.pages_by_state
            .iter()
            .filter(|(state, _)| state.is_error())
            .map(|(_, count)| count)
            .sum()
    }

    /// Percentage of pages successfully processed
    pub fn success_rate(&self) -> f64 {
        let processed = self
            .pages_by_state
            .get(&PageState::Processed)
            .copied()
            .unwrap_or(0);
        percentage(processed, self.total_pages)
    }
}

fn percentage(count: u64, total: u64) -> f64 {
    if total > 0 {
        (count as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(PageStatistics)` - Successfully loaded statistics
/// * `Err(SpiderError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn PageStore) -> Result<PageStatistics, SpiderError> {
    let total_pages = storage.count_pages()?;
    let pages_by_domain = storage.count_pages_by_domain()?;
    let configured_domains = storage.load_domains()?.len() as u64;

    let mut pages_by_state = HashMap::new();
    for state in PageState::all_states() {
        let count = storage.count_pages_by_state(state)?;
        if count > 0 {
            pages_by_state.insert(state, count);
        }
    }

    Ok(PageStatistics {
        total_pages,
        pages_by_state,
        pages_by_domain,
        configured_domains,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &PageStatistics) {
    println!("=== Page Statistics ===\n");

    println!("Overview:");
    println!("  Configured domains: {}", stats.configured_domains);
    println!("  Total pages recorded: {}", stats.total_pages);
    println!("  Pages in error states: {}", stats.error_count());
    println!();

    println!("Pages by State:");
    let mut state_counts: Vec<_> = stats.pages_by_state.iter().collect();
    state_counts.sort_by(|a, b| b.1.cmp(a.1));

    for (state, count) in state_counts {
        println!(
            "  {}: {} ({:.1}%)",
            state,
            count,
            percentage(*count, stats.total_pages)
        );
    }
    println!();

    if !stats.pages_by_domain.is_empty() {
        println!("Pages by Domain ({}):", stats.pages_by_domain.len());
        let mut domain_counts: Vec<_> = stats.pages_by_domain.iter().collect();
        domain_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        for (domain, count) in domain_counts {
            println!("  - {}: {}", domain, count);
        }
        println!();
    }

    let processed = stats
        .pages_by_state
        .get(&PageState::Processed)
        .unwrap_or(&0);

    println!(
        "Success Rate: {:.1}% ({} / {} pages successfully processed)",
        stats.success_rate(),
        processed,
        stats.total_pages
    );
}
