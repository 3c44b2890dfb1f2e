//! Crawler module for URL scheduling
//!
//! This module contains the core scheduling logic, including:
//! - Per-domain pacer tasks and reseeding
//! - The scheduler that turns readiness signals into claimed URLs
//! - The coordinator that drives the scheduler for the CLI

mod coordinator;
mod pacer;
mod scheduler;

pub use coordinator::{run_schedule, Coordinator, RunSummary};
pub use scheduler::{Claim, Scheduler, SchedulerError, StopHandle};
