//! Page states reported back to the scheduler
//!
//! A claimed page starts `Discovered`, is marked `Queued` when the driver hands
//! it out, and the consumer moves it to one of the terminal states once the
//! fetch is done.

use std::fmt;

/// Lifecycle state of a page record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    /// Known but never handed out
    Discovered,
    /// Handed out to the consumer
    Queued,
    /// Being fetched by the consumer
    Fetching,

    /// Fetched and processed
    Processed,

    /// HTTP 404 or 410
    DeadLink,
    /// Connection, DNS, or TLS failure
    Unreachable,
    /// HTTP 429
    RateLimited,
    /// Any other failure
    Failed,
    /// Content type the consumer does not handle
    ContentMismatch,
}

/// Every state, in lifecycle order
const ALL: [PageState; 9] = [
    PageState::Discovered,
    PageState::Queued,
    PageState::Fetching,
    PageState::Processed,
    PageState::DeadLink,
    PageState::Unreachable,
    PageState::RateLimited,
    PageState::Failed,
    PageState::ContentMismatch,
];

impl PageState {
    /// Returns true once nothing further will happen to the page
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Returns true while the page is still moving through the pipeline
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Discovered | Self::Queued | Self::Fetching)
    }

    pub fn is_success(&self) -> bool {
        *self == Self::Processed
    }

    pub fn is_error(&self) -> bool {
        self.is_terminal() && !self.is_success()
    }

    /// Classifies the HTTP status code of a completed fetch
    ///
    /// The scheduler never fetches; consumers use this to pick the state they
    /// report back through `Scheduler::update`.
    pub fn from_status(code: u16) -> Self {
        match code {
            200..=299 => Self::Processed,
            404 | 410 => Self::DeadLink,
            429 => Self::RateLimited,
            _ => Self::Failed,
        }
    }

    /// Name under which the state is stored
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Queued => "queued",
            Self::Fetching => "fetching",
            Self::Processed => "processed",
            Self::DeadLink => "dead_link",
            Self::Unreachable => "unreachable",
            Self::RateLimited => "rate_limited",
            Self::Failed => "failed",
            Self::ContentMismatch => "content_mismatch",
        }
    }

    /// Parses a stored state name; `None` for names this version does not know
    pub fn from_db_string(s: &str) -> Option<Self> {
        Self::all_states().find(|state| state.to_db_string() == s)
    }

    /// Every state, in lifecycle order
    pub fn all_states() -> impl Iterator<Item = Self> {
        ALL.into_iter()
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}
