use thiserror::Error;

/// Failure to retrieve one page from the remote source.
///
/// Never retried internally; callers decide whether to abort or carry on.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid page index {0}: pages are 1-based")]
    InvalidPage(usize),

    #[error("Request for page {page} timed out")]
    Timeout { page: usize },

    #[error("Network error fetching page {page}: {message}")]
    Network { page: usize, message: String },

    #[error("HTTP {status} fetching page {page}")]
    Status { page: usize, status: u16 },

    #[error("Malformed response for page {page}: {message}")]
    Malformed { page: usize, message: String },

    #[error("Page {page} unavailable: {message}")]
    Unavailable { page: usize, message: String },
}

/// Rejected "select first N" input. Raised at the control boundary only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidInputError {
    #[error("Not a number: {0:?}")]
    NotNumeric(String),

    #[error("Row count must be positive, got {0}")]
    NotPositive(i64),
}

