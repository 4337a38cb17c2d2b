//! Single-shot retrieval operations.
//!
//! A [`ResultFetcher`] turns a [`QueryState`](crate::query::QueryState) into one
//! request against the search endpoints and one [`ResultPage`](crate::models::ResultPage);
//! a [`SummaryFetcher`] does the same for the summarization endpoint. Both
//! honour a `CancellationToken` and neither ever retries. They are independent:
//! cancelling one never affects the other.

pub mod results;
pub mod summary;

pub use results::ResultFetcher;
pub use summary::{DocumentRef, SummaryFetcher};

use thiserror::Error;

use crate::provider::ApiError;

/// Errors that can occur while retrieving a result page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The API call failed; the cause is kept as the error source
    #[error("Search request failed: {0}")]
    Api(#[from] ApiError),

    /// The operation was cancelled before the response arrived
    #[error("Search request was cancelled")]
    Cancelled,
}

/// Result type for result retrieval.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors that can occur while retrieving a summary.
#[derive(Debug, Error)]
pub enum SummaryError {
    /// The API call failed; the cause is kept as the error source
    #[error("Summarization failed: {0}")]
    Api(#[from] ApiError),

    /// The operation was cancelled before the response arrived
    #[error("Summarization was cancelled")]
    Cancelled,
}

/// Result type for summary retrieval.
pub type SummaryFetchResult<T> = Result<T, SummaryError>;
