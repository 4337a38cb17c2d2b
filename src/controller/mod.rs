//! Search controller.
//!
//! The [`SearchController`] owns the current [`QueryState`], the result slice
//! and the summary slice of the view, and is the only thing that mutates them.
//! Every user intent is one controller operation:
//!
//! - [`set_search`](SearchController::set_search), [`set_page`](SearchController::set_page),
//!   [`set_sort`](SearchController::set_sort) and [`retry`](SearchController::retry)
//!   issue a result fetch;
//! - [`select_document`](SearchController::select_document) issues a summary fetch.
//!
//! Operations update the view synchronously (`Loading` / `Generating`) and
//! spawn the fetch on the Tokio runtime. Completed fetches come back over a
//! channel and are applied by [`next_update`](SearchController::next_update)
//! or [`settle`](SearchController::settle). Each slice carries its own
//! sequence counter: only the completion of the most recently issued
//! operation of that slice is applied, anything older is dropped on arrival.
//! Superseded operations are also cancelled, but correctness only relies on
//! the sequence check.
//!
//! # Example
//!
//! ```rust,no_run
//! use scholarly_search::{ClientConfig, QueryState, SearchController};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut controller = SearchController::from_config(ClientConfig::from_env()?)?;
//! controller.set_search(QueryState::parse("all=graph+neural+networks")?);
//! controller.settle().await;
//!
//! let view = controller.current_view();
//! if let Some(page) = view.result_phase.page() {
//!     for article in &page.items {
//!         println!("{}", article.title);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::fetch::{
    DocumentRef, FetchError, FetchResult, ResultFetcher, SummaryError, SummaryFetchResult,
    SummaryFetcher,
};
use crate::models::{page_count, ResultPage, SummaryResult, SummaryStatus};
use crate::provider::http::HttpSearchApi;
use crate::provider::{ApiResult, SearchApi};
use crate::query::{QueryError, QueryState, SortBy, SortOrder};

/// Errors returned by controller operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControllerError {
    /// The operation needs a search to act on
    #[error("No search has been started")]
    NoActiveSearch,

    /// The requested query change is invalid
    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Result type for controller operations.
pub type ControllerResult<T> = Result<T, ControllerError>;

/// State of the result slice.
#[derive(Debug, Clone)]
pub enum ResultPhase {
    /// No search issued yet
    Idle,
    /// A fetch is in flight; nothing from a previous query is shown
    Loading,
    /// A page with at least one article
    Loaded(ResultPage),
    /// The search succeeded but the page is empty; `total_count` is what the
    /// API reported (non-zero when the page lies past the last one)
    NoResults { total_count: u64 },
    /// The search failed
    Failed(Arc<FetchError>),
}

impl ResultPhase {
    /// The loaded page, if any.
    pub fn page(&self) -> Option<&ResultPage> {
        match self {
            ResultPhase::Loaded(page) => Some(page),
            _ => None,
        }
    }

    /// Total matches reported by the last applied page.
    pub fn total_count(&self) -> Option<u64> {
        match self {
            ResultPhase::Loaded(page) => Some(page.total_count),
            ResultPhase::NoResults { total_count } => Some(*total_count),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ResultPhase::Loading)
    }

    /// Short name for logs and status lines.
    pub fn name(&self) -> &'static str {
        match self {
            ResultPhase::Idle => "idle",
            ResultPhase::Loading => "loading",
            ResultPhase::Loaded(_) => "loaded",
            ResultPhase::NoResults { .. } => "no-results",
            ResultPhase::Failed(_) => "failed",
        }
    }
}

/// State of the summary slice.
#[derive(Debug, Clone)]
pub enum SummaryPhase {
    /// Nothing selected
    Ready,
    /// A summary for `title` is being generated
    Generating { title: String },
    /// The summary is available
    Done(SummaryResult),
    /// Summarizing `title` failed; no sections are kept
    Error {
        title: String,
        error: Arc<SummaryError>,
    },
}

impl SummaryPhase {
    /// Title of the document this phase refers to.
    pub fn title(&self) -> Option<&str> {
        match self {
            SummaryPhase::Ready => None,
            SummaryPhase::Generating { title } | SummaryPhase::Error { title, .. } => Some(title),
            SummaryPhase::Done(result) => Some(&result.document_title),
        }
    }

    pub fn status(&self) -> SummaryStatus {
        match self {
            SummaryPhase::Ready => SummaryStatus::Ready,
            SummaryPhase::Generating { .. } => SummaryStatus::Generating,
            SummaryPhase::Done(_) => SummaryStatus::Done,
            SummaryPhase::Error { .. } => SummaryStatus::Error,
        }
    }

    /// Sections of a finished summary; empty in every other phase.
    pub fn sections(&self) -> &[crate::models::SummarySection] {
        match self {
            SummaryPhase::Done(result) => &result.sections,
            _ => &[],
        }
    }
}

/// Pagination numbers for the pager control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBounds {
    /// Current 1-based page (0 before any search)
    pub current: u32,
    /// `ceil(total_count / page_size)`, 0 until a page has been applied
    pub page_count: u64,
    /// Total matches reported for the applied page
    pub total_count: u64,
    pub has_previous: bool,
    pub has_next: bool,
}

/// Everything the presentation layer needs to render the results view.
#[derive(Debug, Clone)]
pub struct SearchView {
    /// The effective query, `None` before the first search
    pub query: Option<QueryState>,
    pub result_phase: ResultPhase,
    pub summary_phase: SummaryPhase,
    pub bounds: PageBounds,
}

/// What happened to one completed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Update {
    /// The result slice changed
    ResultsApplied { seq: u64 },
    /// A superseded result fetch finished and was discarded
    ResultsDropped { seq: u64 },
    /// The summary slice changed
    SummaryApplied { seq: u64 },
    /// A superseded summary fetch finished and was discarded
    SummaryDropped { seq: u64 },
}

/// A finished fetch, tagged with the sequence number it was issued under.
enum Completion {
    Results {
        seq: u64,
        outcome: FetchResult<ResultPage>,
    },
    Summary {
        seq: u64,
        outcome: SummaryFetchResult<Option<SummaryResult>>,
    },
}

/// Orchestrates query changes, result fetches and summary fetches.
///
/// Operations that issue a fetch spawn it with `tokio::spawn` and therefore
/// must be called from within a Tokio runtime.
pub struct SearchController {
    /// Page size and other settings applied to every query
    config: ClientConfig,

    results: ResultFetcher,
    summaries: SummaryFetcher,

    query: Option<QueryState>,
    result_phase: ResultPhase,
    summary_phase: SummaryPhase,

    /// Sequence number of the latest issued result fetch
    result_seq: u64,
    /// Sequence number of the latest issued summary fetch
    summary_seq: u64,

    result_cancel: Option<CancellationToken>,
    summary_cancel: Option<CancellationToken>,

    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,

    /// Spawned fetches whose completion has not been received yet
    in_flight: usize,
}

impl SearchController {
    /// Create a controller over an arbitrary API implementation.
    pub fn new(config: ClientConfig, api: Arc<dyn SearchApi>) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            results: ResultFetcher::new(api.clone(), config.offset_base),
            summaries: SummaryFetcher::new(api),
            config,
            query: None,
            result_phase: ResultPhase::Idle,
            summary_phase: SummaryPhase::Ready,
            result_seq: 0,
            summary_seq: 0,
            result_cancel: None,
            summary_cancel: None,
            completions_tx,
            completions_rx,
            in_flight: 0,
        }
    }

    /// Create a controller talking HTTP to `config.base_url`.
    ///
    /// # Errors
    /// Returns `ApiError` if the HTTP client cannot be built.
    pub fn from_config(config: ClientConfig) -> ApiResult<Self> {
        let api = HttpSearchApi::new(&config)?;
        Ok(Self::new(config, Arc::new(api)))
    }

    /// Start a new search on page 1.
    ///
    /// This is a navigation into a fresh results view: the summary slice
    /// returns to `Ready` and any summary still in flight becomes stale.
    pub fn set_search(&mut self, state: QueryState) {
        self.reset_summary();
        self.issue_results(state.first_page());
    }

    /// Start a new search keeping the page carried by `state` (e.g. a
    /// shared link opened on page 4).
    pub fn set_search_preserving_page(&mut self, state: QueryState) {
        self.reset_summary();
        self.issue_results(state);
    }

    /// Move to page `n` of the current search. The summary slice is untouched.
    ///
    /// # Errors
    /// `ControllerError::Query(QueryError::InvalidPage)` when `n < 1`,
    /// `ControllerError::NoActiveSearch` before the first search.
    pub fn set_page(&mut self, n: i64) -> ControllerResult<()> {
        let next = self.active_query()?.with_page(n)?;
        self.issue_results(next);
        Ok(())
    }

    /// Change the sort of the current search, keeping its page.
    ///
    /// # Errors
    /// `ControllerError::NoActiveSearch` before the first search.
    pub fn set_sort(&mut self, sort_by: SortBy, sort_order: SortOrder) -> ControllerResult<()> {
        let next = self.active_query()?.with_sort(sort_by, sort_order);
        self.issue_results(next);
        Ok(())
    }

    /// Re-issue the fetch for the current query, e.g. after a failure.
    ///
    /// # Errors
    /// `ControllerError::NoActiveSearch` before the first search.
    pub fn retry(&mut self) -> ControllerResult<()> {
        let current = self.active_query()?.clone();
        self.issue_results(current);
        Ok(())
    }

    /// Request a summary of the document at `pdf_link`.
    ///
    /// The summary slice switches to `Generating { title }` before this
    /// returns. An empty link is ignored and `false` is returned.
    pub fn select_document(&mut self, pdf_link: &str, title: &str) -> bool {
        let document = DocumentRef::new(pdf_link, title);
        if !document.has_link() {
            debug!(title, "Ignoring summary request without a PDF link");
            return false;
        }

        let seq = self.supersede_summary();
        let cancel = CancellationToken::new();
        self.summary_cancel = Some(cancel.clone());
        self.summary_phase = SummaryPhase::Generating {
            title: document.title.clone(),
        };
        debug!(seq, title, "Issuing summary fetch");

        let fetcher = self.summaries.clone();
        let tx = self.completions_tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let outcome = fetcher.fetch(&document, cancel).await;
            // The receiver only goes away with the controller itself.
            let _ = tx.send(Completion::Summary { seq, outcome });
        });
        true
    }

    /// Return the summary slice to `Ready`, as when the results view mounts.
    pub fn reset_summary(&mut self) {
        self.supersede_summary();
        self.summary_phase = SummaryPhase::Ready;
    }

    /// Snapshot of everything the presentation layer renders.
    pub fn current_view(&self) -> SearchView {
        SearchView {
            query: self.query.clone(),
            result_phase: self.result_phase.clone(),
            summary_phase: self.summary_phase.clone(),
            bounds: self.bounds(),
        }
    }

    /// Shareable results-view link for the current query.
    pub fn share_link(&self) -> Option<String> {
        self.query
            .as_ref()
            .map(|q| format!("/search_result?{}", q.to_query_string()))
    }

    /// Number of fetches whose completion has not been processed yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Wait for the next fetch to complete and apply it.
    ///
    /// Returns `None` immediately when nothing is in flight.
    pub async fn next_update(&mut self) -> Option<Update> {
        if self.in_flight == 0 {
            return None;
        }
        let completion = self.completions_rx.recv().await?;
        self.in_flight -= 1;
        Some(self.apply(completion))
    }

    /// Process completions until nothing is in flight.
    pub async fn settle(&mut self) -> Vec<Update> {
        let mut updates = Vec::new();
        while let Some(update) = self.next_update().await {
            updates.push(update);
        }
        updates
    }

    fn active_query(&self) -> ControllerResult<&QueryState> {
        self.query.as_ref().ok_or(ControllerError::NoActiveSearch)
    }

    fn issue_results(&mut self, state: QueryState) {
        let state = state.with_page_size(self.config.page_size);

        if let Some(previous) = self.result_cancel.take() {
            previous.cancel();
        }
        self.result_seq += 1;
        let seq = self.result_seq;
        let cancel = CancellationToken::new();
        self.result_cancel = Some(cancel.clone());

        debug!(seq, query = %state, page = state.page(), "Issuing result fetch");
        self.query = Some(state.clone());
        self.result_phase = ResultPhase::Loading;

        let fetcher = self.results.clone();
        let tx = self.completions_tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let outcome = fetcher.fetch(&state, cancel).await;
            // The receiver only goes away with the controller itself.
            let _ = tx.send(Completion::Results { seq, outcome });
        });
    }

    /// Invalidate the current summary operation, returning the new sequence number.
    fn supersede_summary(&mut self) -> u64 {
        if let Some(previous) = self.summary_cancel.take() {
            previous.cancel();
        }
        self.summary_seq += 1;
        self.summary_seq
    }

    fn apply(&mut self, completion: Completion) -> Update {
        match completion {
            Completion::Results { seq, outcome } => {
                if seq != self.result_seq {
                    debug!(seq, latest = self.result_seq, "Dropping stale result page");
                    return Update::ResultsDropped { seq };
                }
                match outcome {
                    Ok(page) if page.is_empty() => {
                        info!(seq, total = page.total_count, "Result page is empty");
                        self.result_phase = ResultPhase::NoResults {
                            total_count: page.total_count,
                        };
                    }
                    Ok(page) => {
                        info!(seq, items = page.items.len(), total = page.total_count, "Result page loaded");
                        self.result_phase = ResultPhase::Loaded(page);
                    }
                    Err(FetchError::Cancelled) => {
                        // Only superseded fetches are cancelled, so this one is stale too.
                        return Update::ResultsDropped { seq };
                    }
                    Err(e) => {
                        warn!(seq, error = %e, "Result fetch failed");
                        self.result_phase = ResultPhase::Failed(Arc::new(e));
                    }
                }
                self.result_cancel = None;
                Update::ResultsApplied { seq }
            }
            Completion::Summary { seq, outcome } => {
                if seq != self.summary_seq {
                    debug!(seq, latest = self.summary_seq, "Dropping stale summary");
                    return Update::SummaryDropped { seq };
                }
                let title = self.summary_phase.title().unwrap_or_default().to_string();
                match outcome {
                    Ok(Some(result)) => {
                        info!(seq, title = %result.document_title, sections = result.sections.len(), "Summary ready");
                        self.summary_phase = SummaryPhase::Done(result);
                    }
                    Ok(None) => self.summary_phase = SummaryPhase::Ready,
                    Err(SummaryError::Cancelled) => return Update::SummaryDropped { seq },
                    Err(e) => {
                        warn!(seq, title = %title, error = %e, "Summary fetch failed");
                        self.summary_phase = SummaryPhase::Error {
                            title,
                            error: Arc::new(e),
                        };
                    }
                }
                self.summary_cancel = None;
                Update::SummaryApplied { seq }
            }
        }
    }

    fn bounds(&self) -> PageBounds {
        let current = self.query.as_ref().map(QueryState::page).unwrap_or(0);
        let total_count = self.result_phase.total_count().unwrap_or(0);
        let page_count = page_count(total_count, self.config.page_size);
        PageBounds {
            current,
            page_count,
            total_count,
            has_previous: current > 1,
            has_next: u64::from(current) < page_count,
        }
    }
}
