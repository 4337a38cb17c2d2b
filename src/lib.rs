//! Scholarly Search - a client for a remote literature-search service.
//!
//! This library keeps a search query in sync with a shareable URL, retrieves
//! paginated result lists, and requests per-document summaries, making sure
//! that only the most recent request of each kind ever reaches the view.
//!
//! # Architecture
//!
//! The system is organized into several key modules:
//!
//! - **query**: The canonical search state and its query-string codec
//! - **models**: Wire formats and normalized data (articles, pages, summaries)
//! - **config**: Client settings (API URL, page size, offset convention)
//! - **provider**: The `SearchApi` seam and its HTTP implementation
//! - **fetch**: Single-shot result and summary retrieval
//! - **controller**: Orchestration with last-writer-wins ordering
//!
//! # Workflow
//!
//! 1. Build a [`QueryState`] from a shared link or from form input
//! 2. Hand it to the [`SearchController`], which flips the view to loading
//! 3. The controller fetches the page from `/query` or `/query/advanced`
//! 4. Completions of superseded operations are discarded on arrival
//! 5. Selecting a document fetches its summary from `/query/summarize`
//!
//! # Example
//!
//! ```ignore
//! use scholarly_search::{ClientConfig, QueryState, SearchController};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut controller = SearchController::from_config(ClientConfig::from_env()?)?;
//!
//!     // Open a shared link
//!     let state = QueryState::parse("title=attention&boolean_operator=AND&author=vaswani&page=2")?;
//!     controller.set_search_preserving_page(state);
//!     controller.settle().await;
//!
//!     // Summarize the first hit
//!     let view = controller.current_view();
//!     if let Some(article) = view.result_phase.page().and_then(|p| p.items.first()) {
//!         let pdf_link = article.pdf_link.as_deref().unwrap_or_default();
//!         controller.select_document(pdf_link, &article.title);
//!         controller.settle().await;
//!     }
//!
//!     Ok(())
//! }
//! ```

// Public modules
pub mod config;
pub mod controller;
pub mod fetch;
pub mod models;
pub mod provider;
pub mod query;

// Re-export commonly used types at the crate root
pub use config::{ClientConfig, OffsetBase};
pub use controller::{ResultPhase, SearchController, SearchView, SummaryPhase, Update};
pub use fetch::{ResultFetcher, SummaryFetcher};
pub use models::{ArticleSummary, ResultPage, SummaryResult, SummarySection, SummaryStatus};
pub use provider::SearchApi;
pub use query::{BooleanOperator, Prefix, QueryState, SearchMode, SortBy, SortOrder};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Results per page unless configured otherwise
pub use query::DEFAULT_PAGE_SIZE;
