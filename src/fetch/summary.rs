//! Per-document summary retrieval.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{SummaryError, SummaryFetchResult};
use crate::models::SummaryResult;
use crate::provider::{ApiRequest, Endpoint, SearchApi};

/// The document a summary is requested for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    /// PDF link the summarizer downloads
    pub pdf_link: String,

    /// Title shown while and after summarizing
    pub title: String,
}

impl DocumentRef {
    pub fn new(pdf_link: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            pdf_link: pdf_link.into(),
            title: title.into(),
        }
    }

    /// Whether there is anything to summarize.
    pub fn has_link(&self) -> bool {
        !self.pdf_link.trim().is_empty()
    }
}

/// Retrieves one summary per call.
#[derive(Clone)]
pub struct SummaryFetcher {
    api: Arc<dyn SearchApi>,
}

impl SummaryFetcher {
    pub fn new(api: Arc<dyn SearchApi>) -> Self {
        Self { api }
    }

    /// The request a fetch for `pdf_link` sends.
    pub fn request_for(pdf_link: &str) -> ApiRequest {
        ApiRequest::new(Endpoint::Summarize).param("pdf_link", pdf_link.trim())
    }

    /// Summarize `document`.
    ///
    /// Returns `Ok(None)` without contacting the API when the document has
    /// no PDF link.
    ///
    /// # Errors
    /// `SummaryError::Api` when the call fails, `SummaryError::Cancelled`
    /// when the token fired first.
    pub async fn fetch(
        &self,
        document: &DocumentRef,
        cancel: CancellationToken,
    ) -> SummaryFetchResult<Option<SummaryResult>> {
        if !document.has_link() {
            return Ok(None);
        }

        let request = Self::request_for(&document.pdf_link);
        debug!(api = self.api.name(), title = %document.title, "Requesting summary");

        let response = tokio::select! {
            biased;

            _ = cancel.cancelled() => return Err(SummaryError::Cancelled),
            response = self.api.summarize(&request) => response?,
        };

        Ok(Some(SummaryResult::done(document.title.clone(), response.summary)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SummarySection, SummaryStatus};
    use crate::provider::mock::MockSearchApi;
    use serde_json::json;

    #[tokio::test]
    async fn test_empty_link_is_noop() {
        let api = Arc::new(MockSearchApi::new());
        let fetcher = SummaryFetcher::new(api.clone());

        let result = fetcher
            .fetch(&DocumentRef::new("  ", "No PDF"), CancellationToken::new())
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(api.requests().is_empty());
    }

    #[tokio::test]
    async fn test_summary_sections() {
        let api = Arc::new(MockSearchApi::new().respond(
            "/query/summarize?pdf_link=http%3A%2F%2Fx%2Fa.pdf",
            json!({ "summary": [
                { "header": "Introduction", "summary": "Why." },
                { "header": "Results", "summary": "**What.**" }
            ]}),
        ));
        let fetcher = SummaryFetcher::new(api);

        let result = fetcher
            .fetch(&DocumentRef::new("http://x/a.pdf", "Paper A"), CancellationToken::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result.document_title, "Paper A");
        assert_eq!(result.status, SummaryStatus::Done);
        assert_eq!(
            result.sections[1],
            SummarySection {
                header: "Results".to_string(),
                body: "**What.**".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_summary_failure() {
        let api = Arc::new(MockSearchApi::new().fail("/query/summarize", 500));
        let fetcher = SummaryFetcher::new(api);

        let err = fetcher
            .fetch(&DocumentRef::new("http://x/a.pdf", "Paper A"), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SummaryError::Api(_)));
    }
}
