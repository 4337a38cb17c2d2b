//! Result page retrieval.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{FetchError, FetchResult};
use crate::config::OffsetBase;
use crate::models::ResultPage;
use crate::provider::{ApiRequest, Endpoint, SearchApi};
use crate::query::{QueryState, SearchMode};

/// Retrieves one result page per call.
#[derive(Clone)]
pub struct ResultFetcher {
    /// Remote search service
    api: Arc<dyn SearchApi>,

    /// Whether the remote `start` parameter counts from 0 or 1
    offset_base: OffsetBase,
}

impl ResultFetcher {
    pub fn new(api: Arc<dyn SearchApi>, offset_base: OffsetBase) -> Self {
        Self { api, offset_base }
    }

    /// Endpoint for a query; a pure function of its mode.
    pub fn endpoint_for(state: &QueryState) -> Endpoint {
        match state.mode() {
            SearchMode::Simple => Endpoint::Query,
            SearchMode::Advanced => Endpoint::AdvancedQuery,
        }
    }

    /// Remote `start` for the query's page.
    pub fn offset_for(&self, state: &QueryState) -> u64 {
        self.offset_base.start_for(state.page(), state.page_size())
    }

    /// The request a fetch for `state` sends.
    ///
    /// Parameter order: primary term, then `boolean_operator` and the
    /// secondary term when present, then `sort_by`, `sort_order`, `start`,
    /// `max_results`.
    pub fn request_for(&self, state: &QueryState) -> ApiRequest {
        let primary = state.primary();
        let mut request = ApiRequest::new(Self::endpoint_for(state))
            .param(primary.prefix.as_str(), &primary.keyword);

        if let Some((operator, term)) = state.secondary() {
            request = request
                .param("boolean_operator", operator.as_str())
                .param(term.prefix.as_str(), &term.keyword);
        }

        request
            .param("sort_by", state.sort_by().as_str())
            .param("sort_order", state.sort_order().as_str())
            .param("start", self.offset_for(state))
            .param("max_results", state.page_size())
    }

    /// Fetch the page described by `state`.
    ///
    /// Suspends until the API call settles or `cancel` fires. A response
    /// carrying a single article is normalized into a one-element page.
    ///
    /// # Errors
    /// `FetchError::Api` on network, status or decode failure;
    /// `FetchError::Cancelled` when the token fired first.
    pub async fn fetch(&self, state: &QueryState, cancel: CancellationToken) -> FetchResult<ResultPage> {
        let request = self.request_for(state);
        debug!(api = self.api.name(), request = %request.path_and_query(), "Fetching result page");

        let response = tokio::select! {
            biased;

            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            response = self.api.search(&request) => response?,
        };

        let (items, total_count) = response.into_parts();
        Ok(ResultPage {
            items,
            total_count,
            offset: self.offset_for(state),
            page_size: state.page_size(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockSearchApi;
    use crate::provider::ApiError;
    use crate::query::{Prefix, QueryField, SortBy, SortOrder};
    use serde_json::json;

    fn fetcher(api: MockSearchApi, offset_base: OffsetBase) -> (Arc<MockSearchApi>, ResultFetcher) {
        let api = Arc::new(api);
        let fetcher = ResultFetcher::new(api.clone(), offset_base);
        (api, fetcher)
    }

    #[test]
    fn test_simple_request_shape() {
        let (_, fetcher) = fetcher(MockSearchApi::new(), OffsetBase::Zero);
        let state = QueryState::simple("graph neural networks").unwrap();

        assert_eq!(
            fetcher.request_for(&state).path_and_query(),
            "/query?all=graph+neural+networks&sort_by=relevance&sort_order=descending&start=0&max_results=5"
        );
    }

    #[test]
    fn test_advanced_request_shape() {
        let (_, fetcher) = fetcher(MockSearchApi::new(), OffsetBase::Zero);
        let state = QueryState::parse("title=attention&boolean_operator=OR&author=vaswani&page=3")
            .unwrap()
            .with_sort(SortBy::SubmittedDate, SortOrder::Ascending);

        assert_eq!(
            fetcher.request_for(&state).path_and_query(),
            "/query/advanced?title=attention&boolean_operator=OR&author=vaswani\
             &sort_by=submittedDate&sort_order=ascending&start=10&max_results=5"
        );
    }

    #[test]
    fn test_endpoint_follows_mode_not_parameter_count() {
        // Five URL parameters, but only one `all` term: still the simple endpoint.
        let state = QueryState::parse("all=x&sort_by=relevance&sort_order=ascending&start=0&max_results=5").unwrap();
        assert_eq!(ResultFetcher::endpoint_for(&state), Endpoint::Query);

        let state = state.with_field(QueryField::PrimaryPrefix(Prefix::Author)).unwrap();
        assert_eq!(ResultFetcher::endpoint_for(&state), Endpoint::AdvancedQuery);
    }

    #[test]
    fn test_single_field_term_uses_advanced_endpoint() {
        let (_, fetcher) = fetcher(MockSearchApi::new(), OffsetBase::Zero);
        let state = QueryState::parse("title=attention").unwrap();

        assert_eq!(
            fetcher.request_for(&state).path_and_query(),
            "/query/advanced?title=attention&sort_by=relevance&sort_order=descending&start=0&max_results=5"
        );
    }

    #[test]
    fn test_one_based_offset() {
        let (_, fetcher) = fetcher(MockSearchApi::new(), OffsetBase::One);
        let state = QueryState::simple("x").unwrap().with_page(2).unwrap();
        assert_eq!(fetcher.offset_for(&state), 6);
        assert!(fetcher.request_for(&state).path_and_query().contains("&start=6&"));
    }

    #[tokio::test]
    async fn test_fetch_normalizes_single_object() {
        let (api, fetcher) = fetcher(
            MockSearchApi::new().respond(
                "/query?",
                json!({ "arxiv": { "id": "http://arxiv.org/abs/1", "title": "Alone" }, "totalResults": 1 }),
            ),
            OffsetBase::Zero,
        );
        let state = QueryState::simple("alone").unwrap();

        let page = fetcher.fetch(&state, CancellationToken::new()).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total_count, 1);
        assert_eq!(page.offset, 0);
        assert_eq!(page.page_size, 5);
        assert_eq!(api.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_empty_result_is_not_an_error() {
        let (_, fetcher) = fetcher(
            MockSearchApi::new().respond("/query?", json!({ "arxiv": [], "totalResults": 0 })),
            OffsetBase::Zero,
        );
        let page = fetcher
            .fetch(&QueryState::simple("nothing").unwrap(), CancellationToken::new())
            .await
            .unwrap();
        assert!(page.is_empty());
        assert_eq!(page.page_count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_error_keeps_cause() {
        let (api, fetcher) = fetcher(MockSearchApi::new().fail("/query?", 502), OffsetBase::Zero);
        let err = fetcher
            .fetch(&QueryState::simple("x").unwrap(), CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Api(ApiError::Status { status: 502, .. })));
        assert!(std::error::Error::source(&err).is_some());
        // No automatic retry.
        assert_eq!(api.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_cancelled() {
        let (_, fetcher) = fetcher(
            MockSearchApi::new().respond_after(
                "/query?",
                std::time::Duration::from_secs(10),
                json!({ "arxiv": [] }),
            ),
            OffsetBase::Zero,
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let err = fetcher
            .fetch(&QueryState::simple("slow").unwrap(), cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Cancelled));
    }
}
