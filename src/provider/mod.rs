//! Remote search API seam.
//!
//! This module defines the interface to the literature-search service and the
//! request type shared by every endpoint. The `SearchApi` trait abstracts the
//! transport so the fetchers and the controller can be exercised without a
//! network; [`http::HttpSearchApi`] is the production implementation.
//!
//! Endpoints consumed:
//!
//! - `GET /query`: one-term search
//! - `GET /query/advanced`: multi-term search
//! - `GET /query/summarize?pdf_link=<url>`: sectioned summary of one paper

pub mod http;

use async_trait::async_trait;
use thiserror::Error;
use url::{form_urlencoded, Url};

use crate::models::{SearchResponse, SummaryResponse};

/// Errors that can occur when talking to the search API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection, TLS or body transfer failure
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a non-2xx status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The body was not the JSON shape the endpoint promises
    #[error("Malformed response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// The request URL could not be built
    #[error("Invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// A remote endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// One-term search
    Query,
    /// Multi-term search
    AdvancedQuery,
    /// PDF summarization
    Summarize,
}

impl Endpoint {
    /// Path relative to the API base URL.
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Query => "query",
            Endpoint::AdvancedQuery => "query/advanced",
            Endpoint::Summarize => "query/summarize",
        }
    }
}

/// A GET request against one endpoint with ordered query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    /// Target endpoint
    pub endpoint: Endpoint,

    /// Query parameters in the order they are sent
    pub params: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            params: Vec::new(),
        }
    }

    /// Append a parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((name.into(), value.to_string()));
        self
    }

    /// URL-encoded parameters (spaces as `+`).
    pub fn query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.params.iter())
            .finish()
    }

    /// `/path?query`, independent of the base URL.
    pub fn path_and_query(&self) -> String {
        format!("/{}?{}", self.endpoint.path(), self.query_string())
    }

    /// Absolute URL below `base`.
    ///
    /// `base` is expected to end with `/` (see [`crate::config::parse_base_url`]).
    pub fn url(&self, base: &Url) -> ApiResult<Url> {
        let mut url = base.join(self.endpoint.path())?;
        url.set_query(Some(&self.query_string()));
        Ok(url)
    }
}

/// Trait for the remote literature-search service.
///
/// Implementations perform exactly one HTTP exchange per call and never
/// retry; retrying is always a new, user-initiated call.
#[async_trait]
pub trait SearchApi: Send + Sync {
    /// Run a search request (`/query` or `/query/advanced`).
    ///
    /// # Errors
    /// Returns `ApiError` on transport failure, non-2xx status or a body
    /// that does not decode.
    async fn search(&self, request: &ApiRequest) -> ApiResult<SearchResponse>;

    /// Run a summarization request (`/query/summarize`).
    ///
    /// # Errors
    /// Same as [`SearchApi::search`].
    async fn summarize(&self, request: &ApiRequest) -> ApiResult<SummaryResponse>;

    /// Human-readable name for logs.
    fn name(&self) -> &str;
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted in-memory `SearchApi` for tests.

    use super::*;
    use serde::de::DeserializeOwned;
    use serde_json::Value;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Clone)]
    enum Reply {
        Json(Value),
        Status(u16),
    }

    #[derive(Clone)]
    struct Route {
        needle: String,
        delay: Duration,
        reply: Reply,
    }

    /// Replies to the first route whose needle occurs in the request's
    /// `path_and_query`; unmatched requests get a 404.
    #[derive(Default)]
    pub struct MockSearchApi {
        routes: Mutex<Vec<Route>>,
        requests: Mutex<Vec<ApiRequest>>,
    }

    impl MockSearchApi {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(self, needle: &str, body: Value) -> Self {
            self.respond_after(needle, Duration::ZERO, body)
        }

        pub fn respond_after(self, needle: &str, delay: Duration, body: Value) -> Self {
            self.route(needle, delay, Reply::Json(body))
        }

        pub fn fail(self, needle: &str, status: u16) -> Self {
            self.route(needle, Duration::ZERO, Reply::Status(status))
        }

        pub fn fail_after(self, needle: &str, delay: Duration, status: u16) -> Self {
            self.route(needle, delay, Reply::Status(status))
        }

        fn route(self, needle: &str, delay: Duration, reply: Reply) -> Self {
            self.routes.lock().unwrap().push(Route {
                needle: needle.to_string(),
                delay,
                reply,
            });
            self
        }

        /// Every request seen so far, in arrival order.
        pub fn requests(&self) -> Vec<ApiRequest> {
            self.requests.lock().unwrap().clone()
        }

        async fn reply<T: DeserializeOwned>(&self, request: &ApiRequest) -> ApiResult<T> {
            self.requests.lock().unwrap().push(request.clone());
            let target = request.path_and_query();
            let route = self
                .routes
                .lock()
                .unwrap()
                .iter()
                .find(|r| target.contains(&r.needle))
                .cloned();

            let Some(route) = route else {
                return Err(ApiError::Status { status: 404, url: target });
            };
            if !route.delay.is_zero() {
                tokio::time::sleep(route.delay).await;
            }
            match route.reply {
                Reply::Json(body) => serde_json::from_value(body)
                    .map_err(|source| ApiError::Decode { url: target, source }),
                Reply::Status(status) => Err(ApiError::Status { status, url: target }),
            }
        }
    }

    #[async_trait]
    impl SearchApi for MockSearchApi {
        async fn search(&self, request: &ApiRequest) -> ApiResult<SearchResponse> {
            self.reply(request).await
        }

        async fn summarize(&self, request: &ApiRequest) -> ApiResult<SummaryResponse> {
            self.reply(request).await
        }

        fn name(&self) -> &str {
            "mock"
        }
    }
}
