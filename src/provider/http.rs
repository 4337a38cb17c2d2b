//! HTTP implementation of the search API.
//!
//! Uses a shared `reqwest` client. Response bodies are read fully and decoded
//! with `serde_json` so that decode failures are reported separately from
//! transport failures.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::{ApiError, ApiRequest, ApiResult, SearchApi};
use crate::config::ClientConfig;
use crate::models::{SearchResponse, SummaryResponse};

/// `SearchApi` backed by HTTP.
#[derive(Debug, Clone)]
pub struct HttpSearchApi {
    /// Shared connection pool
    http: Client,

    /// Base URL, always ending in `/`
    base: Url,
}

impl HttpSearchApi {
    /// Create a client from the configuration.
    ///
    /// # Errors
    /// Returns `ApiError::Network` if the underlying client cannot be built
    /// (for example when no TLS backend is available).
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base: config.base_url.clone(),
        })
    }

    /// The base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    async fn get_json<T: DeserializeOwned>(&self, request: &ApiRequest) -> ApiResult<T> {
        let url = request.url(&self.base)?;
        debug!(%url, "GET");

        let response = self
            .http
            .get(url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl SearchApi for HttpSearchApi {
    async fn search(&self, request: &ApiRequest) -> ApiResult<SearchResponse> {
        self.get_json(request).await
    }

    async fn summarize(&self, request: &ApiRequest) -> ApiResult<SummaryResponse> {
        self.get_json(request).await
    }

    fn name(&self) -> &str {
        self.base.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Endpoint;

    #[test]
    fn test_requests_resolve_below_configured_base() {
        let config = ClientConfig::with_base_url("https://search.example.org/v1").unwrap();
        let api = HttpSearchApi::new(&config).unwrap();
        assert_eq!(api.name(), "https://search.example.org/v1/");

        let request = ApiRequest::new(Endpoint::AdvancedQuery)
            .param("title", "a b")
            .param("boolean_operator", "OR")
            .param("author", "c");
        assert_eq!(
            request.url(api.base_url()).unwrap().as_str(),
            "https://search.example.org/v1/query/advanced?title=a+b&boolean_operator=OR&author=c"
        );
    }

    #[tokio::test]
    async fn test_connection_failure_is_network_error() {
        // Port 9 (discard) on localhost is not expected to accept HTTP.
        let config = ClientConfig::with_base_url("http://127.0.0.1:9").unwrap();
        let api = HttpSearchApi::new(&config).unwrap();

        let request = ApiRequest::new(Endpoint::Query).param("all", "x");
        let err = api.search(&request).await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)), "unexpected error: {err}");
    }
}
