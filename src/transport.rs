//! Request/response collaborator used by the [`RetryingFetcher`](crate::RetryingFetcher).
//!
//! The fetcher only needs two round trips: a `GET` for the chain head and a `POST` carrying an
//! encoded [`EventsRequest`](crate::EventsRequest). [`HttpTransport`] implements them on top of
//! `reqwest`; tests substitute scripted transports.

use std::{future::Future, time::Duration};

use reqwest::{
    Client, Url,
    header::{ACCEPT, CONTENT_TYPE},
};

use crate::{FeedError, config::DEFAULT_REQUEST_TIMEOUT};

/// Path of the paginated event query.
pub const EVENTS_PATH: &str = "/api/v1/event/list";
/// Path of the chain-head query.
pub const LATEST_BLOCK_NUMBER_PATH: &str = "/api/v1/event/latestBlockNumber";

/// Raw outcome of a single round trip.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    #[must_use]
    pub fn ok(body: impl Into<String>) -> Self {
        Self { status: 200, body: body.into() }
    }

    #[must_use]
    pub fn is_success_status(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A request/response channel to the indexing service.
///
/// Implementations perform exactly one round trip per call and never retry on their own;
/// per-request timeouts are theirs to enforce.
pub trait Transport: Send + Sync {
    fn get(&self, path: &str) -> impl Future<Output = Result<TransportResponse, FeedError>> + Send;

    fn post(
        &self,
        path: &str,
        body: String,
    ) -> impl Future<Output = Result<TransportResponse, FeedError>> + Send;
}

/// [`Transport`] backed by a pooled `reqwest` client.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    /// Creates a transport rooted at `base_url` with the default request timeout.
    ///
    /// # Errors
    ///
    /// * [`FeedError::InvalidUrl`] - if `base_url` cannot be parsed.
    /// * [`FeedError::Http`] - if the HTTP client cannot be constructed.
    pub fn new(base_url: &str) -> Result<Self, FeedError> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Creates a transport whose requests are bounded by `request_timeout`.
    ///
    /// # Errors
    ///
    /// Same as [`HttpTransport::new`].
    pub fn with_timeout(base_url: &str, request_timeout: Duration) -> Result<Self, FeedError> {
        let base_url =
            Url::parse(base_url).map_err(|e| FeedError::InvalidUrl(format!("{base_url}: {e}")))?;
        let client = Client::builder()
            .timeout(request_timeout)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;
        Ok(Self { client, base_url })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.as_str().trim_end_matches('/'))
    }

    async fn read(response: reqwest::Response) -> Result<TransportResponse, FeedError> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(TransportResponse { status, body })
    }
}

impl Transport for HttpTransport {
    async fn get(&self, path: &str) -> Result<TransportResponse, FeedError> {
        let url = self.url(path);
        trace!(url = %url, "GET");
        let response = self
            .client
            .get(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        Self::read(response).await
    }

    async fn post(&self, path: &str, body: String) -> Result<TransportResponse, FeedError> {
        let url = self.url(path);
        trace!(url = %url, "POST");
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(body)
            .send()
            .await?;
        Self::read(response).await
    }
}
