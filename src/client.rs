//! Pull-mode facade over transport, fetcher and scanner.

use alloy::primitives::BlockNumber;

use crate::{
    FeedError,
    config::ClientConfig,
    fetcher::{RetryingFetcher, RetryingFetcherBuilder},
    model::{EventsRequest, Page, SubscribeRequest},
    scanner::{CursorScanner, CursorScannerBuilder, EventSubscription},
    transport::{HttpTransport, Transport},
};

/// Pull-mode client for the indexing service.
///
/// Single queries go straight through the [`RetryingFetcher`]; [`subscribe_events`] starts a
/// [`CursorScanner`] configured from the same [`ClientConfig`].
///
/// [`subscribe_events`]: EventsClient::subscribe_events
#[derive(Debug)]
pub struct EventsClient<T = HttpTransport> {
    scanner: CursorScanner<T>,
}

impl EventsClient<HttpTransport> {
    /// Builds an HTTP client from `config`.
    ///
    /// # Errors
    ///
    /// * [`FeedError::InvalidUrl`] - if the base URL cannot be parsed.
    /// * [`FeedError::InvalidPageSize`], [`FeedError::InvalidWindowSpan`],
    ///   [`FeedError::InvalidPollInterval`] - for degenerate scan settings.
    pub fn new(config: ClientConfig) -> Result<Self, FeedError> {
        config.validate()?;
        let transport = HttpTransport::with_timeout(&config.base_url, config.request_timeout)?;
        Self::with_fetcher(&config, RetryingFetcherBuilder::new(transport).build()?)
    }
}

impl<T: Transport + 'static> EventsClient<T> {
    /// Builds a client around an already configured fetcher, e.g. one with a custom transport or
    /// retry budget.
    ///
    /// # Errors
    ///
    /// Returns the matching `Invalid*` variant for degenerate scan settings.
    pub fn with_fetcher(config: &ClientConfig, fetcher: RetryingFetcher<T>) -> Result<Self, FeedError> {
        let scanner = CursorScannerBuilder::from_config(config).connect(fetcher)?;
        Ok(Self { scanner })
    }

    #[must_use]
    pub fn fetcher(&self) -> &RetryingFetcher<T> {
        self.scanner.fetcher()
    }

    /// The most recent block number the service has indexed.
    ///
    /// # Errors
    ///
    /// As [`RetryingFetcher::latest_block_number`].
    pub async fn latest_block_number(&self) -> Result<BlockNumber, FeedError> {
        self.fetcher().latest_block_number().await
    }

    /// One page of events for an explicit window.
    ///
    /// # Errors
    ///
    /// As [`RetryingFetcher::fetch_events`].
    pub async fn get_events(&self, request: &EventsRequest) -> Result<Page, FeedError> {
        self.fetcher().fetch_events(request).await
    }

    /// Starts an incremental scan from `request.from_block`.
    ///
    /// # Errors
    ///
    /// As [`CursorScanner::subscribe`].
    pub fn subscribe_events(&self, request: SubscribeRequest) -> Result<EventSubscription, FeedError> {
        self.scanner.subscribe(request)
    }
}
