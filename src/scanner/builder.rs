use std::{sync::Arc, time::Duration};

use crate::{
    FeedError,
    config::{
        ChainHeadSource, ClientConfig, DEFAULT_PAGE_SIZE, DEFAULT_POLL_INTERVAL,
        DEFAULT_STREAM_BUFFER_CAPACITY, DEFAULT_WINDOW_SPAN,
    },
    fetcher::RetryingFetcher,
    scanner::CursorScanner,
    transport::Transport,
};

/// Builder/configuration for the cursor scanner.
#[derive(Clone, Debug)]
pub struct CursorScannerBuilder {
    /// Number of events requested per page.
    pub page_size: u64,
    /// Distance between `from_block` and `to_block` of every window.
    pub window_span: u64,
    /// Delay between two fetch cycles.
    pub poll_interval: Duration,
    /// Wait for an acknowledgement after every delivered batch.
    pub flow_control: bool,
    pub chain_head_source: ChainHeadSource,
    pub buffer_capacity: usize,
}

impl Default for CursorScannerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CursorScannerBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            window_span: DEFAULT_WINDOW_SPAN,
            poll_interval: DEFAULT_POLL_INTERVAL,
            flow_control: false,
            chain_head_source: ChainHeadSource::default(),
            buffer_capacity: DEFAULT_STREAM_BUFFER_CAPACITY,
        }
    }

    /// Takes the scanning settings of a pull-mode configuration.
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new()
            .page_size(config.page_size)
            .window_span(config.window_span)
            .poll_interval(config.poll_interval)
            .flow_control(config.flow_control)
            .chain_head_source(config.chain_head_source)
    }

    /// Must be greater than 0.
    #[must_use]
    pub fn page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    /// Must be greater than 0.
    #[must_use]
    pub fn window_span(mut self, window_span: u64) -> Self {
        self.window_span = window_span;
        self
    }

    #[must_use]
    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Enables cooperative backpressure.
    ///
    /// The scanner then delivers one batch and parks until it is acknowledged through
    /// [`EventSubscription::ack`](crate::EventSubscription::ack).
    #[must_use]
    pub fn flow_control(mut self, enabled: bool) -> Self {
        self.flow_control = enabled;
        self
    }

    #[must_use]
    pub fn chain_head_source(mut self, source: ChainHeadSource) -> Self {
        self.chain_head_source = source;
        self
    }

    /// Sets the number of batches (and reported errors) buffered for the consumer.
    #[must_use]
    pub fn buffer_capacity(mut self, buffer_capacity: usize) -> Self {
        self.buffer_capacity = buffer_capacity;
        self
    }

    /// Binds the scanner to a fetcher.
    ///
    /// # Errors
    ///
    /// Returns the matching `Invalid*` variant if page size, window span, poll interval or buffer
    /// capacity is 0.
    pub fn connect<T: Transport>(
        self,
        fetcher: RetryingFetcher<T>,
    ) -> Result<CursorScanner<T>, FeedError> {
        if self.page_size == 0 {
            return Err(FeedError::InvalidPageSize);
        }
        if self.window_span == 0 {
            return Err(FeedError::InvalidWindowSpan);
        }
        if self.poll_interval.is_zero() {
            return Err(FeedError::InvalidPollInterval);
        }
        if self.buffer_capacity == 0 {
            return Err(FeedError::InvalidBufferCapacity);
        }
        Ok(CursorScanner { fetcher: Arc::new(fetcher), config: self })
    }
}
