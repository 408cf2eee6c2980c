//! Consumer-facing configuration values and their defaults.

use std::time::Duration;

use crate::{FeedError, model::StreamRequest};

/// Default per-request timeout enforced by the HTTP transport.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
/// Default delay between pull cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Default number of events requested per page.
pub const DEFAULT_PAGE_SIZE: u64 = 100;
/// Default distance between `fromBlock` and `toBlock` of a scan window.
pub const DEFAULT_WINDOW_SPAN: u64 = 10;
/// Default capacity of the batch channel handed to the consumer.
pub const DEFAULT_STREAM_BUFFER_CAPACITY: usize = 64;
/// Default interval between keepalive probes on a streaming connection.
pub const DEFAULT_PING_PERIOD: Duration = Duration::from_secs(30);
/// Default bound on the websocket opening handshake.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(45);

/// Where the cursor scanner learns the service's chain head from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChainHeadSource {
    /// Query the sibling `latestBlockNumber` endpoint before each fetch.
    #[default]
    Endpoint,
    /// Read `latestBlockNumber` from the page response itself.
    Inline,
}

/// Pull-mode configuration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub page_size: u64,
    pub window_span: u64,
    /// When set, the scanner waits for an acknowledgement after every batch.
    pub flow_control: bool,
    pub chain_head_source: ChainHeadSource,
}

impl ClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            page_size: DEFAULT_PAGE_SIZE,
            window_span: DEFAULT_WINDOW_SPAN,
            flow_control: false,
            chain_head_source: ChainHeadSource::default(),
        }
    }

    #[must_use]
    pub fn request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    #[must_use]
    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    #[must_use]
    pub fn page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub fn window_span(mut self, window_span: u64) -> Self {
        self.window_span = window_span;
        self
    }

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

    /// Checks the values that would otherwise make the scanner spin or stall.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), FeedError> {
        if self.page_size == 0 {
            return Err(FeedError::InvalidPageSize);
        }
        if self.window_span == 0 {
            return Err(FeedError::InvalidWindowSpan);
        }
        if self.poll_interval.is_zero() {
            return Err(FeedError::InvalidPollInterval);
        }
        Ok(())
    }
}

/// Whether a dropped streaming connection is re-established.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// A dropped connection stays closed.
    #[default]
    Disabled,
    /// Reconnect and resubscribe with exponential backoff, giving up after `max_attempts`
    /// consecutive failures. `max_attempts` must be greater than 0.
    Enabled { max_attempts: usize, min_delay: Duration },
}

/// Push-mode configuration.
#[derive(Clone, Debug)]
pub struct StreamConfig {
    pub url: String,
    /// Sent as the first frame after every successful handshake.
    pub request: StreamRequest,
    pub ping_period: Duration,
    pub handshake_timeout: Duration,
    pub reconnect: ReconnectPolicy,
}

impl StreamConfig {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            request: StreamRequest::default(),
            ping_period: DEFAULT_PING_PERIOD,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            reconnect: ReconnectPolicy::default(),
        }
    }

    #[must_use]
    pub fn request(mut self, request: StreamRequest) -> Self {
        self.request = request;
        self
    }

    #[must_use]
    pub fn ping_period(mut self, ping_period: Duration) -> Self {
        self.ping_period = ping_period;
        self
    }

    #[must_use]
    pub fn handshake_timeout(mut self, handshake_timeout: Duration) -> Self {
        self.handshake_timeout = handshake_timeout;
        self
    }

    #[must_use]
    pub fn reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// # Errors
    ///
    /// * [`FeedError::InvalidMaxAttempts`] - if reconnecting is enabled with no attempts.
    pub fn validate(&self) -> Result<(), FeedError> {
        if let ReconnectPolicy::Enabled { max_attempts: 0, .. } = self.reconnect {
            return Err(FeedError::InvalidMaxAttempts);
        }
        Ok(())
    }
}
