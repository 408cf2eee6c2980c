use std::time::Duration;

use crate::{
    FeedError,
    fetcher::{RetryPolicy, RetryingFetcher},
    transport::Transport,
};

/// Default number of attempts per request, the first one included.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
/// Default delay before the first retry; each further retry doubles it.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
/// Default upper bound on a single backoff sleep.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Builder for a [`RetryingFetcher`].
#[derive(Clone, Debug)]
pub struct RetryingFetcherBuilder<T: Transport> {
    transport: T,
    max_attempts: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T: Transport> RetryingFetcherBuilder<T> {
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }

    /// Single attempt, no backoff.
    #[must_use]
    pub fn fragile(transport: T) -> Self {
        Self::new(transport).max_attempts(1).base_delay(Duration::ZERO)
    }

    /// Sets the total number of attempts per request. Must be greater than 0.
    #[must_use]
    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the delay before the first retry.
    #[must_use]
    pub fn base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    #[must_use]
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// # Errors
    ///
    /// * [`FeedError::InvalidMaxAttempts`] - if `max_attempts` is 0.
    pub fn build(self) -> Result<RetryingFetcher<T>, FeedError> {
        if self.max_attempts == 0 {
            return Err(FeedError::InvalidMaxAttempts);
        }

        debug!(
            max_attempts = self.max_attempts,
            base_delay_ms = self.base_delay.as_millis(),
            "Building RetryingFetcher"
        );

        Ok(RetryingFetcher {
            transport: self.transport,
            max_attempts: self.max_attempts,
            base_delay: self.base_delay,
            max_delay: self.max_delay.max(self.base_delay),
            policy: RetryPolicy,
        })
    }
}
