use crate::FeedError;

/// What to do with a failed attempt.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    Terminal,
}

/// Classifies fetch failures as retryable or terminal.
///
/// Transport failures, timeouts and undecodable bodies are always retried. Application codes
/// are retried only when they fall in the allow-list: any `5xx`, plus `429`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RetryPolicy;

impl RetryPolicy {
    #[must_use]
    pub fn classify(self, error: &FeedError) -> RetryDecision {
        match error {
            FeedError::Http(_) | FeedError::Transport(_) | FeedError::Timeout | FeedError::Decode(_) => {
                RetryDecision::Retry
            }
            FeedError::Api { code, .. } if Self::is_retryable_code(*code) => RetryDecision::Retry,
            _ => RetryDecision::Terminal,
        }
    }

    #[must_use]
    pub fn is_retryable(self, error: &FeedError) -> bool {
        self.classify(error) == RetryDecision::Retry
    }

    /// `5xx` covers 503 and 504.
    #[must_use]
    pub fn is_retryable_code(code: i64) -> bool {
        (500..600).contains(&code) || code == 429
    }
}
