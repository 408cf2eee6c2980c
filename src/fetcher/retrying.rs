use std::{
    future::Future,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use alloy::primitives::BlockNumber;
use backon::{ExponentialBuilder, Retryable};
use serde::de::DeserializeOwned;

use crate::{
    FeedError,
    fetcher::RetryPolicy,
    model::{ApiResponse, EventsRequest, LatestBlockNumber, Page},
    transport::{EVENTS_PATH, LATEST_BLOCK_NUMBER_PATH, Transport, TransportResponse},
};

/// Wraps single round trips with bounded retry and backoff.
///
/// Stateless across calls: it knows nothing about cursors, windows or pages beyond the request
/// it is handed.
#[derive(Clone, Debug)]
pub struct RetryingFetcher<T> {
    pub(crate) transport: T,
    pub(crate) max_attempts: usize,
    pub(crate) base_delay: Duration,
    pub(crate) max_delay: Duration,
    pub(crate) policy: RetryPolicy,
}

impl<T: Transport> RetryingFetcher<T> {
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[must_use]
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Fetches the most recent block number the service has indexed.
    ///
    /// # Errors
    ///
    /// See [retry errors](#retry-errors). A success envelope without `data` is reported as
    /// [`FeedError::Decode`].
    pub async fn latest_block_number(&self) -> Result<BlockNumber, FeedError> {
        debug!("latestBlockNumber called");
        let result = self
            .call::<LatestBlockNumber, _, _>(|| self.transport.get(LATEST_BLOCK_NUMBER_PATH))
            .await;
        if let Err(e) = &result {
            error!(error = %e, "latestBlockNumber failed");
        }
        result?
            .map(|latest| latest.latest_block_number)
            .ok_or_else(|| FeedError::Decode("response is missing `data`".into()))
    }

    /// Fetches one page of events. A success envelope without `data` yields an empty page.
    ///
    /// # Errors
    ///
    /// See [retry errors](#retry-errors). Also returns [`FeedError::Encode`] without any attempt
    /// if the request cannot be serialized.
    pub async fn fetch_events(&self, request: &EventsRequest) -> Result<Page, FeedError> {
        debug!(
            from_block = request.from_block,
            to_block = request.to_block,
            page_number = request.page_number,
            "event list called"
        );
        let body = serde_json::to_string(request).map_err(|e| FeedError::Encode(e.to_string()))?;
        let result =
            self.call::<Page, _, _>(|| self.transport.post(EVENTS_PATH, body.clone())).await;
        if let Err(e) = &result {
            error!(error = %e, "event list failed");
        }
        Ok(result?.unwrap_or_default())
    }

    /// Runs `operation` up to `max_attempts` times.
    ///
    /// # Errors
    /// <a name="retry-errors"></a>
    ///
    /// * A terminal error (non allow-listed [`FeedError::Api`] code) is returned unchanged after
    ///   the attempt that produced it.
    /// * When every attempt fails with a retryable error, returns
    ///   [`FeedError::RetriesExhausted`] wrapping the last one.
    pub(crate) async fn call<R, F, Fut>(&self, operation: F) -> Result<Option<R>, FeedError>
    where
        R: DeserializeOwned + Send,
        F: Fn() -> Fut + Sync,
        Fut: Future<Output = Result<TransportResponse, FeedError>> + Send,
    {
        let attempts = AtomicUsize::new(0);
        let attempts_made = &attempts;
        let operation = &operation;
        let policy = self.policy;

        let retry_strategy = ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_attempts - 1);

        let result = (move || async move {
            attempts_made.fetch_add(1, Ordering::SeqCst);
            let response = operation().await?;
            decode_response::<R>(&response)
        })
        .retry(retry_strategy)
        .sleep(tokio::time::sleep)
        .when(move |err: &FeedError| policy.is_retryable(err))
        .notify(|err: &FeedError, dur: Duration| {
            warn!(error = %err, delay_ms = dur.as_millis(), "Request failed, retrying");
        })
        .await;

        result.map_err(|err| {
            if policy.is_retryable(&err) {
                FeedError::RetriesExhausted {
                    attempts: attempts.load(Ordering::SeqCst),
                    source: Box::new(err),
                }
            } else {
                err
            }
        })
    }
}

/// Decodes one response envelope.
///
/// An undecodable body with a non-2xx HTTP status is classified by that status, so a proxy's
/// `503` page is retried while a `404` page is not.
fn decode_response<R: DeserializeOwned>(
    response: &TransportResponse,
) -> Result<Option<R>, FeedError> {
    match serde_json::from_str::<ApiResponse<R>>(&response.body) {
        Ok(envelope) if envelope.is_success() => Ok(envelope.data),
        Ok(envelope) => Err(FeedError::Api { code: envelope.code, message: envelope.message }),
        Err(_) if !response.is_success_status() => Err(FeedError::Api {
            code: i64::from(response.status),
            message: format!("HTTP status {}", response.status),
        }),
        Err(e) => Err(FeedError::Decode(e.to_string())),
    }
}
