use std::{
    pin::Pin,
    task::{Context, Poll},
};

use tokio_stream::{Stream, wrappers::ReceiverStream};
use tokio_util::sync::CancellationToken;

use crate::{FeedError, FeedResult, flow_control::Acknowledger, model::EventBatch};

/// Batches produced by one pull subscription.
///
/// Yields `Ok(batch)` for every fetched page, in cursor order, and `Err(_)` for fetch cycles that
/// failed after the fetcher's own retries. Errors are not terminal: the scanner retries the same
/// window on its next cycle. The stream ends once the scanner is stopped.
///
/// Dropping the subscription stops its scanner.
///
/// # Example
///
/// ```rust,no_run
/// use event_feed::{ClientConfig, EventsClient, SubscribeRequest};
/// use tokio_stream::StreamExt;
///
/// # async fn example() -> Result<(), event_feed::FeedError> {
/// let client = EventsClient::new(ClientConfig::new("http://127.0.0.1:8080").flow_control(true))?;
/// let mut subscription = client.subscribe_events(SubscribeRequest::from_block(19_000_000))?;
///
/// while let Some(batch) = subscription.next().await {
///     match batch {
///         Ok(batch) => {
///             println!("{} events up to block {}", batch.events.len(), batch.meta.scan_latest_block_number);
///             subscription.ack().await?;
///         }
///         Err(err) => eprintln!("cycle failed: {err}"),
///     }
/// }
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct EventSubscription {
    inner: ReceiverStream<FeedResult<EventBatch>>,
    acknowledger: Option<Acknowledger>,
    handle: ScannerHandle,
}

impl EventSubscription {
    pub(crate) fn new(
        inner: ReceiverStream<FeedResult<EventBatch>>,
        acknowledger: Option<Acknowledger>,
        handle: ScannerHandle,
    ) -> Self {
        Self { inner, acknowledger, handle }
    }

    /// Releases the scanner after the last batch has been handled.
    ///
    /// A no-op when flow control is disabled.
    ///
    /// # Errors
    ///
    /// * [`FeedError::FlowControlClosed`] - if the scanner has already stopped.
    pub async fn ack(&self) -> Result<(), FeedError> {
        match &self.acknowledger {
            Some(acknowledger) => acknowledger.ack().await,
            None => Ok(()),
        }
    }

    /// A cloneable acknowledgement handle, for consumers that hand batches to another task.
    ///
    /// `None` when flow control is disabled.
    #[must_use]
    pub fn acknowledger(&self) -> Option<Acknowledger> {
        self.acknowledger.clone()
    }

    #[must_use]
    pub fn handle(&self) -> ScannerHandle {
        self.handle.clone()
    }
}

impl Stream for EventSubscription {
    type Item = FeedResult<EventBatch>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.handle.stop();
    }
}

/// Stops a running scanner.
#[derive(Clone, Debug)]
pub struct ScannerHandle {
    token: CancellationToken,
}

impl ScannerHandle {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Signals the scanner loop to exit. Takes effect at the next suspension point; any cycle in
    /// flight is abandoned without advancing the cursor.
    pub fn stop(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}
