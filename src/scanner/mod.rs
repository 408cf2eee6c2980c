//! Pull-mode cursor scanner.
//!
//! A [`CursorScanner`] turns a one-shot [`SubscribeRequest`] into an endless sequence of fetch
//! cycles over a monotonically advancing block range. Each cycle:
//!
//! 1. checks the service's chain head, and skips the cycle while it is behind the window's
//!    `to_block`
//! 2. fetches the cursor's current page through the [`RetryingFetcher`]
//! 3. advances the [`Cursor`] and delivers an [`EventBatch`] tagged with its
//!    [`ScanMeta`](crate::ScanMeta)
//! 4. with flow control, parks until the batch is acknowledged
//!
//! A failed cycle is reported on the subscription as an `Err` item and retried on the next
//! cycle from the same position, so progress is never dropped.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use event_feed::{
//!     CursorScannerBuilder, HttpTransport, RetryingFetcherBuilder, SubscribeRequest,
//! };
//! use tokio_stream::StreamExt;
//!
//! # async fn example() -> Result<(), event_feed::FeedError> {
//! let fetcher = RetryingFetcherBuilder::new(HttpTransport::new("http://127.0.0.1:8080")?).build()?;
//! let scanner = CursorScannerBuilder::new()
//!     .window_span(50)
//!     .poll_interval(Duration::from_secs(2))
//!     .connect(fetcher)?;
//!
//! let mut subscription = scanner.subscribe(SubscribeRequest::from_block(1_000).event_name("Transfer"))?;
//! while let Some(Ok(batch)) = subscription.next().await {
//!     println!("blocks {}..={} page {}", batch.from_block, batch.to_block, batch.page_number);
//! }
//! # Ok(()) }
//! ```

mod builder;
mod cursor;
mod cycle;
mod subscription;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

pub use builder::CursorScannerBuilder;
pub use cursor::Cursor;
pub use subscription::{EventSubscription, ScannerHandle};

use crate::{
    FeedError,
    fetcher::RetryingFetcher,
    flow_control,
    model::{EventBatch, SubscribeRequest},
    transport::Transport,
};
use cycle::ScanLoop;

/// A configured scanner bound to one fetcher. Each [`subscribe`](Self::subscribe) call starts an
/// independent scan with its own cursor.
#[derive(Debug)]
pub struct CursorScanner<T> {
    pub(crate) fetcher: Arc<RetryingFetcher<T>>,
    pub(crate) config: CursorScannerBuilder,
}

impl<T: Transport + 'static> CursorScanner<T> {
    #[must_use]
    pub fn fetcher(&self) -> &RetryingFetcher<T> {
        &self.fetcher
    }

    /// Starts scanning in a background task. The first cycle runs immediately.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// * [`FeedError::InvalidPageSize`] / [`FeedError::InvalidWindowSpan`] - if the initial cursor
    ///   cannot be built.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip_all))]
    pub fn subscribe(&self, request: SubscribeRequest) -> Result<EventSubscription, FeedError> {
        let cursor = Cursor::new(request, self.config.page_size, self.config.window_span)?;
        let (sender, receiver) = mpsc::channel::<Result<EventBatch, FeedError>>(self.config.buffer_capacity);
        let token = CancellationToken::new();

        let (acknowledger, acks) = if self.config.flow_control {
            let (acknowledger, acks) = flow_control::channel();
            (Some(acknowledger), Some(acks))
        } else {
            (None, None)
        };

        let window = cursor.window();
        info!(
            from_block = *window.start(),
            to_block = *window.end(),
            page_size = self.config.page_size,
            flow_control = self.config.flow_control,
            "Starting cursor scanner"
        );

        let scan = ScanLoop {
            fetcher: Arc::clone(&self.fetcher),
            cursor,
            poll_interval: self.config.poll_interval,
            chain_head_source: self.config.chain_head_source,
            sender,
            acks,
            token: token.clone(),
        };
        tokio::spawn(scan.run());

        Ok(EventSubscription::new(
            ReceiverStream::new(receiver),
            acknowledger,
            ScannerHandle::new(token),
        ))
    }
}
