//! Event-Feed delivers indexed contract events from a remote indexing service.
//!
//! Two interchangeable delivery modes share one data model ([`Event`], [`Page`]):
//!
//! * **Pull**: [`EventsClient::subscribe_events`] starts a [`CursorScanner`] that repeatedly
//!   fetches paginated results through a [`RetryingFetcher`] while advancing a block-range
//!   [`Cursor`]. Batches arrive on an [`EventSubscription`] stream.
//! * **Push**: [`stream::StreamClient`] keeps a websocket open, sends keepalive pings and hands
//!   each tagged frame to an [`stream::EventHandler`].
//!
//! # Stream items
//!
//! A pull subscription yields `FeedResult<EventBatch>` items. `Ok` batches carry the events of one
//! `(from_block, to_block, page_number)` query plus a [`ScanMeta`] the consumer can persist to
//! resume later. `Err` items report a fetch cycle that failed after retries; they are not terminal
//! and the same page is fetched again on the next cycle.
//!
//! # Ordering
//!
//! Cycles of one subscription are strictly sequential and each batch belongs to exactly one
//! `(window, page)` position, delivered once and in cursor order. Push frames are dispatched in
//! the order the socket yields them. Neither mode deduplicates; the push client may redeliver
//! events after a reconnect.
//!
//! # Backpressure
//!
//! With flow control enabled ([`ClientConfig::flow_control`]) the scanner parks after every
//! batch until [`EventSubscription::ack`] is called, so at most one batch is outstanding.
//! Without it, delivery is time driven and buffered up to the subscription's channel capacity.

#[macro_use]
mod logging;

pub mod flow_control;
pub mod stream;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

mod client;
mod config;
mod error;
mod fetcher;
mod model;
mod scanner;
mod transport;
mod types;

pub use client::EventsClient;
pub use config::{
    ChainHeadSource, ClientConfig, DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_PAGE_SIZE,
    DEFAULT_PING_PERIOD, DEFAULT_POLL_INTERVAL, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_STREAM_BUFFER_CAPACITY, DEFAULT_WINDOW_SPAN, ReconnectPolicy, StreamConfig,
};
pub use error::FeedError;
pub use fetcher::{
    DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY, RetryDecision, RetryPolicy,
    RetryingFetcher, RetryingFetcherBuilder,
};
pub use model::{
    ApiResponse, Event, EventBatch, EventsRequest, LatestBlockNumber, Page, ScanMeta,
    StreamRequest, SubscribeRequest,
};
pub use scanner::{Cursor, CursorScanner, CursorScannerBuilder, EventSubscription, ScannerHandle};
pub use transport::{
    EVENTS_PATH, HttpTransport, LATEST_BLOCK_NUMBER_PATH, Transport, TransportResponse,
};
pub use types::{ChannelState, FeedResult, IntoFeedResult, TryStream};
