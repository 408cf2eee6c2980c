//! Retrying request/response wrapper.
//!
//! [`RetryingFetcher`] performs each round trip through a [`Transport`](crate::Transport) up to
//! `max_attempts` times, sleeping between attempts with exponential backoff (1 s then 2 s with
//! the defaults). Every failure is classified by [`RetryPolicy`]:
//!
//! * transport failures, timeouts and malformed bodies are retried
//! * application codes are retried only if they are `5xx` or `429`
//! * anything else is returned immediately
//!
//! # Example
//!
//! ```rust,no_run
//! use event_feed::{EventsRequest, HttpTransport, RetryingFetcherBuilder};
//!
//! # async fn example() -> Result<(), event_feed::FeedError> {
//! let transport = HttpTransport::new("http://127.0.0.1:8080")?;
//! let fetcher = RetryingFetcherBuilder::new(transport).build()?;
//!
//! let head = fetcher.latest_block_number().await?;
//! let page = fetcher
//!     .fetch_events(&EventsRequest {
//!         from_block: head.saturating_sub(10),
//!         to_block: head,
//!         page_number: 1,
//!         page_size: 100,
//!         ..EventsRequest::default()
//!     })
//!     .await?;
//! println!("{} of {} events", page.data.len(), page.total);
//! # Ok(()) }
//! ```

mod builder;
mod policy;
mod retrying;

pub use builder::{
    DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY, RetryingFetcherBuilder,
};
pub use policy::{RetryDecision, RetryPolicy};
pub use retrying::RetryingFetcher;
