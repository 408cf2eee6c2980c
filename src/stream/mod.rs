//! Push-mode delivery over a persistent websocket.
//!
//! [`StreamConnection`] owns one connection and its two loops, [`Dispatcher`] maps decoded
//! [`StreamMessage`]s onto an [`EventHandler`], and [`StreamClient`] ties them together with the
//! subscription request and an optional [`ReconnectPolicy`](crate::ReconnectPolicy).
//!
//! # Example
//!
//! ```rust,no_run
//! use event_feed::{
//!     StreamConfig, StreamRequest,
//!     stream::{ChannelHandler, StreamClient, StreamEvent},
//! };
//!
//! # async fn example() -> Result<(), event_feed::FeedError> {
//! let config = StreamConfig::new("ws://127.0.0.1:8080/api/v1/event/ws")
//!     .request(StreamRequest { from_block: Some(1_000), ..StreamRequest::default() });
//! let (handler, mut events) = ChannelHandler::new();
//! let handle = StreamClient::new(config).start(handler).await?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         StreamEvent::Batch { events, page, total } => println!("{} events ({page}/{total})", events.len()),
//!         StreamEvent::Error(err) => eprintln!("stream error: {err}"),
//!         StreamEvent::End(_) | StreamEvent::Closed => break,
//!     }
//! }
//! handle.stop().await?;
//! # Ok(()) }
//! ```

mod client;
mod connection;
mod dispatcher;
mod message;

pub use client::{StreamClient, StreamHandle};
pub use connection::{CloseReason, ConnectionState, StreamConnection};
pub use dispatcher::{ChannelHandler, Dispatch, Dispatcher, EventHandler, StreamEvent};
pub use message::StreamMessage;
