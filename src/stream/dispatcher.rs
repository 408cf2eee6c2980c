use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::{FeedError, model::Event, stream::StreamMessage};

/// Consumer callbacks of a streaming connection.
///
/// Callbacks run on the connection's inbound task, one at a time and in frame order. A slow
/// callback delays reading of the next frame.
pub trait EventHandler: Send + Sync + 'static {
    /// A page of a backfill, or a single live event with `page` and `total` set to 0.
    fn on_batch(&self, events: Vec<Event>, page: u64, total: u64);

    /// A service-reported failure, an undecodable frame or an abnormal closure.
    fn on_error(&self, error: FeedError);

    /// The service signalled the end of the stream. No further batches follow.
    fn on_end(&self, _message: Option<String>) {}

    /// The connection has been torn down. Called exactly once per connection.
    fn on_close(&self) {}
}

impl<H: EventHandler> EventHandler for Arc<H> {
    fn on_batch(&self, events: Vec<Event>, page: u64, total: u64) {
        (**self).on_batch(events, page, total);
    }

    fn on_error(&self, error: FeedError) {
        (**self).on_error(error);
    }

    fn on_end(&self, message: Option<String>) {
        (**self).on_end(message);
    }

    fn on_close(&self) {
        (**self).on_close();
    }
}

/// Whether frame processing continues after a dispatched message.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Dispatch {
    Continue,
    End,
}

/// Routes decoded frames to an [`EventHandler`].
#[derive(Debug)]
pub struct Dispatcher<H> {
    handler: H,
}

impl<H: EventHandler> Dispatcher<H> {
    #[must_use]
    pub fn new(handler: H) -> Self {
        Self { handler }
    }

    #[must_use]
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Decodes a raw frame and dispatches it. Undecodable frames are reported through
    /// [`EventHandler::on_error`] and processing continues.
    pub fn dispatch_frame(&self, bytes: &[u8]) -> Dispatch {
        match StreamMessage::decode(bytes) {
            Ok(message) => self.dispatch(message),
            Err(err) => {
                warn!(error = %err, "Dropping undecodable frame");
                self.handler.on_error(err);
                Dispatch::Continue
            }
        }
    }

    pub fn dispatch(&self, message: StreamMessage) -> Dispatch {
        trace!(kind = message.kind(), "Dispatching frame");
        match message {
            StreamMessage::Events { data, page, total } => {
                match decode_events(data) {
                    Ok(events) => self.handler.on_batch(events, page, total),
                    Err(err) => self.handler.on_error(err),
                }
                Dispatch::Continue
            }
            StreamMessage::NewEvent { data } => {
                match serde_json::from_value::<Event>(data) {
                    Ok(event) => self.handler.on_batch(vec![event], 0, 0),
                    Err(err) => self.handler.on_error(err.into()),
                }
                Dispatch::Continue
            }
            StreamMessage::Error { message } => {
                self.handler.on_error(FeedError::Server(message));
                Dispatch::Continue
            }
            StreamMessage::End { message } => {
                debug!("Stream ended by server");
                self.handler.on_end(message);
                Dispatch::End
            }
            StreamMessage::Heartbeat => Dispatch::Continue,
            StreamMessage::Info { message } => {
                debug!(message = %message, "Server info");
                Dispatch::Continue
            }
        }
    }
}

/// A missing or `null` payload is an empty page.
fn decode_events(data: Value) -> Result<Vec<Event>, FeedError> {
    if data.is_null() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_value(data)?)
}

/// Everything an [`EventHandler`] can observe, as a value.
#[derive(Clone, Debug)]
pub enum StreamEvent {
    Batch { events: Vec<Event>, page: u64, total: u64 },
    Error(FeedError),
    End(Option<String>),
    Closed,
}

/// [`EventHandler`] that forwards every callback into an unbounded channel.
#[derive(Clone, Debug)]
pub struct ChannelHandler {
    sender: mpsc::UnboundedSender<StreamEvent>,
}

impl ChannelHandler {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StreamEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn forward(&self, event: StreamEvent) {
        if self.sender.send(event).is_err() {
            trace!("Stream event receiver dropped");
        }
    }
}

impl EventHandler for ChannelHandler {
    fn on_batch(&self, events: Vec<Event>, page: u64, total: u64) {
        self.forward(StreamEvent::Batch { events, page, total });
    }

    fn on_error(&self, error: FeedError) {
        self.forward(StreamEvent::Error(error));
    }

    fn on_end(&self, message: Option<String>) {
        self.forward(StreamEvent::End(message));
    }

    fn on_close(&self) {
        self.forward(StreamEvent::Closed);
    }
}
