use std::fmt::Debug;

use tokio::sync::mpsc;

use crate::{FeedError, model::EventBatch};

pub type FeedResult<T> = Result<T, FeedError>;

/// Whether the downstream side of a delivery channel is still listening.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChannelState {
    Open,
    Closed,
}

impl ChannelState {
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, ChannelState::Open)
    }

    #[must_use]
    pub fn is_closed(self) -> bool {
        matches!(self, ChannelState::Closed)
    }
}

pub trait IntoFeedResult<T> {
    fn into_feed_result(self) -> FeedResult<T>;
}

impl<T> IntoFeedResult<T> for FeedResult<T> {
    fn into_feed_result(self) -> FeedResult<T> {
        self
    }
}

impl<T> IntoFeedResult<T> for FeedError {
    fn into_feed_result(self) -> FeedResult<T> {
        Err(self)
    }
}

impl IntoFeedResult<EventBatch> for EventBatch {
    fn into_feed_result(self) -> FeedResult<EventBatch> {
        Ok(self)
    }
}

/// Pushes an item downstream, reporting whether the receiver is still alive.
#[allow(async_fn_in_trait)]
pub trait TryStream<T> {
    async fn try_stream<M: IntoFeedResult<T>>(&self, msg: M) -> ChannelState;
}

impl<T: Debug> TryStream<T> for mpsc::Sender<FeedResult<T>> {
    async fn try_stream<M: IntoFeedResult<T>>(&self, msg: M) -> ChannelState {
        let item = msg.into_feed_result();
        match &item {
            Ok(_) => trace!("Sending item"),
            Err(err) => debug!(error = %err, "Sending error"),
        }
        if let Err(err) = self.send(item).await {
            warn!(error = %err, "Downstream channel closed, stopping stream");
            return ChannelState::Closed;
        }
        ChannelState::Open
    }
}
