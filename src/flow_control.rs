//! Cooperative backpressure between the cursor scanner and its consumer.
//!
//! With flow control enabled the scanner parks after every delivered batch until the consumer
//! hands back one acknowledgement token, so at most one batch is ever delivered but not yet
//! acknowledged. Tokens are counted: N acknowledgements release exactly N further cycles.

use tokio::sync::mpsc;

use crate::FeedError;

/// Creates a connected acknowledgement pair.
#[must_use]
pub fn channel() -> (Acknowledger, AckReceiver) {
    // a single slot: one early acknowledgement may be parked, a second one waits for the scanner
    let (tx, rx) = mpsc::channel(1);
    (Acknowledger { tx }, AckReceiver { rx })
}

/// Consumer side: releases the scanner after a batch has been handled.
#[derive(Clone, Debug)]
pub struct Acknowledger {
    tx: mpsc::Sender<()>,
}

impl Acknowledger {
    /// Acknowledges the most recently delivered batch.
    ///
    /// # Errors
    ///
    /// * [`FeedError::FlowControlClosed`] - if the scanner has stopped.
    pub async fn ack(&self) -> Result<(), FeedError> {
        self.tx.send(()).await.map_err(|_| FeedError::FlowControlClosed)
    }
}

/// Scanner side.
#[derive(Debug)]
pub struct AckReceiver {
    rx: mpsc::Receiver<()>,
}

impl AckReceiver {
    /// Waits for one acknowledgement token.
    ///
    /// # Errors
    ///
    /// * [`FeedError::FlowControlClosed`] - if every [`Acknowledger`] has been dropped.
    pub async fn wait(&mut self) -> Result<(), FeedError> {
        self.rx.recv().await.ok_or(FeedError::FlowControlClosed)
    }
}
