use std::sync::Arc;

use backon::{BackoffBuilder, ExponentialBuilder};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{
    FeedError,
    config::{ReconnectPolicy, StreamConfig},
    stream::{CloseReason, ConnectionState, EventHandler, StreamConnection},
};

/// Push-mode client: connects, subscribes and keeps dispatching until stopped.
#[derive(Clone, Debug)]
pub struct StreamClient {
    config: StreamConfig,
}

impl StreamClient {
    #[must_use]
    pub fn new(config: StreamConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Connects, sends the configured subscription request and starts dispatching to `handler`.
    ///
    /// With [`ReconnectPolicy::Enabled`], an abnormally closed connection is re-established and
    /// the same subscription request is sent again. Events already delivered may be delivered
    /// again after a reconnect. A requested close, an `end` frame or a normal close by the peer
    /// is never followed by a reconnect.
    ///
    /// # Errors
    ///
    /// [`FeedError::InvalidMaxAttempts`] for a reconnect policy without attempts, otherwise any
    /// error of [`StreamConnection::connect`] or [`StreamConnection::send`] for the first
    /// connection.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip_all))]
    pub async fn start<H: EventHandler>(&self, handler: H) -> Result<StreamHandle, FeedError> {
        self.config.validate()?;
        let handler = Arc::new(handler);
        let connection = open(&self.config, &handler).await?;

        let current = Arc::new(Mutex::new(connection.clone()));
        let stop = CancellationToken::new();
        let finished = CancellationToken::new();

        let supervisor = Supervisor {
            config: self.config.clone(),
            handler,
            current: Arc::clone(&current),
            stop: stop.clone(),
        };
        let done = finished.clone();
        tokio::spawn(async move {
            supervisor.run(connection).await;
            done.cancel();
        });

        Ok(StreamHandle { current, stop, finished })
    }
}

/// Controls a started [`StreamClient`].
#[derive(Clone, Debug)]
pub struct StreamHandle {
    current: Arc<Mutex<StreamConnection>>,
    stop: CancellationToken,
    finished: CancellationToken,
}

impl StreamHandle {
    /// Sends a user-issued request on the current connection.
    ///
    /// # Errors
    ///
    /// * [`FeedError::NotConnected`] - if the connection is down, including while reconnecting.
    /// * Otherwise as [`StreamConnection::send`].
    pub async fn send<T: Serialize + ?Sized>(&self, request: &T) -> Result<(), FeedError> {
        let connection = self.current.lock().await.clone();
        connection.send(request).await
    }

    /// Closes the connection and prevents any further reconnect.
    ///
    /// # Errors
    ///
    /// As [`StreamConnection::close`].
    pub async fn stop(&self) -> Result<(), FeedError> {
        self.stop.cancel();
        let connection = self.current.lock().await.clone();
        connection.close().await
    }

    pub async fn state(&self) -> ConnectionState {
        let connection = self.current.lock().await.clone();
        connection.state().await
    }

    /// Whether the client has ended for good.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished.is_cancelled()
    }

    /// Waits until the client has ended for good.
    pub async fn finished(&self) {
        self.finished.cancelled().await;
    }
}

struct Supervisor<H> {
    config: StreamConfig,
    handler: Arc<H>,
    current: Arc<Mutex<StreamConnection>>,
    stop: CancellationToken,
}

impl<H: EventHandler> Supervisor<H> {
    async fn run(self, mut connection: StreamConnection) {
        loop {
            let reason = connection.closed().await;
            if self.stop.is_cancelled() || !reason.is_abnormal() {
                break;
            }
            let ReconnectPolicy::Enabled { max_attempts, min_delay } = self.config.reconnect else {
                break;
            };
            let Some(next) = self.reconnect(max_attempts, min_delay, &reason).await else {
                break;
            };

            let mut slot = self.current.lock().await;
            if self.stop.is_cancelled() {
                drop(slot);
                if let Err(err) = next.close().await {
                    trace!(error = %err, "Close after stop failed");
                }
                break;
            }
            *slot = next.clone();
            connection = next;
        }
        debug!(url = %self.config.url, "Stream client finished");
    }

    async fn reconnect(
        &self,
        max_attempts: usize,
        min_delay: std::time::Duration,
        reason: &CloseReason,
    ) -> Option<StreamConnection> {
        let delays = ExponentialBuilder::default()
            .with_min_delay(min_delay)
            .with_max_times(max_attempts)
            .build();

        let mut attempts = 0;
        let mut last_error = None;
        for delay in delays {
            attempts += 1;
            tokio::select! {
                biased;
                () = self.stop.cancelled() => return None,
                () = tokio::time::sleep(delay) => {}
            }
            info!(
                url = %self.config.url,
                attempt = attempts,
                reason = ?reason,
                "Reconnecting stream"
            );
            match open(&self.config, &self.handler).await {
                Ok(connection) => return Some(connection),
                Err(err) => {
                    warn!(attempt = attempts, error = %err, "Reconnect failed");
                    last_error = Some(err);
                }
            }
        }

        if let Some(source) = last_error {
            error!(attempts = attempts, "Giving up on stream reconnect");
            self.handler.on_error(FeedError::RetriesExhausted { attempts, source: Box::new(source) });
        }
        None
    }
}

/// Opens a connection and sends the subscription request on it.
async fn open<H: EventHandler>(
    config: &StreamConfig,
    handler: &Arc<H>,
) -> Result<StreamConnection, FeedError> {
    let connection = StreamConnection::new(config.url.clone())
        .ping_period(config.ping_period)
        .handshake_timeout(config.handshake_timeout);
    connection.connect(Arc::clone(handler)).await?;

    if let Err(err) = connection.send(&config.request).await {
        if let Err(close_err) = connection.close().await {
            trace!(error = %close_err, "Close after failed subscribe failed");
        }
        return Err(err);
    }
    Ok(connection)
}
