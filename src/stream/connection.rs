use std::{sync::Arc, time::Duration};

use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use serde::Serialize;
use tokio::{net::TcpStream, sync::Mutex, time::Instant};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{
        Message,
        protocol::{CloseFrame, frame::coding::CloseCode},
    },
};
use tokio_util::sync::CancellationToken;

use crate::{
    FeedError,
    config::{DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_PING_PERIOD},
    stream::{Dispatch, Dispatcher, EventHandler},
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// Close code reported when the peer vanished without a close frame.
const ABNORMAL_CLOSURE: u16 = 1006;

/// Lifecycle of a [`StreamConnection`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
    Closed,
}

/// Why a connection ended.
#[derive(Clone, Debug)]
pub enum CloseReason {
    /// [`StreamConnection::close`] was called.
    Requested,
    /// The service sent an `end` frame.
    Ended,
    /// The peer closed with an expected close code.
    Remote { code: Option<u16>, reason: String },
    /// A read or keepalive write failed, or the peer closed abnormally.
    Failed(FeedError),
}

impl CloseReason {
    #[must_use]
    pub fn is_abnormal(&self) -> bool {
        matches!(self, CloseReason::Failed(_))
    }
}

struct Shared {
    state: ConnectionState,
    sink: Option<WsSink>,
    close_reason: Option<CloseReason>,
}

impl Shared {
    fn record(&mut self, reason: CloseReason) {
        if self.close_reason.is_none() {
            self.close_reason = Some(reason);
        }
    }
}

/// One persistent websocket connection to the push endpoint.
///
/// After [`connect`](Self::connect) two loops share the connection: the inbound loop reads
/// frames and hands them to a [`Dispatcher`], the outbound loop sends a ping every
/// `ping_period`. Both exit on a shared termination signal, raised by [`close`](Self::close), by
/// an `end` frame or by the first loop that fails.
///
/// State and the write half live behind a single lock that is held for one state transition or
/// one framed send, never across a read. Clones share the same connection.
#[derive(Clone)]
pub struct StreamConnection {
    url: String,
    ping_period: Duration,
    handshake_timeout: Duration,
    shared: Arc<Mutex<Shared>>,
    shutdown: CancellationToken,
    finished: CancellationToken,
}

impl std::fmt::Debug for StreamConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamConnection")
            .field("url", &self.url)
            .field("ping_period", &self.ping_period)
            .field("handshake_timeout", &self.handshake_timeout)
            .finish_non_exhaustive()
    }
}

impl StreamConnection {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ping_period: DEFAULT_PING_PERIOD,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            shared: Arc::new(Mutex::new(Shared {
                state: ConnectionState::Disconnected,
                sink: None,
                close_reason: None,
            })),
            shutdown: CancellationToken::new(),
            finished: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn ping_period(mut self, ping_period: Duration) -> Self {
        self.ping_period = ping_period;
        self
    }

    #[must_use]
    pub fn handshake_timeout(mut self, handshake_timeout: Duration) -> Self {
        self.handshake_timeout = handshake_timeout;
        self
    }

    pub async fn state(&self) -> ConnectionState {
        self.shared.lock().await.state
    }

    pub async fn is_connected(&self) -> bool {
        self.state().await == ConnectionState::Connected
    }

    /// Performs the handshake and starts the inbound and outbound loops.
    ///
    /// A failed handshake leaves the connection `Disconnected`, so it may be retried.
    ///
    /// # Errors
    ///
    /// * [`FeedError::InvalidState`] - if the connection is not `Disconnected`, or was closed
    ///   while the handshake was in flight.
    /// * [`FeedError::Timeout`] - if the handshake exceeds the handshake timeout.
    /// * [`FeedError::WebSocket`] - if the handshake fails.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip_all))]
    pub async fn connect<H: EventHandler>(&self, handler: H) -> Result<(), FeedError> {
        {
            let mut shared = self.shared.lock().await;
            if shared.state != ConnectionState::Disconnected {
                return Err(FeedError::InvalidState(shared.state));
            }
            shared.state = ConnectionState::Connecting;
        }

        debug!(url = %self.url, "Connecting to stream endpoint");
        let handshake = tokio::time::timeout(self.handshake_timeout, connect_async(self.url.as_str()));
        let handshake = tokio::select! {
            biased;
            () = self.shutdown.cancelled() => {
                return Err(FeedError::InvalidState(self.state().await));
            }
            handshake = handshake => handshake,
        };
        let ws = match handshake {
            Ok(Ok((ws, _response))) => ws,
            Ok(Err(err)) => return Err(self.abort_handshake(err.into()).await),
            Err(_elapsed) => return Err(self.abort_handshake(FeedError::Timeout).await),
        };

        let (sink, stream) = ws.split();
        {
            let mut shared = self.shared.lock().await;
            if shared.state != ConnectionState::Connecting {
                // closed while the handshake was in flight
                return Err(FeedError::InvalidState(shared.state));
            }
            shared.state = ConnectionState::Connected;
            shared.sink = Some(sink);
        }
        info!(url = %self.url, "Stream connected");

        let connection = self.clone();
        tokio::spawn(async move { connection.run(stream, Dispatcher::new(handler)).await });
        Ok(())
    }

    async fn abort_handshake(&self, err: FeedError) -> FeedError {
        warn!(url = %self.url, error = %err, "Stream handshake failed");
        let mut shared = self.shared.lock().await;
        if shared.state == ConnectionState::Connecting {
            shared.state = ConnectionState::Disconnected;
        }
        err
    }

    /// Encodes `request` as JSON and sends it as one text frame.
    ///
    /// # Errors
    ///
    /// * [`FeedError::Encode`] - if `request` cannot be serialized.
    /// * [`FeedError::NotConnected`] - if the connection is not `Connected`.
    /// * [`FeedError::WebSocket`] - if the write fails.
    pub async fn send<T: Serialize + ?Sized>(&self, request: &T) -> Result<(), FeedError> {
        let text = serde_json::to_string(request).map_err(|e| FeedError::Encode(e.to_string()))?;
        self.send_text(text).await
    }

    /// Sends one raw text frame.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send), minus encoding.
    pub async fn send_text(&self, text: String) -> Result<(), FeedError> {
        let mut shared = self.shared.lock().await;
        if shared.state != ConnectionState::Connected {
            return Err(FeedError::NotConnected);
        }
        let Some(sink) = shared.sink.as_mut() else {
            return Err(FeedError::NotConnected);
        };
        sink.send(Message::Text(text.into())).await?;
        Ok(())
    }

    /// Signals both loops to stop, closes the socket and marks the connection `Closed`.
    ///
    /// Calling it again, or after the connection ended on its own, does nothing.
    ///
    /// # Errors
    ///
    /// * [`FeedError::WebSocket`] - if the close frame cannot be written.
    pub async fn close(&self) -> Result<(), FeedError> {
        let sink = {
            let mut shared = self.shared.lock().await;
            match shared.state {
                ConnectionState::Closing | ConnectionState::Closed => return Ok(()),
                // no loops run yet, so nothing else would finish the connection
                ConnectionState::Disconnected | ConnectionState::Connecting => {
                    shared.state = ConnectionState::Closed;
                    shared.record(CloseReason::Requested);
                    self.shutdown.cancel();
                    self.finished.cancel();
                    return Ok(());
                }
                ConnectionState::Connected => {
                    shared.state = ConnectionState::Closing;
                    shared.record(CloseReason::Requested);
                    shared.sink.take()
                }
            }
        };
        debug!(url = %self.url, "Closing stream connection");
        self.shutdown.cancel();

        let result = match sink {
            Some(sink) => close_sink(sink).await,
            None => Ok(()),
        };
        self.shared.lock().await.state = ConnectionState::Closed;
        result
    }

    /// Waits until both loops have exited and returns why the connection ended.
    pub async fn closed(&self) -> CloseReason {
        self.finished.cancelled().await;
        self.shared.lock().await.close_reason.clone().unwrap_or(CloseReason::Requested)
    }

    async fn run<H: EventHandler>(self, stream: SplitStream<WsStream>, dispatcher: Dispatcher<H>) {
        tokio::join!(self.read_loop(stream, &dispatcher), self.ping_loop());

        let (reason, sink) = {
            let mut shared = self.shared.lock().await;
            shared.state = ConnectionState::Closed;
            (shared.close_reason.clone().unwrap_or(CloseReason::Requested), shared.sink.take())
        };
        if let Some(sink) = sink {
            if let Err(err) = close_sink(sink).await {
                trace!(error = %err, "Close frame not delivered");
            }
        }

        match &reason {
            CloseReason::Failed(err) => {
                warn!(url = %self.url, error = %err, "Stream connection lost");
                dispatcher.handler().on_error(err.clone());
            }
            other => debug!(url = %self.url, reason = ?other, "Stream connection closed"),
        }
        dispatcher.handler().on_close();
        self.finished.cancel();
    }

    /// Reads frames until the stream ends, fails, or the termination signal fires.
    async fn read_loop<H: EventHandler>(
        &self,
        mut stream: SplitStream<WsStream>,
        dispatcher: &Dispatcher<H>,
    ) {
        let reason = loop {
            let frame = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => return,
                frame = stream.next() => frame,
            };

            let dispatch = match frame {
                Some(Ok(Message::Text(text))) => dispatcher.dispatch_frame(text.as_bytes()),
                Some(Ok(Message::Binary(bytes))) => dispatcher.dispatch_frame(&bytes),
                Some(Ok(Message::Close(frame))) => break remote_close(frame),
                Some(Ok(_)) => Dispatch::Continue,
                Some(Err(err)) => break CloseReason::Failed(err.into()),
                None => {
                    break CloseReason::Failed(FeedError::ConnectionClosed {
                        code: Some(ABNORMAL_CLOSURE),
                        reason: "stream ended without a close frame".into(),
                    });
                }
            };

            if dispatch == Dispatch::End {
                break CloseReason::Ended;
            }
        };

        self.shared.lock().await.record(reason);
        self.shutdown.cancel();
    }

    /// Sends a keepalive ping every `ping_period` while the connection is up. A zero period
    /// disables keepalive.
    async fn ping_loop(&self) {
        if self.ping_period.is_zero() {
            self.shutdown.cancelled().await;
            return;
        }
        let mut ticker = tokio::time::interval_at(Instant::now() + self.ping_period, self.ping_period);
        loop {
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => return,
                _ = ticker.tick() => {}
            }

            let mut shared = self.shared.lock().await;
            if shared.state != ConnectionState::Connected {
                return;
            }
            let Some(sink) = shared.sink.as_mut() else {
                return;
            };
            if let Err(err) = sink.send(Message::Ping(Vec::new().into())).await {
                shared.record(CloseReason::Failed(err.into()));
                drop(shared);
                self.shutdown.cancel();
                return;
            }
            trace!("Ping sent");
        }
    }
}

fn remote_close(frame: Option<CloseFrame>) -> CloseReason {
    let Some(frame) = frame else {
        return CloseReason::Remote { code: None, reason: String::new() };
    };
    let reason = frame.reason.to_string();
    match frame.code {
        CloseCode::Normal | CloseCode::Away => {
            CloseReason::Remote { code: Some(u16::from(frame.code)), reason }
        }
        code => CloseReason::Failed(FeedError::ConnectionClosed { code: Some(u16::from(code)), reason }),
    }
}

async fn close_sink(mut sink: WsSink) -> Result<(), FeedError> {
    let frame = CloseFrame { code: CloseCode::Normal, reason: "".into() };
    sink.send(Message::Close(Some(frame))).await?;
    sink.close().await?;
    Ok(())
}
