#![allow(dead_code)]

use std::{
    collections::VecDeque,
    future::Future,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
};

use event_feed::{
    CursorScanner, CursorScannerBuilder, EVENTS_PATH, EventsRequest, FeedError,
    LATEST_BLOCK_NUMBER_PATH, RetryingFetcherBuilder, Transport, TransportResponse,
};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{WebSocketStream, accept_async};
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).try_init();
}

/// In-memory indexing service.
///
/// The chain head is adjustable at any time. Event queries are answered from a queue of scripted
/// responses and fall back to an empty page once the queue is drained. Every decoded query is
/// recorded.
#[derive(Clone, Default)]
pub struct MockService {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    head: AtomicU64,
    head_calls: AtomicUsize,
    responses: Mutex<VecDeque<Result<TransportResponse, FeedError>>>,
    requests: Mutex<Vec<EventsRequest>>,
}

impl MockService {
    pub fn with_head(head: u64) -> Self {
        let service = Self::default();
        service.set_head(head);
        service
    }

    pub fn set_head(&self, head: u64) {
        self.inner.head.store(head, Ordering::SeqCst);
    }

    pub fn head_calls(&self) -> usize {
        self.inner.head_calls.load(Ordering::SeqCst)
    }

    /// Queues a successful envelope around `page`.
    pub fn push_page(&self, page: Value) {
        self.push_response(Ok(TransportResponse::ok(json!({"code": 200, "data": page}).to_string())));
    }

    pub fn push_response(&self, response: Result<TransportResponse, FeedError>) {
        self.inner.responses.lock().unwrap().push_back(response);
    }

    pub fn requests(&self) -> Vec<EventsRequest> {
        self.inner.requests.lock().unwrap().clone()
    }
}

impl Transport for MockService {
    async fn get(&self, path: &str) -> Result<TransportResponse, FeedError> {
        assert_eq!(path, LATEST_BLOCK_NUMBER_PATH);
        self.inner.head_calls.fetch_add(1, Ordering::SeqCst);
        let head = self.inner.head.load(Ordering::SeqCst);
        Ok(TransportResponse::ok(
            json!({"code": 200, "data": {"latestBlockNumber": head}}).to_string(),
        ))
    }

    async fn post(&self, path: &str, body: String) -> Result<TransportResponse, FeedError> {
        assert_eq!(path, EVENTS_PATH);
        let request: EventsRequest = serde_json::from_str(&body).unwrap();
        self.inner.requests.lock().unwrap().push(request);

        let scripted = self.inner.responses.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(TransportResponse::ok(json!({"code": 200, "data": page(0, 0)}).to_string())))
    }
}

/// A page body with `count` events out of `total`.
pub fn page(count: u64, total: u64) -> Value {
    let events: Vec<Value> = (0..count)
        .map(|i| json!({"id": i, "blockNumber": 100 + i % 10, "eventName": "Transfer"}))
        .collect();
    json!({"page": 1, "size": count, "total": total, "data": events})
}

/// A scanner over `service` whose fetcher makes a single attempt per request.
pub fn scanner(service: &MockService, builder: CursorScannerBuilder) -> CursorScanner<MockService> {
    let fetcher = RetryingFetcherBuilder::fragile(service.clone()).build().unwrap();
    builder.connect(fetcher).unwrap()
}

/// Serves websocket connections on an ephemeral port, running `session` for each one.
pub async fn spawn_ws_server<F, Fut>(session: F) -> anyhow::Result<String>
where
    F: Fn(WebSocketStream<TcpStream>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let session = Arc::new(session);

    tokio::spawn(async move {
        while let Ok((tcp, _)) = listener.accept().await {
            let session = Arc::clone(&session);
            tokio::spawn(async move {
                if let Ok(ws) = accept_async(tcp).await {
                    session(ws).await;
                }
            });
        }
    });

    Ok(format!("ws://{addr}"))
}
