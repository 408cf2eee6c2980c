use std::time::Duration;

use event_feed::{
    Event, FeedError, ReconnectPolicy, StreamConfig, StreamRequest,
    stream::{EventHandler, StreamClient},
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn on_batch(&self, events: Vec<Event>, page: u64, total: u64) {
        if page == 0 {
            for event in &events {
                info!("Live event #{} {} at block {}", event.id, event.event_name, event.block_number);
            }
        } else {
            info!("Backfill page {page}: {} of {total} events", events.len());
        }
    }

    fn on_error(&self, error: FeedError) {
        error!("Stream error: {error}");
    }

    fn on_end(&self, message: Option<String>) {
        info!("Stream ended: {}", message.unwrap_or_default());
    }

    fn on_close(&self) {
        warn!("Connection closed");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).try_init();

    let url = std::env::var("EVENT_FEED_WS_URL")
        .unwrap_or_else(|_| "ws://localhost:8080/api/v1/event/ws".to_string());

    let config = StreamConfig::new(url)
        .request(StreamRequest { from_block: Some(0), ..StreamRequest::default() })
        .ping_period(Duration::from_secs(15))
        .reconnect(ReconnectPolicy::Enabled { max_attempts: 5, min_delay: Duration::from_secs(1) });

    let handle = StreamClient::new(config).start(LoggingHandler).await?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Stopping stream");
            handle.stop().await?;
        }
        () = handle.finished() => {}
    }

    Ok(())
}
