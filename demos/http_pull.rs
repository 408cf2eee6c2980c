use std::time::Duration;

use event_feed::{ClientConfig, EventsClient, SubscribeRequest};
use tokio_stream::StreamExt;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).try_init();

    let base_url =
        std::env::var("EVENT_FEED_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
    let from_block = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => 0,
    };

    let config = ClientConfig::new(base_url)
        .poll_interval(Duration::from_secs(2))
        .page_size(50)
        .flow_control(true);
    let client = EventsClient::new(config)?;

    let head = client.latest_block_number().await?;
    info!("Service has indexed up to block {head}");

    let mut subscription =
        client.subscribe_events(SubscribeRequest::from_block(from_block).event_name("Transfer"))?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let next = tokio::select! {
            _ = &mut ctrl_c => break,
            next = subscription.next() => next,
        };
        match next {
            Some(Ok(batch)) => {
                info!(
                    "Blocks {}..={} page {}: {} events (completed: {})",
                    batch.from_block,
                    batch.to_block,
                    batch.page_number,
                    batch.events.len(),
                    batch.meta.scan_latest_block_completed
                );
                for event in &batch.events {
                    info!("#{} {} at block {}", event.id, event.event_name, event.block_number);
                }
                subscription.ack().await?;
            }
            Some(Err(e)) => error!("Fetch cycle failed: {e}"),
            None => break,
        }
    }

    subscription.handle().stop();
    Ok(())
}
